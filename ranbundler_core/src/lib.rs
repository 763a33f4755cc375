//! `ranbundler_core` produces one platform-specific copy of a shared source
//! tree per target platform. Source files mark platform-exclusive regions
//! with directive blocks; each platform's copy keeps only the regions meant
//! for it.
//!
//! ```tsx
//! <EXCLUSIVE OF="mobile">
//!   <TouchBar />
//! </EXCLUSIVE>
//! <EXCLUSIVE OF="web">
//!   <MenuBar />
//! </EXCLUSIVE>
//! ```
//!
//! ## Processing Pipeline
//!
//! ```text
//! ranbundler.toml
//!   -> Config (input, output, ignore, platforms)
//!   -> Orchestrator (one independent task per platform, joined at the end)
//!   -> Tree walker (mirrors directories, filters eligible files, copies the rest)
//!   -> Parser (finds disjoint `<EXCLUSIVE ...>...</EXCLUSIVE>` blocks)
//!   -> Matcher (keeps or drops each block for the active platform)
//!   -> Platform file patcher (rewrites the `PLATFORM` record in the output)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: loading `ranbundler.toml` / `ranbundler.json`.
//! - [`filter`]: the in-memory directive filter.
//! - [`walker`]: mirroring one source tree into one platform output tree.
//! - [`orchestrator`]: running every platform pass.
//! - [`scan`]: read-only directive inventory used by `check` and `list`.
//! - [`platform_file`]: rewriting the platform identity record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use ranbundler_core::BuildOptions;
//! use ranbundler_core::BundleConfig;
//! use ranbundler_core::build_blocking;
//!
//! let config = BundleConfig::load(Path::new("."))?.expect("ranbundler.toml");
//! let report = build_blocking(&config, &BuildOptions::default())?;
//! for platform in &report.platforms {
//! 	println!("{}: {} files filtered", platform.platform, platform.filtered_count());
//! }
//! # Ok::<(), ranbundler_core::BundleError>(())
//! ```

pub use config::*;
pub use error::*;
pub use filter::*;
pub use matcher::*;
pub use orchestrator::*;
pub use parser::*;
pub use platform_file::*;
pub use position::*;
pub use scan::*;
pub use walker::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
pub mod filter;
pub(crate) mod lexer;
mod matcher;
pub mod orchestrator;
mod parser;
pub mod platform_file;
mod position;
pub mod scan;
pub mod walker;
