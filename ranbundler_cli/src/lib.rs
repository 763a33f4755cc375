use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Build one UI codebase into per-platform source trees.",
	long_about = "ranbundler copies a shared source tree once per target platform, removing the \
	              `<EXCLUSIVE OF=\"...\">...</EXCLUSIVE>` blocks that do not belong to \
	              that platform.\n\nQuick start:\n  ranbundler init    Create a \
	              ranbundler.toml\n  ranbundler build   Write one output tree per platform\n  \
	              ranbundler check   Validate directive structure\n  ranbundler list    Show \
	              every directive block"
)]
pub struct BundleCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Explicit config file. Its extension selects the format.
	#[arg(long, short, global = true)]
	pub config: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `ranbundler.toml` in the project root.
	///
	/// An existing config is never overwritten.
	Init,
	/// Write one filtered copy of the source tree per platform.
	///
	/// Every file with an eligible extension has the directive blocks that do
	/// not target the platform removed. Other files are copied unchanged.
	/// Exits with status 1 when any file could not be processed.
	Build {
		/// Build only this platform. Repeat for several.
		#[arg(long = "platform", short = 'P')]
		platforms: Vec<String>,

		/// Run platform passes one after another.
		#[arg(long, default_value_t = false)]
		sequential: bool,

		/// Report what would be written without touching the output.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Rebuild whenever a file in the input tree changes.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that every directive block is well formed.
	///
	/// Exits with status 1 when an unterminated or nested block is found.
	Check {
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List every directive block with its location and targets.
	List {
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print one file as it would be built for a platform.
	Filter {
		/// File to filter.
		file: PathBuf,

		/// Platform to filter for.
		#[arg(long, short = 'P')]
		platform: String,

		/// Emit kept blocks without their markers.
		#[arg(long, default_value_t = false)]
		strip_markers: bool,

		/// Show a diff against the original instead of the filtered text.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
