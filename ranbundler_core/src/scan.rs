use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::BundleResult;
use crate::config::BundleConfig;
use crate::parser::DirectiveBlock;
use crate::parser::ParseDiagnostic;
use crate::parser::parse_with_diagnostics;
use crate::walker::WalkOptions;
use crate::walker::filterable_files;

/// Directive blocks and structural problems found in one source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDirectives {
	pub path: PathBuf,
	pub blocks: Vec<DirectiveBlock>,
	pub diagnostics: Vec<ParseDiagnostic>,
}

/// Result of scanning a source tree without producing any output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
	/// Files containing at least one directive block or diagnostic.
	pub files: Vec<FileDirectives>,
	/// Number of eligible files inspected.
	pub scanned: usize,
	/// Paths that could not be read as text.
	pub unreadable: Vec<PathBuf>,
}

impl ScanReport {
	pub fn block_count(&self) -> usize {
		self.files.iter().map(|file| file.blocks.len()).sum()
	}

	pub fn diagnostic_count(&self) -> usize {
		self.files.iter().map(|file| file.diagnostics.len()).sum()
	}

	/// Returns true when no file has a malformed directive.
	pub fn is_ok(&self) -> bool {
		self.diagnostic_count() == 0 && self.unreadable.is_empty()
	}
}

/// Scan every eligible file of the config's input tree for directive blocks.
pub fn scan_project(config: &BundleConfig) -> BundleResult<ScanReport> {
	scan_tree(&config.input_dir(), &WalkOptions::from_config(config)?)
}

/// Scan every eligible file under `input` for directive blocks.
pub fn scan_tree(input: &Path, options: &WalkOptions) -> BundleResult<ScanReport> {
	let mut report = ScanReport::default();

	for path in filterable_files(input, options)? {
		report.scanned += 1;
		let content = match std::fs::read_to_string(&path) {
			Ok(content) => content,
			Err(error) => {
				tracing::warn!(path = %path.display(), %error, "failed to read file");
				report.unreadable.push(path);
				continue;
			}
		};

		let (blocks, diagnostics) = parse_with_diagnostics(&content);
		if blocks.is_empty() && diagnostics.is_empty() {
			continue;
		}

		report.files.push(FileDirectives {
			path,
			blocks,
			diagnostics,
		});
	}

	Ok(report)
}
