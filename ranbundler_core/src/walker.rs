use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::BundleError;
use crate::BundleResult;
use crate::config::BundleConfig;
use crate::config::DEFAULT_EXTENSIONS;
use crate::filter::FilterOptions;
use crate::filter::filter_strict;
use crate::filter::filter_with_options;

/// Options for mirroring a source tree into a platform output tree.
///
/// Use [`WalkOptions::default()`] for the built-in extension list or
/// [`WalkOptions::from_config`] to construct from a [`BundleConfig`].
#[derive(Debug, Clone)]
pub struct WalkOptions {
	/// Directory base names skipped with their subtree.
	pub ignore: HashSet<String>,
	/// Extensions (without the dot) of files passed through the filter,
	/// compared case-sensitively.
	pub extensions: Vec<String>,
	/// Extra files to filter, matched against paths relative to the input.
	pub include_set: GlobSet,
	/// Gitignore-style patterns for entries to leave out.
	pub exclude_patterns: Vec<String>,
	/// Directories never descended into, such as the root of all output
	/// trees when it lives inside the input. The pass's own output directory
	/// is always skipped.
	pub skip_dirs: Vec<PathBuf>,
	/// How kept blocks are emitted.
	pub filter: FilterOptions,
	/// Fail a file on malformed directives instead of tolerating them.
	pub strict: bool,
	/// Compute the report without touching the filesystem.
	pub dry_run: bool,
}

impl Default for WalkOptions {
	fn default() -> Self {
		Self {
			ignore: HashSet::new(),
			extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
			include_set: GlobSet::empty(),
			exclude_patterns: Vec::new(),
			skip_dirs: Vec::new(),
			filter: FilterOptions::default(),
			strict: false,
			dry_run: false,
		}
	}
}

impl WalkOptions {
	/// Construct [`WalkOptions`] from a [`BundleConfig`].
	pub fn from_config(config: &BundleConfig) -> BundleResult<Self> {
		Ok(Self {
			ignore: config.ignore.iter().cloned().collect(),
			extensions: config
				.extensions
				.iter()
				.map(|ext| ext.trim_start_matches('.').to_string())
				.collect(),
			include_set: build_glob_set(&config.include)?,
			exclude_patterns: config.exclude.clone(),
			skip_dirs: vec![config.output_dir()],
			filter: FilterOptions {
				strip_markers: config.directives.strip_markers,
			},
			strict: config.directives.strict,
			dry_run: false,
		})
	}

	/// Check if a file should go through the directive filter.
	pub fn is_filterable(&self, path: &Path, relative: &Path) -> bool {
		let by_extension = path
			.extension()
			.and_then(|e| e.to_str())
			.is_some_and(|ext| self.extensions.iter().any(|candidate| candidate == ext));

		by_extension || self.include_set.is_match(relative)
	}
}

/// What happened to a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum FileAction {
	/// Passed through the directive filter and written.
	Filtered { kept: usize, removed: usize },
	/// Copied byte for byte.
	Copied,
	/// Filtered down to nothing, so no output file was produced.
	Omitted { removed: usize },
}

/// A source file and where its output went.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
	pub source: PathBuf,
	pub destination: PathBuf,
	#[serde(flatten)]
	pub action: FileAction,
}

/// A file or directory that could not be processed.
#[derive(Debug)]
pub struct FileFailure {
	pub path: PathBuf,
	pub error: BundleError,
}

/// Outcome of one platform pass.
#[derive(Debug)]
pub struct PlatformReport {
	/// The platform the pass was built for.
	pub platform: String,
	/// Root of the platform's output tree.
	pub output: PathBuf,
	/// Every file that was filtered, copied or omitted.
	pub files: Vec<FileRecord>,
	/// Number of directories mirrored.
	pub directories: usize,
	/// Per-entry failures. The pass continued past each of them.
	pub failures: Vec<FileFailure>,
	/// The platform file that was patched, if any.
	pub patched: Option<PathBuf>,
}

impl PlatformReport {
	fn new(platform: &str, output: &Path) -> Self {
		Self {
			platform: platform.to_string(),
			output: output.to_path_buf(),
			files: Vec::new(),
			directories: 0,
			failures: Vec::new(),
			patched: None,
		}
	}

	/// Returns true when every entry was processed.
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty()
	}

	pub fn filtered_count(&self) -> usize {
		self.count(|action| matches!(action, FileAction::Filtered { .. }))
	}

	pub fn copied_count(&self) -> usize {
		self.count(|action| matches!(action, FileAction::Copied))
	}

	pub fn omitted_count(&self) -> usize {
		self.count(|action| matches!(action, FileAction::Omitted { .. }))
	}

	/// Total directive blocks deleted across all files.
	pub fn removed_blocks(&self) -> usize {
		self.files
			.iter()
			.map(|file| {
				match file.action {
					FileAction::Filtered { removed, .. } | FileAction::Omitted { removed } => removed,
					FileAction::Copied => 0,
				}
			})
			.sum()
	}

	fn count(&self, predicate: impl Fn(&FileAction) -> bool) -> usize {
		self.files
			.iter()
			.filter(|file| predicate(&file.action))
			.count()
	}
}

/// Mirror `input` into `output` for `platform`.
///
/// Fails only when the walk cannot start: `input` is not a directory, the
/// exclude patterns are invalid, or the previous output cannot be cleared
/// or recreated.
/// Problems with individual entries are logged, recorded in the report, and
/// skipped.
pub fn walk_platform(
	input: &Path,
	output: &Path,
	platform: &str,
	options: &WalkOptions,
) -> BundleResult<PlatformReport> {
	if !input.is_dir() {
		return Err(BundleError::UnreadableRoot(input.to_path_buf()));
	}

	let exclude = build_exclude_matcher(input, &options.exclude_patterns)?;
	if !options.dry_run {
		clear_output(input, output)?;
		std::fs::create_dir_all(output)?;
	}

	tracing::info!(
		platform,
		input = %input.display(),
		output = %output.display(),
		dry_run = options.dry_run,
		"starting platform pass"
	);

	let mut walker = TreeWalker {
		input,
		platform,
		options,
		exclude,
		skipped: options
			.skip_dirs
			.iter()
			.map(PathBuf::as_path)
			.chain(std::iter::once(output))
			.filter_map(|dir| dir.canonicalize().ok())
			.collect(),
		visited_dirs: HashSet::new(),
		report: PlatformReport::new(platform, output),
	};
	walker.walk_dir(input, output);

	let report = walker.report;
	tracing::info!(
		platform,
		filtered = report.filtered_count(),
		copied = report.copied_count(),
		omitted = report.omitted_count(),
		failures = report.failures.len(),
		"finished platform pass"
	);

	Ok(report)
}

/// Remove the output tree of a previous run so files omitted or deleted since
/// then do not linger. An output that contains the input is left alone.
fn clear_output(input: &Path, output: &Path) -> BundleResult<()> {
	let Ok(output_canonical) = output.canonicalize() else {
		return Ok(());
	};

	if input
		.canonicalize()
		.is_ok_and(|input| input.starts_with(&output_canonical))
	{
		tracing::warn!(output = %output.display(), "output contains the input, not clearing it");
		return Ok(());
	}

	tracing::debug!(output = %output.display(), "clearing previous output");
	match std::fs::remove_dir_all(output) {
		Ok(()) => Ok(()),
		Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(error) => Err(error.into()),
	}
}

/// Walks one source tree for one platform, building the report as it goes.
struct TreeWalker<'a> {
	input: &'a Path,
	platform: &'a str,
	options: &'a WalkOptions,
	/// Matcher for the `exclude` patterns.
	exclude: Gitignore,
	/// Canonical paths of the output tree and `skip_dirs` that exist, so an
	/// output nested inside the input is never mirrored into itself.
	skipped: Vec<PathBuf>,
	/// Canonical paths of visited directories, for symlink cycle detection.
	visited_dirs: HashSet<PathBuf>,
	report: PlatformReport,
}

impl TreeWalker<'_> {
	fn walk_dir(&mut self, dir: &Path, destination: &Path) {
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !self.visited_dirs.insert(canonical) {
			self.fail(dir, BundleError::SymlinkCycle(dir.to_path_buf()));
			return;
		}

		let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
			Ok(entries) => entries.filter_map(Result::ok).map(|e| e.path()).collect(),
			Err(error) => {
				self.fail(dir, error.into());
				return;
			}
		};
		// Sort for deterministic reports.
		entries.sort();

		for path in entries {
			let Some(name) = path.file_name() else {
				continue;
			};
			let target = destination.join(name);
			let is_dir = path.is_dir();

			if self.exclude.matched(&path, is_dir).is_ignore() {
				tracing::debug!(path = %path.display(), "excluded");
				continue;
			}

			if is_dir {
				if self.is_ignored_dir(&path) {
					tracing::debug!(path = %path.display(), "ignored directory");
					continue;
				}

				if !self.options.dry_run {
					if let Err(error) = std::fs::create_dir_all(&target) {
						self.fail(&path, error.into());
						continue;
					}
				}

				self.report.directories += 1;
				self.walk_dir(&path, &target);
			} else {
				self.visit_file(&path, target);
			}
		}
	}

	fn is_ignored_dir(&self, path: &Path) -> bool {
		let by_name = path
			.file_name()
			.and_then(|n| n.to_str())
			.is_some_and(|name| self.options.ignore.contains(name));

		by_name
			|| path
				.canonicalize()
				.is_ok_and(|canonical| self.skipped.contains(&canonical))
	}

	fn visit_file(&mut self, source: &Path, destination: PathBuf) {
		let relative = source.strip_prefix(self.input).unwrap_or(source);
		let result = if self.options.is_filterable(source, relative) {
			self.filter_file(source, &destination)
		} else {
			self.copy_file(source, &destination)
		};

		match result {
			Ok(action) => {
				tracing::debug!(
					platform = self.platform,
					file = %relative.display(),
					?action,
					"processed file"
				);
				self.report.files.push(FileRecord {
					source: source.to_path_buf(),
					destination,
					action,
				});
			}
			Err(error) => self.fail(source, error),
		}
	}

	fn filter_file(&self, source: &Path, destination: &Path) -> BundleResult<FileAction> {
		let text = std::fs::read_to_string(source)?;
		let outcome = if self.options.strict {
			filter_strict(&text, self.platform, self.options.filter)
				.map_err(|error| error.with_file(source.display().to_string()))?
		} else {
			filter_with_options(&text, self.platform, self.options.filter)
		};

		if outcome.text.is_empty() {
			return Ok(FileAction::Omitted {
				removed: outcome.removed,
			});
		}

		if !self.options.dry_run {
			std::fs::write(destination, &outcome.text)?;
		}

		Ok(FileAction::Filtered {
			kept: outcome.kept,
			removed: outcome.removed,
		})
	}

	fn copy_file(&self, source: &Path, destination: &Path) -> BundleResult<FileAction> {
		if !self.options.dry_run {
			std::fs::copy(source, destination)?;
		}

		Ok(FileAction::Copied)
	}

	fn fail(&mut self, path: &Path, error: BundleError) {
		tracing::warn!(
			platform = self.platform,
			path = %path.display(),
			%error,
			"skipping entry"
		);
		self.report.failures.push(FileFailure {
			path: path.to_path_buf(),
			error,
		});
	}
}

/// Every file under `input` that a platform pass would run through the
/// directive filter, honoring the same ignore, exclude and skip rules.
/// Sorted by path. Unreadable directories are skipped with a warning.
pub fn filterable_files(input: &Path, options: &WalkOptions) -> BundleResult<Vec<PathBuf>> {
	if !input.is_dir() {
		return Err(BundleError::UnreadableRoot(input.to_path_buf()));
	}

	let exclude = build_exclude_matcher(input, &options.exclude_patterns)?;
	let skipped: Vec<PathBuf> = options
		.skip_dirs
		.iter()
		.filter_map(|dir| dir.canonicalize().ok())
		.collect();
	let mut files = Vec::new();
	let mut pending = vec![input.to_path_buf()];

	while let Some(dir) = pending.pop() {
		let entries = match std::fs::read_dir(&dir) {
			Ok(entries) => entries,
			Err(error) => {
				tracing::warn!(path = %dir.display(), %error, "skipping unreadable directory");
				continue;
			}
		};

		for path in entries.filter_map(Result::ok).map(|e| e.path()) {
			let is_dir = path.is_dir();
			if exclude.matched(&path, is_dir).is_ignore() {
				continue;
			}

			if is_dir {
				let ignored = path
					.file_name()
					.and_then(|n| n.to_str())
					.is_some_and(|name| options.ignore.contains(name));
				let skip = path
					.canonicalize()
					.is_ok_and(|canonical| skipped.contains(&canonical));
				// Symlinked directories are not followed here.
				if !ignored && !skip && !path.is_symlink() {
					pending.push(path);
				}
			} else {
				let relative = path.strip_prefix(input).unwrap_or(&path);
				if options.is_filterable(&path, relative) {
					files.push(path);
				}
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Build a `GlobSet` from a list of glob pattern strings.
fn build_glob_set(patterns: &[String]) -> BundleResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			BundleError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map_err(|e| {
		BundleError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// Build a `Gitignore` matcher from `exclude` patterns, rooted at the input
/// directory.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> BundleResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			BundleError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}

	builder.build().map_err(|e| {
		BundleError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}
