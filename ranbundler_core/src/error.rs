use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::parser::MalformedKind;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum BundleError {
	#[error(transparent)]
	#[diagnostic(code(ranbundler::io_error))]
	Io(#[from] std::io::Error),

	#[error("no config file found in `{0}`")]
	#[diagnostic(
		code(ranbundler::missing_config),
		help("create `ranbundler.toml` (run `ranbundler init`) or pass `--config <FILE>`")
	)]
	MissingConfig(PathBuf),

	#[error("failed to parse config file `{path}`: {reason}")]
	#[diagnostic(
		code(ranbundler::config_parse),
		help("the config needs `input`, `output`, `ignore` and `platforms` fields")
	)]
	ConfigParse { path: PathBuf, reason: String },

	#[error("unsupported config file format: `{0}`")]
	#[diagnostic(
		code(ranbundler::unsupported_config_format),
		help("supported formats: toml, json")
	)]
	UnsupportedConfigFormat(String),

	#[error("invalid config: {0}")]
	#[diagnostic(code(ranbundler::invalid_config))]
	InvalidConfig(String),

	#[error("input path `{0}` is not a readable directory")]
	#[diagnostic(code(ranbundler::unreadable_root))]
	UnreadableRoot(PathBuf),

	#[error("{kind} directive block in {file} at {line}:{column} (offset {offset})")]
	#[diagnostic(
		code(ranbundler::malformed_directive),
		help("close every `<EXCLUSIVE ...>` with `</EXCLUSIVE>` before opening another")
	)]
	MalformedDirective {
		file: String,
		kind: MalformedKind,
		offset: usize,
		line: usize,
		column: usize,
	},

	#[error("no `PLATFORM` record found in `{0}`")]
	#[diagnostic(
		code(ranbundler::missing_platform_record),
		help("add `PLATFORM: {{ MODE: \"\", NAME: \"\", ID: \"\" }}` to the platform file")
	)]
	MissingPlatformRecord(String),

	#[error("symlink cycle detected at: `{0}`")]
	#[diagnostic(
		code(ranbundler::symlink_cycle),
		help("remove the circular symlink or add it to `exclude`")
	)]
	SymlinkCycle(PathBuf),

	#[error("invalid exclude pattern `{pattern}`: {reason}")]
	#[diagnostic(code(ranbundler::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("platform task for `{platform}` failed: {reason}")]
	#[diagnostic(code(ranbundler::task_failed))]
	TaskFailed { platform: String, reason: String },
}

impl BundleError {
	/// Attach a file name to an error raised by the in-memory filter, which
	/// has no notion of paths.
	#[must_use]
	pub fn with_file(self, file: impl Into<String>) -> Self {
		match self {
			Self::MalformedDirective {
				kind,
				offset,
				line,
				column,
				..
			} => {
				Self::MalformedDirective {
					file: file.into(),
					kind,
					offset,
					line,
					column,
				}
			}
			Self::MissingPlatformRecord(_) => Self::MissingPlatformRecord(file.into()),
			other => other,
		}
	}
}

pub type BundleResult<T> = Result<T, BundleError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
