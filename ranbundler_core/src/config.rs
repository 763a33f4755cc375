use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::BundleError;
use crate::BundleResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"ranbundler.toml",
	"ranbundler.json",
	".config/ranbundler.toml",
];

/// File extensions whose contents are passed through the directive filter
/// when the config does not list its own.
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["jsx", "tsx", "vue", "svelte", "astro"];

/// Serialization used by a config file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> BundleResult<Self> {
		let extension = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		match extension.as_str() {
			"toml" => Ok(Self::Toml),
			"json" => Ok(Self::Json),
			other => Err(BundleError::UnsupportedConfigFormat(other.to_string())),
		}
	}
}

/// Configuration loaded from `ranbundler.toml` or `ranbundler.json`.
///
/// ```toml
/// input = "."
/// output = "build-target"
/// ignore = ["node_modules", "build-target", ".git"]
/// platforms = ["mobile", "web"]
///
/// extensions = ["jsx", "tsx", "vue", "svelte", "astro"]
/// include = ["src/**/*.html"]
/// exclude = ["*.stories.tsx"]
/// platform_file = "platform.ts"
/// concurrent = true
/// log_level = "info"
///
/// [directives]
/// strip_markers = false
/// strict = false
/// ```
///
/// The JSON form uses the same keys. Relative paths are resolved against the
/// project root, the directory holding the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleConfig {
	/// Root of the shared source tree.
	pub input: PathBuf,
	/// Directory receiving one sub-directory per platform.
	pub output: PathBuf,
	/// Directory base names skipped together with their whole subtree.
	#[serde(alias = "ignored_paths")]
	pub ignore: Vec<String>,
	/// Platform identifiers to build, in order.
	#[serde(alias = "targets")]
	pub platforms: Vec<String>,
	/// Extensions (without the dot) of files passed through the filter.
	#[serde(default = "default_extensions")]
	pub extensions: Vec<String>,
	/// Glob patterns, relative to `input`, of additional files to filter
	/// regardless of their extension.
	#[serde(default)]
	pub include: Vec<String>,
	/// Gitignore-style patterns for files and directories to leave out of the
	/// output entirely.
	#[serde(default)]
	pub exclude: Vec<String>,
	/// File, relative to `input`, whose `PLATFORM` record is rewritten in
	/// each platform's output tree.
	#[serde(default)]
	pub platform_file: Option<PathBuf>,
	/// Run platform passes concurrently. Defaults to `true`.
	#[serde(default = "default_concurrent")]
	pub concurrent: bool,
	/// Default log filter when neither `RUST_LOG` nor `--verbose` is given.
	#[serde(default)]
	pub log_level: Option<String>,
	/// Directive handling options.
	#[serde(default)]
	pub directives: DirectivesConfig,
	/// Directory the config was loaded from.
	#[serde(skip)]
	pub root: PathBuf,
}

/// Configuration for directive handling.
///
/// ```toml
/// [directives]
/// strip_markers = true
/// strict = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectivesConfig {
	/// Remove the markers of blocks kept for the active platform, leaving
	/// only their body.
	#[serde(default)]
	pub strip_markers: bool,
	/// Treat unterminated and nested directives as errors. The offending file
	/// is skipped and reported; the rest of the build continues.
	#[serde(default)]
	pub strict: bool,
}

fn default_extensions() -> Vec<String> {
	DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect()
}

fn default_concurrent() -> bool {
	true
}

impl BundleConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no candidate exists.
	pub fn load(root: &Path) -> BundleResult<Option<BundleConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let mut config = Self::load_from_path(&config_path)?;
		config.root = root.to_path_buf();
		Ok(Some(config))
	}

	/// Load the config from an explicit file. The format follows the file
	/// extension and the project root is the file's directory.
	pub fn load_from_path(path: &Path) -> BundleResult<BundleConfig> {
		let format = ConfigFormat::from_path(path)?;
		let content = std::fs::read_to_string(path)?;
		let mut config = Self::parse(&content, format, path)?;
		config.root = project_root_for(path);
		Ok(config)
	}

	/// Parse and validate config `content`. `path` is only used in error
	/// messages.
	pub fn parse(content: &str, format: ConfigFormat, path: &Path) -> BundleResult<BundleConfig> {
		let parse_error = |reason: String| {
			BundleError::ConfigParse {
				path: path.to_path_buf(),
				reason,
			}
		};

		let config: BundleConfig = match format {
			ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
			ConfigFormat::Json => {
				serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
			}
		};

		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> BundleResult<()> {
		if self.platforms.is_empty() {
			return Err(BundleError::InvalidConfig(
				"`platforms` must name at least one platform".to_string(),
			));
		}

		if self.platforms.iter().any(|platform| platform.trim().is_empty()) {
			return Err(BundleError::InvalidConfig(
				"`platforms` contains an empty identifier".to_string(),
			));
		}

		if let Some(duplicate) = self
			.platforms
			.iter()
			.enumerate()
			.find(|&(index, platform)| self.platforms[..index].contains(platform))
			.map(|(_, platform)| platform)
		{
			return Err(BundleError::InvalidConfig(format!(
				"platform `{duplicate}` is listed more than once"
			)));
		}

		if self.output.as_os_str().is_empty() {
			return Err(BundleError::InvalidConfig(
				"`output` must not be empty".to_string(),
			));
		}

		Ok(())
	}

	/// Absolute-or-root-relative path of the source tree.
	pub fn input_dir(&self) -> PathBuf {
		self.root.join(&self.input)
	}

	/// Root of all platform output trees.
	pub fn output_dir(&self) -> PathBuf {
		self.root.join(&self.output)
	}

	/// Output tree of a single platform.
	pub fn platform_output_dir(&self, platform: &str) -> PathBuf {
		self.output_dir().join(platform)
	}
}

/// The project root of a config file: its directory, or the parent of a
/// `.config` directory.
fn project_root_for(path: &Path) -> PathBuf {
	let parent = path.parent().unwrap_or_else(|| Path::new(""));
	let parent = if parent.file_name().is_some_and(|name| name == ".config") {
		parent.parent().unwrap_or(parent)
	} else {
		parent
	};

	if parent.as_os_str().is_empty() {
		PathBuf::from(".")
	} else {
		parent.to_path_buf()
	}
}
