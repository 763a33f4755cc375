use std::collections::HashMap;
use std::path::PathBuf;

use tokio::task::JoinSet;

use crate::BundleError;
use crate::BundleResult;
use crate::config::BundleConfig;
use crate::platform_file::patch_platform_file;
use crate::platform_file::patch_platform_record;
use crate::walker::FileFailure;
use crate::walker::PlatformReport;
use crate::walker::WalkOptions;
use crate::walker::walk_platform;

/// Per-run overrides on top of the loaded [`BundleConfig`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
	/// Build only these platforms. Each must appear in the config. `None`
	/// builds every configured platform.
	pub platforms: Option<Vec<String>>,
	/// Override the config's `concurrent` setting.
	pub concurrent: Option<bool>,
	/// Compute reports without writing anything.
	pub dry_run: bool,
}

/// A platform pass that could not run at all.
#[derive(Debug)]
pub struct PlatformError {
	pub platform: String,
	pub error: BundleError,
}

/// Result of building every selected platform.
#[derive(Debug, Default)]
pub struct BuildReport {
	/// Reports of the platform passes that ran, in config order.
	pub platforms: Vec<PlatformReport>,
	/// Platform passes that failed before walking.
	pub errors: Vec<PlatformError>,
}

impl BuildReport {
	/// Returns true when every platform ran and every entry was processed.
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty() && self.platforms.iter().all(PlatformReport::is_ok)
	}

	/// Number of per-entry failures across all platforms.
	pub fn failure_count(&self) -> usize {
		self.platforms
			.iter()
			.map(|report| report.failures.len())
			.sum::<usize>()
			+ self.errors.len()
	}
}

/// Everything one platform pass needs. Jobs own their data so they can move
/// onto a blocking worker without sharing state with other passes.
#[derive(Debug, Clone)]
struct PlatformJob {
	platform: String,
	input: PathBuf,
	output: PathBuf,
	platform_file: Option<PathBuf>,
	options: WalkOptions,
}

impl PlatformJob {
	fn run(self) -> BundleResult<PlatformReport> {
		let mut report = walk_platform(&self.input, &self.output, &self.platform, &self.options)?;

		if let Some(platform_file) = &self.platform_file {
			let result = if self.options.dry_run {
				let source = self.input.join(platform_file);
				std::fs::read_to_string(&source)
					.map_err(BundleError::from)
					.and_then(|text| patch_platform_record(&text, &self.platform).map(|_| ()))
					.map_err(|error| error.with_file(source.display().to_string()))
			} else {
				patch_platform_file(&self.output.join(platform_file), &self.platform)
			};

			match result {
				Ok(()) => report.patched = Some(self.output.join(platform_file)),
				Err(error) => {
					tracing::warn!(platform = self.platform, %error, "failed to patch platform file");
					report.failures.push(FileFailure {
						path: platform_file.clone(),
						error,
					});
				}
			}
		}

		Ok(report)
	}
}

/// Build every selected platform of `config`.
///
/// Configuration problems (unknown platform, invalid patterns, unreadable
/// input) fail the whole build before any pass starts. Passes then run as
/// independent tasks, concurrently unless disabled, and are all joined
/// before this returns.
pub async fn build(config: &BundleConfig, options: &BuildOptions) -> BundleResult<BuildReport> {
	let jobs = plan_jobs(config, options)?;
	let concurrent = options.concurrent.unwrap_or(config.concurrent);
	let mut results = Vec::with_capacity(jobs.len());

	if concurrent && jobs.len() > 1 {
		let mut tasks = JoinSet::new();
		let mut platforms = HashMap::new();

		for (index, job) in jobs.into_iter().enumerate() {
			let platform = job.platform.clone();
			let handle = tasks.spawn_blocking(move || job.run());
			platforms.insert(handle.id(), (index, platform));
		}

		let mut joined = Vec::with_capacity(platforms.len());
		while let Some(next) = tasks.join_next_with_id().await {
			let (id, result) = match next {
				Ok((id, result)) => (id, Ok(result)),
				Err(error) => (error.id(), Err(error)),
			};
			let Some((index, platform)) = platforms.remove(&id) else {
				continue;
			};
			let result = result.unwrap_or_else(|error| {
				Err(BundleError::TaskFailed {
					platform: platform.clone(),
					reason: error.to_string(),
				})
			});
			joined.push((index, platform, result));
		}

		// Report in config order, not completion order.
		joined.sort_by_key(|(index, ..)| *index);
		results.extend(joined.into_iter().map(|(_, platform, result)| (platform, result)));
	} else {
		for job in jobs {
			let platform = job.platform.clone();
			results.push((platform, job.run()));
		}
	}

	let mut report = BuildReport::default();
	for (platform, result) in results {
		match result {
			Ok(platform_report) => report.platforms.push(platform_report),
			Err(error) => {
				tracing::error!(platform, %error, "platform pass failed");
				report.errors.push(PlatformError { platform, error });
			}
		}
	}

	Ok(report)
}

/// Blocking wrapper around [`build`] that drives its own runtime.
pub fn build_blocking(config: &BundleConfig, options: &BuildOptions) -> BundleResult<BuildReport> {
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()?;
	runtime.block_on(build(config, options))
}

fn plan_jobs(config: &BundleConfig, options: &BuildOptions) -> BundleResult<Vec<PlatformJob>> {
	let input = config.input_dir();
	if !input.is_dir() {
		return Err(BundleError::UnreadableRoot(input));
	}

	let mut walk_options = WalkOptions::from_config(config)?;
	walk_options.dry_run = options.dry_run;

	let platforms: Vec<&String> = match &options.platforms {
		Some(selected) => {
			if let Some(unknown) = selected.iter().find(|p| !config.platforms.contains(*p)) {
				return Err(BundleError::InvalidConfig(format!(
					"platform `{unknown}` is not listed in `platforms`"
				)));
			}
			config
				.platforms
				.iter()
				.filter(|platform| selected.contains(*platform))
				.collect()
		}
		None => config.platforms.iter().collect(),
	};

	Ok(platforms
		.into_iter()
		.map(|platform| {
			PlatformJob {
				platform: platform.clone(),
				input: input.clone(),
				output: config.platform_output_dir(platform),
				platform_file: config.platform_file.clone(),
				options: walk_options.clone(),
			}
		})
		.collect())
}
