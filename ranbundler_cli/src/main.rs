use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use ranbundler_cli::BundleCli;
use ranbundler_cli::Commands;
use ranbundler_cli::OutputFormat;
use ranbundler_core::AnyEmptyResult;
use ranbundler_core::AnyResult;
use ranbundler_core::BuildOptions;
use ranbundler_core::BuildReport;
use ranbundler_core::BundleConfig;
use ranbundler_core::BundleError;
use ranbundler_core::FilterOptions;
use ranbundler_core::PlatformReport;
use ranbundler_core::build;
use ranbundler_core::filter_with_options;
use ranbundler_core::scan_project;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = r#"# ranbundler configuration

# Shared source tree and the directory receiving one tree per platform.
input = "."
output = "build-target"

# Directory names skipped with their whole subtree.
ignore = ["node_modules", "build-target", ".git"]

# Platform identifiers. Each gets its own output tree.
platforms = ["mobile", "web"]

# Files with these extensions are filtered. Everything else is copied.
# extensions = ["jsx", "tsx", "vue", "svelte", "astro"]

# Gitignore-style patterns left out of every output tree.
# exclude = ["*.stories.tsx"]

# File whose `PLATFORM: { ... }` record is rewritten per platform.
# platform_file = "platform.ts"

# [directives]
# strip_markers = false
# strict = false
"#;

fn main() {
	let args = BundleCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminal support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, configured_log_level(&args).as_deref());

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Build {
			platforms,
			sequential,
			dry_run,
			watch,
		}) => run_build(&args, platforms, *sequential, *dry_run, *watch),
		Some(Commands::Check { format }) => run_check(&args, *format),
		Some(Commands::List { format }) => run_list(&args, *format),
		Some(Commands::Filter {
			file,
			platform,
			strip_markers,
			diff,
		}) => run_filter(file, platform, *strip_markers, *diff),
		None => {
			eprintln!("No subcommand specified. Run `ranbundler --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<BundleError>() {
			Ok(bundle_err) => {
				let report: miette::Report = (*bundle_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Install the stderr subscriber.
///
/// Priority: `RUST_LOG` > `--verbose` > config `log_level` > `warn`.
fn init_logging(verbose: bool, config_level: Option<&str>) {
	let filter = match EnvFilter::try_from_default_env() {
		Ok(filter) => filter,
		Err(_) if verbose => EnvFilter::new("debug"),
		Err(_) => EnvFilter::new(config_level.unwrap_or("warn")),
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.compact()
		.init();
}

/// Best effort peek at the config's `log_level`, before logging exists to
/// report a broken config. Commands load the config again and surface errors.
fn configured_log_level(args: &BundleCli) -> Option<String> {
	if matches!(args.command, Some(Commands::Init | Commands::Filter { .. }) | None) {
		return None;
	}

	load_config(args).ok().and_then(|config| config.log_level)
}

fn resolve_root(args: &BundleCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &BundleCli) -> Result<BundleConfig, BundleError> {
	if let Some(path) = &args.config {
		return BundleConfig::load_from_path(path);
	}

	let root = resolve_root(args);
	BundleConfig::load(&root)?.ok_or(BundleError::MissingConfig(root))
}

fn run_init(args: &BundleCli) -> AnyEmptyResult {
	let root = resolve_root(args);

	if let Some(existing) = BundleConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("ranbundler.toml");
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created {}", config_path.display());
	println!();
	println!("Next steps:");
	println!("  1. Set `platforms` and `output` in ranbundler.toml");
	println!("  2. Wrap platform-specific code in your components:");
	println!("     <EXCLUSIVE OF=\"web\">...</EXCLUSIVE>");
	println!("  3. Run `ranbundler build`");

	Ok(())
}

fn run_build(
	args: &BundleCli,
	platforms: &[String],
	sequential: bool,
	dry_run: bool,
	watch: bool,
) -> AnyEmptyResult {
	let options = BuildOptions {
		platforms: (!platforms.is_empty()).then(|| platforms.to_vec()),
		concurrent: sequential.then_some(false),
		dry_run,
	};
	let runtime = tokio::runtime::Runtime::new()?;
	let config = load_config(args)?;
	let is_ok = run_build_once(args, &runtime, &config, &options)?;

	if !watch || dry_run {
		if !is_ok {
			process::exit(1);
		}
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let input = config.input_dir().canonicalize()?;
	let output = config
		.output_dir()
		.canonicalize()
		.unwrap_or_else(|_| config.output_dir());
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				let is_change = matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				);
				// Writes into the output tree must not retrigger a build.
				let outside_output = event.paths.iter().any(|path| !path.starts_with(&output));
				if is_change && outside_output {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&input, notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, rebuilding...");
		let rebuilt = load_config(args)
			.map_err(Into::into)
			.and_then(|config| run_build_once(args, &runtime, &config, &options));
		if let Err(e) = rebuilt {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Run a single build and return whether every platform succeeded.
fn run_build_once(
	args: &BundleCli,
	runtime: &tokio::runtime::Runtime,
	config: &BundleConfig,
	options: &BuildOptions,
) -> AnyResult<bool> {
	let report = runtime.block_on(build(config, options))?;
	print_build_report(args, config, options, &report);
	Ok(report.is_ok())
}

fn print_build_report(
	args: &BundleCli,
	config: &BundleConfig,
	options: &BuildOptions,
	report: &BuildReport,
) {
	let root = &config.root;
	let verb = if options.dry_run {
		"Dry run: would build"
	} else {
		"Built"
	};
	println!(
		"{verb} {} platform(s) from {} into {}",
		report.platforms.len(),
		make_relative(&config.input_dir(), root),
		make_relative(&config.output_dir(), root),
	);

	for platform in &report.platforms {
		print_platform_summary(platform);

		if args.verbose {
			for file in &platform.files {
				println!("    {}", make_relative(&file.destination, &platform.output));
			}
		}

		for failure in &platform.failures {
			eprintln!(
				"    {} {}: {}",
				colored!("failed:", red),
				make_relative(&failure.path, root),
				failure.error
			);
		}
	}

	for error in &report.errors {
		eprintln!(
			"  {} {}: {}",
			colored!("failed:", red),
			error.platform,
			error.error
		);
	}

	if !report.is_ok() {
		eprintln!(
			"\n{}",
			colored!(format!("{} failure(s).", report.failure_count()), yellow)
		);
	}
}

fn print_platform_summary(platform: &PlatformReport) {
	let status = if platform.is_ok() {
		colored!("ok", green)
	} else {
		colored!("failed", red)
	};
	let patched = if platform.patched.is_some() {
		", platform file patched"
	} else {
		""
	};

	println!(
		"  {} {}: {} filtered, {} copied, {} omitted, {} block(s) removed{patched}",
		colored!(platform.platform.as_str(), bold),
		status,
		platform.filtered_count(),
		platform.copied_count(),
		platform.omitted_count(),
		platform.removed_blocks(),
	);
}

fn run_check(args: &BundleCli, format: OutputFormat) -> AnyEmptyResult {
	let config = load_config(args)?;
	let input = config.input_dir();
	let report = scan_project(&config)?;

	match format {
		OutputFormat::Json => {
			let diagnostics: Vec<serde_json::Value> = report
				.files
				.iter()
				.flat_map(|file| {
					let path = make_relative(&file.path, &input);
					file.diagnostics.iter().map(move |diagnostic| {
						serde_json::json!({
							"file": path,
							"kind": diagnostic.kind,
							"line": diagnostic.point.line,
							"column": diagnostic.point.column,
							"offset": diagnostic.point.offset,
						})
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": report.is_ok(),
				"scanned": report.scanned,
				"blocks": report.block_count(),
				"diagnostics": diagnostics,
				"unreadable": report
					.unreadable
					.iter()
					.map(|path| make_relative(path, &input))
					.collect::<Vec<_>>(),
			});
			println!("{}", serde_json::to_string_pretty(&output)?);
		}
		OutputFormat::Text => {
			for file in &report.files {
				let path = make_relative(&file.path, &input);
				for diagnostic in &file.diagnostics {
					let error = diagnostic.clone().into_error(path.clone());
					eprintln!("{} {error}", colored!("error:", red));
				}
			}
			for path in &report.unreadable {
				eprintln!(
					"{} could not read {}",
					colored!("error:", red),
					make_relative(path, &input)
				);
			}

			if report.is_ok() {
				println!(
					"{}",
					colored!(
						format!(
							"Checked {} file(s): all {} directive block(s) are well formed.",
							report.scanned,
							report.block_count()
						),
						green
					)
				);
			} else {
				eprintln!(
					"\nFound {} malformed directive(s) in {} scanned file(s).",
					report.diagnostic_count() + report.unreadable.len(),
					report.scanned
				);
			}
		}
	}

	if !report.is_ok() {
		process::exit(1);
	}

	Ok(())
}

fn run_list(args: &BundleCli, format: OutputFormat) -> AnyEmptyResult {
	let config = load_config(args)?;
	let input = config.input_dir();
	let report = scan_project(&config)?;

	if format == OutputFormat::Json {
		let files: Vec<serde_json::Value> = report
			.files
			.iter()
			.filter(|file| !file.blocks.is_empty())
			.map(|file| {
				let blocks: Vec<serde_json::Value> = file
					.blocks
					.iter()
					.map(|block| {
						let targets = block.targets();
						serde_json::json!({
							"line": block.opening.line,
							"column": block.opening.column,
							"declaration": block.declaration,
							"unconditional": targets.is_unconditional(),
							"targets": *targets,
						})
					})
					.collect();
				serde_json::json!({
					"file": make_relative(&file.path, &input),
					"blocks": blocks,
				})
			})
			.collect();
		println!("{}", serde_json::to_string_pretty(&files)?);
		return Ok(());
	}

	if report.block_count() == 0 {
		println!("No directive blocks found.");
		return Ok(());
	}

	let mut file_count = 0;
	for file in report.files.iter().filter(|file| !file.blocks.is_empty()) {
		file_count += 1;
		println!("{}", colored!(make_relative(&file.path, &input), bold));
		for block in &file.blocks {
			let location = format!("{}:{}", block.opening.line, block.opening.column);
			println!("  {location:<8} {}", block.targets());
		}
	}

	println!();
	println!(
		"{} block(s) in {file_count} file(s)",
		report.block_count()
	);

	Ok(())
}

fn run_filter(
	file: &Path,
	platform: &str,
	strip_markers: bool,
	diff: bool,
) -> AnyEmptyResult {
	let original = std::fs::read_to_string(file)?;
	let outcome = filter_with_options(&original, platform, FilterOptions { strip_markers });

	if diff {
		print_diff(&original, &outcome.text);
		println!(
			"{} kept, {} removed ({} bytes)",
			outcome.kept, outcome.removed, outcome.removed_bytes
		);
	} else {
		print!("{}", outcome.text);
	}

	Ok(())
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("{}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("{}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!(" {change}");
			}
		}
	}
	// A last line without a newline would leave the summary mid-line.
	if [current, expected]
		.iter()
		.any(|text| !text.is_empty() && !text.ends_with('\n'))
	{
		println!();
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
