use std::path::Path;

use crate::BundleError;
use crate::BundleResult;

/// Keyword introducing the platform identity record.
pub const PLATFORM_KEYWORD: &str = "PLATFORM";

/// Format the platform identity record for `platform`.
pub fn platform_record(platform: &str) -> String {
	format!(r#"{PLATFORM_KEYWORD}: {{ MODE: "{platform}", NAME: "{platform}", ID: "{platform}" }}"#)
}

/// Replace the first `PLATFORM` record of `text`, from the keyword through
/// the next `}`, with a record whose mode, name and id are all `platform`.
pub fn patch_platform_record(text: &str, platform: &str) -> BundleResult<String> {
	let missing = || BundleError::MissingPlatformRecord(String::from("<input>"));
	let start = text.find(PLATFORM_KEYWORD).ok_or_else(missing)?;
	let close = text[start..].find('}').ok_or_else(missing)?;
	let end = start + close + 1;

	let record = platform_record(platform);
	let mut patched = String::with_capacity(text.len() - (end - start) + record.len());
	patched.push_str(&text[..start]);
	patched.push_str(&record);
	patched.push_str(&text[end..]);

	Ok(patched)
}

/// Patch the platform record of the file at `path` in place. The file is
/// only written when the record was found.
pub fn patch_platform_file(path: &Path, platform: &str) -> BundleResult<()> {
	let text = std::fs::read_to_string(path)?;
	let patched = patch_platform_record(&text, platform)
		.map_err(|error| error.with_file(path.display().to_string()))?;
	std::fs::write(path, patched)?;

	tracing::debug!(file = %path.display(), platform, "patched platform record");
	Ok(())
}
