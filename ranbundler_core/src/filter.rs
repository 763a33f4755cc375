use crate::BundleResult;
use crate::lexer::has_open_marker;
use crate::matcher::matches;
use crate::parser::DirectiveBlock;
use crate::parser::parse;
use crate::parser::parse_strict;

/// Options controlling how matching blocks are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
	/// When true, a block kept for the active platform is replaced by its body
	/// so the output carries no directive markers. By default kept blocks are
	/// emitted verbatim, markers included.
	pub strip_markers: bool,
}

/// The result of filtering one document for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
	/// The transformed text.
	pub text: String,
	/// Number of blocks retained for the platform.
	pub kept: usize,
	/// Number of blocks deleted.
	pub removed: usize,
	/// Total bytes of the deleted block spans.
	pub removed_bytes: usize,
}

impl FilterOutcome {
	fn unchanged(text: &str) -> Self {
		Self {
			text: text.to_string(),
			..Self::default()
		}
	}

	/// Returns true when the filter left the document untouched.
	pub fn is_unchanged(&self) -> bool {
		self.removed == 0 && self.kept == 0
	}
}

/// Remove every directive block of `text` that does not target `platform`.
///
/// Kept blocks are emitted verbatim. Malformed directives are tolerated: an
/// unterminated block stays in the output as plain text.
pub fn filter(text: &str, platform: &str) -> String {
	filter_with_options(text, platform, FilterOptions::default()).text
}

/// Like [`filter`], with options and block counts.
pub fn filter_with_options(text: &str, platform: &str, options: FilterOptions) -> FilterOutcome {
	if !has_open_marker(text) {
		return FilterOutcome::unchanged(text);
	}

	apply_blocks(text, &parse(text), platform, options)
}

/// Like [`filter_with_options`], but an unterminated or nested directive is an
/// error instead of being tolerated.
pub fn filter_strict(
	text: &str,
	platform: &str,
	options: FilterOptions,
) -> BundleResult<FilterOutcome> {
	if !has_open_marker(text) {
		return Ok(FilterOutcome::unchanged(text));
	}

	let blocks = parse_strict(text)?;
	Ok(apply_blocks(text, &blocks, platform, options))
}

/// Rebuild `text` with the decisions for `blocks` applied. Every span was
/// located in the original text and blocks are disjoint and ordered, so the
/// edits are applied in one pass over the immutable source.
fn apply_blocks(
	text: &str,
	blocks: &[DirectiveBlock],
	platform: &str,
	options: FilterOptions,
) -> FilterOutcome {
	let mut output = String::with_capacity(text.len());
	let mut cursor = 0;
	let mut kept = 0;
	let mut removed = 0;
	let mut removed_bytes = 0;

	for block in blocks {
		output.push_str(&text[cursor..block.start]);

		if matches(&block.declaration, platform) {
			kept += 1;
			if options.strip_markers {
				output.push_str(block.body(text));
			} else {
				output.push_str(block.span(text));
			}
		} else {
			removed += 1;
			removed_bytes += block.len();
		}

		cursor = block.end;
	}

	output.push_str(&text[cursor..]);

	FilterOutcome {
		text: output,
		kept,
		removed,
		removed_bytes,
	}
}
