use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::BundleError;
use crate::BundleResult;
use crate::lexer::CLOSE_MARKER;
use crate::lexer::DECLARATION_TERMINATOR;
use crate::lexer::OPEN_MARKER;
use crate::lexer::memstr;
use crate::matcher::TargetList;
use crate::matcher::target_list;
use crate::position::LineTable;
use crate::position::Point;

/// A directive block located in a document.
///
/// All offsets are byte offsets into the original text and satisfy
/// `start < body_start <= body_end < end`.
///
/// ```text
/// <EXCLUSIVE OF="web">body</EXCLUSIVE>
/// ^start    ^         ^   ^           ^end
///           |         |   body_end
///           |         body_start
///           opening marker ends, declaration starts
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveBlock {
	/// Offset of the `<` of the opening marker.
	pub start: usize,
	/// Offset just past the closing marker.
	pub end: usize,
	/// Offset of the first byte of the enclosed content.
	pub body_start: usize,
	/// Offset of the `<` of the closing marker.
	pub body_end: usize,
	/// Raw text between `<EXCLUSIVE` and the first `>` of the block.
	pub declaration: String,
	/// Location of the opening marker.
	pub opening: Point,
}

impl DirectiveBlock {
	/// The full text of the block, markers included.
	pub fn span<'a>(&self, source: &'a str) -> &'a str {
		&source[self.start..self.end]
	}

	/// The enclosed content without markers.
	pub fn body<'a>(&self, source: &'a str) -> &'a str {
		&source[self.body_start..self.body_end]
	}

	/// Platforms named by the declaration, for display.
	pub fn targets(&self) -> TargetList {
		target_list(&self.declaration)
	}

	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Structural problems the scanner tolerates in lenient mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum MalformedKind {
	/// An opening marker with no closing marker before end of input.
	#[display("unterminated")]
	Unterminated,
	/// An opening marker found inside a block that is still open.
	#[display("nested")]
	Nested,
}

/// A diagnostic produced while scanning. These don't prevent filtering but
/// indicate problems in the directive structure of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
	pub kind: MalformedKind,
	/// Location of the offending opening marker.
	pub point: Point,
}

impl ParseDiagnostic {
	/// Convert into a [`BundleError::MalformedDirective`] for `file`.
	pub fn into_error(self, file: impl Into<String>) -> BundleError {
		BundleError::MalformedDirective {
			file: file.into(),
			kind: self.kind,
			offset: self.point.offset,
			line: self.point.line,
			column: self.point.column,
		}
	}
}

/// Scan `content` and return all directive blocks. Structural problems are
/// ignored: an unterminated block is left out of the result, and an opening
/// marker inside an open block is treated as body text.
pub fn parse(content: &str) -> Vec<DirectiveBlock> {
	parse_with_diagnostics(content).0
}

/// Like [`parse`], but fails on the first structural problem.
pub fn parse_strict(content: &str) -> BundleResult<Vec<DirectiveBlock>> {
	let (blocks, diagnostics) = parse_with_diagnostics(content);
	match diagnostics.into_iter().next() {
		Some(diagnostic) => Err(diagnostic.into_error("<input>")),
		None => Ok(blocks),
	}
}

/// Scan `content` and return blocks together with diagnostics.
///
/// This is a single linear pass: each opening marker is paired with the first
/// closing marker that follows it and scanning resumes after that closing
/// marker, so the returned blocks are disjoint and sorted by `start`.
pub fn parse_with_diagnostics(content: &str) -> (Vec<DirectiveBlock>, Vec<ParseDiagnostic>) {
	let bytes = content.as_bytes();
	let open_marker = OPEN_MARKER.as_bytes();
	let close_marker = CLOSE_MARKER.as_bytes();
	let mut blocks = Vec::new();
	let mut diagnostics = Vec::new();
	let mut search_from = 0;

	// Only built when a marker is actually found.
	let mut line_table: Option<LineTable> = None;
	let mut point_at = |offset: usize| {
		line_table
			.get_or_insert_with(|| LineTable::new(content))
			.point(offset)
	};

	while search_from < bytes.len() {
		let Some(open_offset) = memstr(&bytes[search_from..], open_marker) else {
			break;
		};
		let start = search_from + open_offset;
		let after_open = start + open_marker.len();

		let Some(close_offset) = memstr(&bytes[after_open..], close_marker) else {
			diagnostics.push(ParseDiagnostic {
				kind: MalformedKind::Unterminated,
				point: point_at(start),
			});
			break;
		};
		let closing_start = after_open + close_offset;

		if let Some(nested_offset) = memstr(&bytes[after_open..closing_start], open_marker) {
			diagnostics.push(ParseDiagnostic {
				kind: MalformedKind::Nested,
				point: point_at(after_open + nested_offset),
			});
		}

		let end = closing_marker_end(bytes, closing_start + close_marker.len());

		// The declaration ends at the first `>` inside the block. Without one
		// before the closing marker the whole inner text is declaration and
		// the body is empty.
		let (declaration_end, body_start) = bytes[after_open..closing_start]
			.iter()
			.position(|byte| *byte == DECLARATION_TERMINATOR)
			.map_or((closing_start, closing_start), |terminator| {
				(after_open + terminator, after_open + terminator + 1)
			});

		blocks.push(DirectiveBlock {
			start,
			end,
			body_start,
			body_end: closing_start,
			declaration: content[after_open..declaration_end].to_string(),
			opening: point_at(start),
		});

		search_from = end;
	}

	(blocks, diagnostics)
}

/// Extend a closing marker over optional whitespace and its `>`. A bare
/// `</EXCLUSIVE` without `>` ends right after the marker text.
fn closing_marker_end(bytes: &[u8], after_marker: usize) -> usize {
	let mut cursor = after_marker;
	while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
		cursor += 1;
	}

	if cursor < bytes.len() && bytes[cursor] == DECLARATION_TERMINATOR {
		cursor + 1
	} else {
		after_marker
	}
}
