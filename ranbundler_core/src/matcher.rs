use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;

use crate::lexer::TARGET_KEYWORD;
use crate::lexer::Token;
use crate::lexer::WILDCARD;
use crate::lexer::tokenize_declaration;

/// Decide whether a block with the given raw declaration is kept when
/// building for `platform`.
///
/// A declaration without the `OF` qualifier is unconditional. Otherwise the
/// block is kept when the declaration contains `platform` or the `*` wildcard
/// anywhere. This is plain substring containment: `OF="mobile-ios"` is kept
/// for `mobile`, and no case or whitespace normalization takes place.
pub fn matches(declaration: &str, platform: &str) -> bool {
	if !declaration.contains(TARGET_KEYWORD) {
		return true;
	}

	declaration.contains(platform) || declaration.contains(WILDCARD)
}

/// The platforms a declaration names, as written by the author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
pub struct TargetList {
	#[deref]
	targets: Vec<String>,
	qualified: bool,
}

impl TargetList {
	/// `true` when the declaration has no `OF` qualifier at all.
	pub fn is_unconditional(&self) -> bool {
		!self.qualified
	}

	pub fn is_wildcard(&self) -> bool {
		self.targets.iter().any(|target| target == WILDCARD)
	}
}

impl std::fmt::Display for TargetList {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_unconditional() {
			return f.write_str("(all)");
		}

		f.write_str(&self.targets.join(", "))
	}
}

/// Extract the target list of a declaration such as ` OF="mobile, web"`,
/// ` OF={'web'}` or ` OF=native`. Values are split on commas, pipes and
/// whitespace.
///
/// Only used for reporting; [`matches`] never consults the parsed list.
pub fn target_list(declaration: &str) -> TargetList {
	let tokens = tokenize_declaration(declaration);
	let mut iter = tokens.iter().peekable();
	let mut targets = Vec::new();

	while let Some(token) = iter.next() {
		if !matches!(token, Token::Ident(name) if name == TARGET_KEYWORD) {
			continue;
		}

		if iter.next_if_eq(&&Token::Equals).is_none() {
			continue;
		}

		let braced = iter.next_if_eq(&&Token::BraceOpen).is_some();
		match iter.next() {
			Some(Token::String(value) | Token::Ident(value)) => {
				targets.extend(split_targets(value));
			}
			_ => continue,
		}

		if braced {
			let _ = iter.next_if_eq(&&Token::BraceClose);
		}
	}

	TargetList {
		targets,
		qualified: declaration.contains(TARGET_KEYWORD),
	}
}

fn split_targets(value: &str) -> impl Iterator<Item = String> + '_ {
	value
		.split(|c: char| c == ',' || c == '|' || c.is_whitespace())
		.filter(|part| !part.is_empty())
		.map(str::to_string)
}
