use logos::Logos;
use snailquote::unescape;

/// Literal that opens a directive block.
pub const OPEN_MARKER: &str = "<EXCLUSIVE";
/// Prefix of the literal that closes a directive block. The full closing
/// marker is `</EXCLUSIVE>`, optionally with whitespace before the `>`.
pub const CLOSE_MARKER: &str = "</EXCLUSIVE";
/// Ends the declaration part of an opening marker.
pub const DECLARATION_TERMINATOR: u8 = b'>';
/// Keyword introducing a target list inside a declaration.
pub const TARGET_KEYWORD: &str = "OF";
/// Target meaning "every platform".
pub const WILDCARD: &str = "*";

/// Raw tokens produced by logos for the declaration text of an opening
/// marker, e.g. ` OF="mobile"` or ` OF={'web'}`.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
	#[token("=")]
	Equals,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("/")]
	Slash,
	#[regex(r"[a-zA-Z_*][a-zA-Z0-9_:*.-]*")]
	Ident,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r"`[^`]*`")]
	TemplateString,
}

/// A token of a directive declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	/// `=`
	Equals,
	/// `{`
	BraceOpen,
	/// `}`
	BraceClose,
	/// An attribute name or bare value, e.g. `OF` or `mobile`.
	Ident(String),
	/// A quoted value with its quotes removed and escapes resolved.
	String(String),
	/// Anything the declaration grammar does not know about.
	Unknown,
}

/// Tokenize the declaration text of an opening marker. Unrecognized input
/// becomes [`Token::Unknown`] rather than an error since declarations are
/// free-form text.
pub fn tokenize_declaration(declaration: &str) -> Vec<Token> {
	let mut lexer = RawToken::lexer(declaration);
	let mut tokens = Vec::new();

	while let Some(result) = lexer.next() {
		let slice = lexer.slice();
		let token = match result {
			Ok(RawToken::Equals) => Token::Equals,
			Ok(RawToken::BraceOpen) => Token::BraceOpen,
			Ok(RawToken::BraceClose) => Token::BraceClose,
			Ok(RawToken::Ident) => Token::Ident(slice.to_string()),
			Ok(RawToken::DoubleQuotedString | RawToken::SingleQuotedString) => {
				Token::String(process_quoted(slice))
			}
			Ok(RawToken::TemplateString) => Token::String(slice[1..slice.len() - 1].to_string()),
			Ok(RawToken::Slash) | Err(()) => Token::Unknown,
		};
		tokens.push(token);
	}

	tokens
}

/// Unquote a quoted string. The whole slice, quotes included, goes to the
/// unescaper so an escaped quote inside it does not open a new quoted
/// section. Strings that fail to unescape keep their raw inner text.
fn process_quoted(slice: &str) -> String {
	let inner = &slice[1..slice.len() - 1];
	if !inner.contains('\\') {
		return inner.to_string();
	}

	unescape(slice).unwrap_or_else(|_| inner.to_string())
}

/// Returns `true` when `content` contains at least one opening marker.
pub fn has_open_marker(content: &str) -> bool {
	memstr(content.as_bytes(), OPEN_MARKER.as_bytes()).is_some()
}

pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}
