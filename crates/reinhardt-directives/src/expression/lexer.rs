//! Tokenizer for binding expressions.

use super::EvalError;

/// Operators and punctuation, longest first so `===` wins over `==`.
const PUNCTUATORS: &[&str] = &[
	"===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "+=", "-=", "=", "<", ">", "+", "-", "*",
	"/", "%", "!", "?", ":", ".", ",", "(", ")", "[", "]", "{", "}", ";",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
	Number(f64),
	String(String),
	Identifier(String),
	Punct(&'static str),
	Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
	pub(crate) kind: TokenKind,
	/// Byte offset of the first character
	pub(crate) offset: usize,
}

pub(crate) struct Lexer<'a> {
	source: &'a str,
	bytes: &'a [u8],
	idx: usize,
}

impl<'a> Lexer<'a> {
	pub(crate) fn new(source: &'a str) -> Self {
		Self {
			source,
			bytes: source.as_bytes(),
			idx: 0,
		}
	}

	/// Splits the whole source into tokens, ending with [`TokenKind::Eof`].
	pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
		let mut tokens = Vec::new();
		loop {
			let token = self.next_token()?;
			let is_eof = token.kind == TokenKind::Eof;
			tokens.push(token);
			if is_eof {
				return Ok(tokens);
			}
		}
	}

	fn next_token(&mut self) -> Result<Token, EvalError> {
		self.skip_whitespace();
		let offset = self.idx;
		let Some(&b) = self.bytes.get(self.idx) else {
			return Ok(Token {
				kind: TokenKind::Eof,
				offset,
			});
		};
		let kind = if b == b'"' || b == b'\'' {
			self.lex_string(b)?
		} else if b.is_ascii_digit()
			|| (b == b'.' && self.peek(1).is_some_and(|next| next.is_ascii_digit()))
		{
			self.lex_number()?
		} else if is_identifier_start(b) {
			self.lex_identifier()
		} else {
			self.lex_punctuator()?
		};
		Ok(Token { kind, offset })
	}

	fn skip_whitespace(&mut self) {
		while self.bytes.get(self.idx).is_some_and(u8::is_ascii_whitespace) {
			self.idx += 1;
		}
	}

	fn peek(&self, ahead: usize) -> Option<u8> {
		self.bytes.get(self.idx + ahead).copied()
	}

	fn lex_number(&mut self) -> Result<TokenKind, EvalError> {
		let start = self.idx;
		while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
			self.idx += 1;
		}
		if self.peek(0) == Some(b'.') {
			self.idx += 1;
			while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
				self.idx += 1;
			}
		}
		if matches!(self.peek(0), Some(b'e' | b'E')) {
			let sign = usize::from(matches!(self.peek(1), Some(b'+' | b'-')));
			if self.peek(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
				self.idx += 1 + sign;
				while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
					self.idx += 1;
				}
			}
		}
		let text = &self.source[start..self.idx];
		text.parse::<f64>()
			.map(TokenKind::Number)
			.map_err(|_| self.error(start, format!("invalid number `{text}`")))
	}

	fn lex_string(&mut self, quote: u8) -> Result<TokenKind, EvalError> {
		let start = self.idx;
		self.idx += 1;
		let mut text = String::new();
		loop {
			let Some(c) = self.source[self.idx..].chars().next() else {
				return Err(self.error(start, "unterminated string literal"));
			};
			self.idx += c.len_utf8();
			match c {
				_ if c as u32 == u32::from(quote) => return Ok(TokenKind::String(text)),
				'\\' => {
					let Some(escaped) = self.source[self.idx..].chars().next() else {
						return Err(self.error(start, "unterminated string literal"));
					};
					self.idx += escaped.len_utf8();
					match escaped {
						'n' => text.push('\n'),
						't' => text.push('\t'),
						'r' => text.push('\r'),
						'0' => text.push('\0'),
						'u' => text.push(self.lex_unicode_escape(start)?),
						other => text.push(other),
					}
				}
				other => text.push(other),
			}
		}
	}

	fn lex_unicode_escape(&mut self, start: usize) -> Result<char, EvalError> {
		let digits = self
			.source
			.get(self.idx..self.idx + 4)
			.ok_or_else(|| self.error(start, "truncated unicode escape"))?;
		let code = u32::from_str_radix(digits, 16)
			.ok()
			.and_then(char::from_u32)
			.ok_or_else(|| self.error(start, format!("invalid unicode escape `\\u{digits}`")))?;
		self.idx += 4;
		Ok(code)
	}

	fn lex_identifier(&mut self) -> TokenKind {
		let start = self.idx;
		while self.peek(0).is_some_and(is_identifier_part) {
			self.idx += 1;
		}
		TokenKind::Identifier(self.source[start..self.idx].to_string())
	}

	fn lex_punctuator(&mut self) -> Result<TokenKind, EvalError> {
		let rest = &self.source[self.idx..];
		let punct = PUNCTUATORS
			.iter()
			.find(|punct| rest.starts_with(**punct))
			.copied()
			.ok_or_else(|| {
				let c = rest.chars().next().unwrap_or_default();
				self.error(self.idx, format!("unexpected character `{c}`"))
			})?;
		self.idx += punct.len();
		Ok(TokenKind::Punct(punct))
	}

	fn error(&self, offset: usize, message: impl Into<String>) -> EvalError {
		EvalError::Syntax {
			expression: self.source.to_string(),
			message: format!("{} at offset {offset}", message.into()),
		}
	}
}

fn is_identifier_start(b: u8) -> bool {
	b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_identifier_part(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
