//! Expression syntax tree and Pratt parser.

use super::EvalError;
use super::lexer::{Lexer, Token, TokenKind};

/// Literal constants.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
	/// `!`
	Not,
	/// `-`
	Negate,
	/// `+`
	Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
	Add,
	Subtract,
	Multiply,
	Divide,
	Remainder,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
	/// `==`
	LooseEqual,
	/// `!=`
	LooseNotEqual,
	/// `===`
	StrictEqual,
	/// `!==`
	StrictNotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
	And,
	Or,
	/// `??`
	Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
	Assign,
	AddAssign,
	SubtractAssign,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
	Literal(Literal),
	Identifier(String),
	This,
	Array(Vec<Expr>),
	Object(Vec<(String, Expr)>),
	Member {
		object: Box<Expr>,
		property: String,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
	},
	Call {
		callee: Box<Expr>,
		arguments: Vec<Expr>,
	},
	Unary {
		operator: UnaryOp,
		operand: Box<Expr>,
	},
	Binary {
		operator: BinaryOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Logical {
		operator: LogicalOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Conditional {
		test: Box<Expr>,
		consequent: Box<Expr>,
		alternate: Box<Expr>,
	},
	Assign {
		operator: AssignOp,
		target: Box<Expr>,
		value: Box<Expr>,
	},
	/// `a; b; c` evaluates to `c`
	Sequence(Vec<Expr>),
}

impl Expr {
	/// Returns `true` for expressions that can appear left of `=`.
	pub(crate) fn is_assignable(&self) -> bool {
		matches!(self, Expr::Identifier(_) | Expr::Member { .. } | Expr::Index { .. })
	}
}

// Binding powers, loosest first
const ASSIGNMENT: u8 = 2;
const CONDITIONAL: u8 = 4;
const PREFIX: u8 = 22;
const POSTFIX: u8 = 24;

/// Left and right binding power of an infix operator.
fn infix_power(punct: &str) -> Option<(u8, u8)> {
	let power = match punct {
		"=" | "+=" | "-=" => (ASSIGNMENT + 1, ASSIGNMENT),
		"?" => (CONDITIONAL + 1, CONDITIONAL),
		"??" => (6, 7),
		"||" => (8, 9),
		"&&" => (10, 11),
		"==" | "!=" | "===" | "!==" => (12, 13),
		"<" | "<=" | ">" | ">=" => (14, 15),
		"+" | "-" => (16, 17),
		"*" | "/" | "%" => (18, 19),
		_ => return None,
	};
	Some(power)
}

fn binary_operator(punct: &str) -> Option<BinaryOp> {
	let operator = match punct {
		"+" => BinaryOp::Add,
		"-" => BinaryOp::Subtract,
		"*" => BinaryOp::Multiply,
		"/" => BinaryOp::Divide,
		"%" => BinaryOp::Remainder,
		"<" => BinaryOp::Less,
		"<=" => BinaryOp::LessEqual,
		">" => BinaryOp::Greater,
		">=" => BinaryOp::GreaterEqual,
		"==" => BinaryOp::LooseEqual,
		"!=" => BinaryOp::LooseNotEqual,
		"===" => BinaryOp::StrictEqual,
		"!==" => BinaryOp::StrictNotEqual,
		_ => return None,
	};
	Some(operator)
}

/// Parses a complete expression, including `;`-separated sequences.
///
/// An empty source parses to `undefined`.
pub(crate) fn parse(source: &str) -> Result<Expr, EvalError> {
	let tokens = Lexer::new(source).tokenize()?;
	let mut parser = Parser {
		source,
		tokens,
		position: 0,
	};
	let expression = parser.parse_sequence()?;
	match parser.peek() {
		TokenKind::Eof => Ok(expression),
		other => {
			let found = describe(other);
			Err(parser.error(format!("unexpected {found}")))
		}
	}
}

struct Parser<'a> {
	source: &'a str,
	tokens: Vec<Token>,
	position: usize,
}

impl Parser<'_> {
	fn peek(&self) -> &TokenKind {
		self.tokens
			.get(self.position)
			.map_or(&TokenKind::Eof, |token| &token.kind)
	}

	fn advance(&mut self) -> TokenKind {
		let kind = self.peek().clone();
		if self.position < self.tokens.len() {
			self.position += 1;
		}
		kind
	}

	fn at(&self, punct: &str) -> bool {
		matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
	}

	fn eat(&mut self, punct: &str) -> bool {
		let found = self.at(punct);
		if found {
			self.position += 1;
		}
		found
	}

	fn expect(&mut self, punct: &str) -> Result<(), EvalError> {
		if self.eat(punct) {
			Ok(())
		} else {
			let found = describe(self.peek());
			Err(self.error(format!("expected `{punct}`, found {found}")))
		}
	}

	fn parse_sequence(&mut self) -> Result<Expr, EvalError> {
		let mut expressions = Vec::new();
		loop {
			while self.eat(";") {}
			if matches!(self.peek(), TokenKind::Eof) {
				break;
			}
			expressions.push(self.parse_expression(0)?);
			if !self.at(";") {
				break;
			}
		}
		Ok(match expressions.len() {
			0 => Expr::Literal(Literal::Undefined),
			1 => expressions.remove(0),
			_ => Expr::Sequence(expressions),
		})
	}

	fn parse_expression(&mut self, min_power: u8) -> Result<Expr, EvalError> {
		let mut left = self.parse_prefix()?;
		loop {
			let punct = match self.peek() {
				TokenKind::Punct(punct) => *punct,
				_ => break,
			};
			if matches!(punct, "." | "[" | "(") {
				if POSTFIX < min_power {
					break;
				}
				left = self.parse_postfix(left, punct)?;
				continue;
			}
			let Some((left_power, right_power)) = infix_power(punct) else {
				break;
			};
			if left_power < min_power {
				break;
			}
			self.position += 1;
			left = match punct {
				"?" => {
					let consequent = self.parse_expression(0)?;
					self.expect(":")?;
					let alternate = self.parse_expression(right_power)?;
					Expr::Conditional {
						test: Box::new(left),
						consequent: Box::new(consequent),
						alternate: Box::new(alternate),
					}
				}
				"=" | "+=" | "-=" => {
					if !left.is_assignable() {
						return Err(self.error("invalid assignment target"));
					}
					let operator = match punct {
						"+=" => AssignOp::AddAssign,
						"-=" => AssignOp::SubtractAssign,
						_ => AssignOp::Assign,
					};
					Expr::Assign {
						operator,
						target: Box::new(left),
						value: Box::new(self.parse_expression(right_power)?),
					}
				}
				"&&" | "||" | "??" => {
					let operator = match punct {
						"&&" => LogicalOp::And,
						"||" => LogicalOp::Or,
						_ => LogicalOp::Coalesce,
					};
					Expr::Logical {
						operator,
						left: Box::new(left),
						right: Box::new(self.parse_expression(right_power)?),
					}
				}
				_ => {
					let operator = binary_operator(punct)
						.ok_or_else(|| self.error(format!("unknown operator `{punct}`")))?;
					Expr::Binary {
						operator,
						left: Box::new(left),
						right: Box::new(self.parse_expression(right_power)?),
					}
				}
			};
		}
		Ok(left)
	}

	fn parse_prefix(&mut self) -> Result<Expr, EvalError> {
		match self.advance() {
			TokenKind::Number(number) => Ok(Expr::Literal(Literal::Number(number))),
			TokenKind::String(text) => Ok(Expr::Literal(Literal::String(text))),
			TokenKind::Identifier(name) => Ok(match name.as_str() {
				"true" => Expr::Literal(Literal::Bool(true)),
				"false" => Expr::Literal(Literal::Bool(false)),
				"null" => Expr::Literal(Literal::Null),
				"undefined" => Expr::Literal(Literal::Undefined),
				"this" => Expr::This,
				_ => Expr::Identifier(name),
			}),
			TokenKind::Punct("(") => {
				let inner = self.parse_expression(0)?;
				self.expect(")")?;
				Ok(inner)
			}
			TokenKind::Punct("[") => {
				let items = self.parse_list("]")?;
				Ok(Expr::Array(items))
			}
			TokenKind::Punct("{") => self.parse_object(),
			TokenKind::Punct(punct @ ("!" | "-" | "+")) => {
				let operator = match punct {
					"!" => UnaryOp::Not,
					"-" => UnaryOp::Negate,
					_ => UnaryOp::Plus,
				};
				Ok(Expr::Unary {
					operator,
					operand: Box::new(self.parse_expression(PREFIX)?),
				})
			}
			other => {
				self.position = self.position.saturating_sub(1);
				let found = describe(&other);
				Err(self.error(format!("unexpected {found}")))
			}
		}
	}

	fn parse_postfix(&mut self, object: Expr, punct: &str) -> Result<Expr, EvalError> {
		self.position += 1;
		match punct {
			"." => match self.advance() {
				TokenKind::Identifier(property) => Ok(Expr::Member {
					object: Box::new(object),
					property,
				}),
				other => {
					let found = describe(&other);
					Err(self.error(format!("expected property name, found {found}")))
				}
			},
			"[" => {
				let index = self.parse_expression(0)?;
				self.expect("]")?;
				Ok(Expr::Index {
					object: Box::new(object),
					index: Box::new(index),
				})
			}
			_ => Ok(Expr::Call {
				callee: Box::new(object),
				arguments: self.parse_list(")")?,
			}),
		}
	}

	/// Comma-separated expressions up to `close`; a trailing comma is allowed.
	fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
		let mut items = Vec::new();
		while !self.eat(close) {
			items.push(self.parse_expression(ASSIGNMENT)?);
			if !self.eat(",") {
				self.expect(close)?;
				break;
			}
		}
		Ok(items)
	}

	fn parse_object(&mut self) -> Result<Expr, EvalError> {
		let mut entries = Vec::new();
		while !self.eat("}") {
			let key = match self.advance() {
				TokenKind::Identifier(name) | TokenKind::String(name) => name,
				TokenKind::Number(number) => crate::value::format_number(number),
				other => {
					let found = describe(&other);
					return Err(self.error(format!("expected object key, found {found}")));
				}
			};
			let value = if self.eat(":") {
				self.parse_expression(ASSIGNMENT)?
			} else {
				// Shorthand `{ name }`
				Expr::Identifier(key.clone())
			};
			entries.push((key, value));
			if !self.eat(",") {
				self.expect("}")?;
				break;
			}
		}
		Ok(Expr::Object(entries))
	}

	fn error(&self, message: impl Into<String>) -> EvalError {
		let offset = self
			.tokens
			.get(self.position)
			.map_or(self.source.len(), |token| token.offset);
		EvalError::Syntax {
			expression: self.source.to_string(),
			message: format!("{} at offset {offset}", message.into()),
		}
	}
}

fn describe(kind: &TokenKind) -> String {
	match kind {
		TokenKind::Number(number) => format!("number `{number}`"),
		TokenKind::String(text) => format!("string {text:?}"),
		TokenKind::Identifier(name) => format!("`{name}`"),
		TokenKind::Punct(punct) => format!("`{punct}`"),
		TokenKind::Eof => "end of expression".to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn identifier(name: &str) -> Box<Expr> {
		Box::new(Expr::Identifier(name.to_string()))
	}

	fn number(value: f64) -> Box<Expr> {
		Box::new(Expr::Literal(Literal::Number(value)))
	}

	#[test]
	fn test_multiplication_binds_tighter_than_addition() {
		assert_eq!(
			parse("a + b * 2").unwrap(),
			Expr::Binary {
				operator: BinaryOp::Add,
				left: identifier("a"),
				right: Box::new(Expr::Binary {
					operator: BinaryOp::Multiply,
					left: identifier("b"),
					right: number(2.0),
				}),
			}
		);
	}

	#[test]
	fn test_assignment_is_right_associative() {
		assert_eq!(
			parse("a = b = 1").unwrap(),
			Expr::Assign {
				operator: AssignOp::Assign,
				target: identifier("a"),
				value: Box::new(Expr::Assign {
					operator: AssignOp::Assign,
					target: identifier("b"),
					value: number(1.0),
				}),
			}
		);
	}

	#[test]
	fn test_nested_conditional() {
		let parsed = parse("a ? b : c ? d : e").unwrap();
		let Expr::Conditional { alternate, .. } = parsed else {
			panic!("expected conditional, got {parsed:?}");
		};
		assert!(matches!(*alternate, Expr::Conditional { .. }));
	}

	#[test]
	fn test_member_call_chain() {
		assert_eq!(
			parse("this.items.indexOf(item)").unwrap(),
			Expr::Call {
				callee: Box::new(Expr::Member {
					object: Box::new(Expr::Member {
						object: Box::new(Expr::This),
						property: "items".into(),
					}),
					property: "indexOf".into(),
				}),
				arguments: vec![Expr::Identifier("item".into())],
			}
		);
	}

	#[test]
	fn test_object_literal_with_shorthand_and_quoted_keys() {
		assert_eq!(
			parse("{ active, 'is-big': size > 3, }").unwrap(),
			Expr::Object(vec![
				("active".into(), Expr::Identifier("active".into())),
				(
					"is-big".into(),
					Expr::Binary {
						operator: BinaryOp::Greater,
						left: identifier("size"),
						right: number(3.0),
					}
				),
			])
		);
	}

	#[rstest]
	#[case("", Expr::Literal(Literal::Undefined))]
	#[case(";;", Expr::Literal(Literal::Undefined))]
	#[case("a;", Expr::Identifier("a".into()))]
	fn test_degenerate_sequences(#[case] source: &str, #[case] expected: Expr) {
		assert_eq!(parse(source).unwrap(), expected);
	}

	#[test]
	fn test_sequence_keeps_every_statement() {
		let Expr::Sequence(items) = parse("a = 1; b = 2; a + b").unwrap() else {
			panic!("expected a sequence");
		};
		assert_eq!(items.len(), 3);
	}

	#[rstest]
	#[case("1 = 2")]
	#[case("a +")]
	#[case("(a")]
	#[case("[1, 2")]
	#[case("a b")]
	#[case("{ 1 + 2 }")]
	#[case("a ? b")]
	fn test_syntax_errors(#[case] input: &str) {
		let error = parse(input).unwrap_err();
		assert!(matches!(error, EvalError::Syntax { ref expression, .. } if expression == input));
	}
}
