//! Binding expressions.
//!
//! Directive attribute values are small expressions evaluated against a
//! component. The [`Evaluator`] trait is the seam between the binding engine
//! and the language; [`ExpressionEvaluator`] is the built-in implementation:
//!
//! - literals, identifiers (`$`-prefixed too), `this`, member and index access
//! - calls to component methods and a few built-in list and string methods
//! - array and object literals
//! - unary `! - +`, arithmetic, comparison, `==`/`===` equality
//! - `&&`, `||`, `??`, the conditional operator, `=`, `+=`, `-=` and `;` sequences
//!
//! Identifiers resolve against the [`Context`] first and the component's
//! properties second.

mod context;
mod interpreter;
mod lexer;
mod parser;

use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub use context::Context;

use self::interpreter::Interpreter;
use self::parser::Expr;
use crate::error::BindError;
use crate::value::Value;

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
	/// The source text is not a valid expression
	#[error("Syntax error in `{expression}`: {message}")]
	Syntax { expression: String, message: String },

	/// An identifier names neither a binding nor a property
	#[error("{0} is not defined")]
	Reference(String),

	/// An operation was applied to a value of the wrong kind
	#[error("Type error: {0}")]
	Type(String),

	/// A call names no component method or built-in method
	#[error("Unknown method: {0}")]
	UnknownMethod(String),

	/// Writing through a node or component failed
	#[error(transparent)]
	Bind(#[from] BindError),
}

/// What an expression can see beyond its context bindings.
pub trait Scope {
	/// Value of `this`.
	fn this(&self) -> Value;

	/// Reads a named property, or `None` when no such property exists.
	fn lookup(&self, name: &str) -> Option<Value>;

	/// Writes a named property, or returns `None` when no such property exists.
	fn assign(&self, name: &str, value: Value) -> Option<EvalResult<()>>;

	/// Calls a named method, or returns `None` when no such method exists.
	fn call(&self, name: &str, arguments: &[Value]) -> Option<EvalResult<Value>>;
}

/// Evaluates binding expressions.
pub trait Evaluator {
	/// Evaluates `source` and returns its value.
	fn evaluate(&self, scope: &dyn Scope, source: &str, context: &Context) -> EvalResult<Value>;

	/// Assigns `value` to the place `target` denotes (`name`, `form.field`, `list[0]`).
	fn assign(&self, scope: &dyn Scope, target: &str, value: Value, context: &Context) -> EvalResult<()>;

	/// Renders template text, replacing each `${ expression }` with the
	/// expression's display string.
	///
	/// `null` and `undefined` render as nothing, unlike a scripting-language
	/// template literal, which prints the words `null` and `undefined`.
	fn interpolate(&self, scope: &dyn Scope, template: &str, context: &Context) -> EvalResult<String> {
		let mut output = String::with_capacity(template.len());
		for segment in split_template(template)? {
			match segment {
				Segment::Text(text) => output.push_str(&text),
				Segment::Expression(source) => {
					let value = self.evaluate(scope, &source, context)?;
					if !value.is_nullish() {
						output.push_str(&value.to_display_string());
					}
				}
			}
		}
		Ok(output)
	}
}

/// A piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Literal text
	Text(String),
	/// Source of a `${ ... }` expression, without the delimiters
	Expression(String),
}

/// Splits template text into literal text and `${ ... }` expressions.
///
/// Braces and quotes inside an expression are balanced, so
/// `${ {a: 1}.a }` and `${ '}' }` are single expressions.
///
/// # Errors
///
/// Returns [`EvalError::Syntax`] for an unterminated `${`.
pub fn split_template(template: &str) -> EvalResult<Vec<Segment>> {
	let mut segments = Vec::new();
	let mut rest = template;
	while let Some(start) = rest.find("${") {
		if start > 0 {
			segments.push(Segment::Text(rest[..start].to_string()));
		}
		let body = &rest[start + 2..];
		let end = expression_end(body).ok_or_else(|| EvalError::Syntax {
			expression: template.to_string(),
			message: "unterminated `${`".to_string(),
		})?;
		segments.push(Segment::Expression(body[..end].to_string()));
		rest = &body[end + 1..];
	}
	if !rest.is_empty() {
		segments.push(Segment::Text(rest.to_string()));
	}
	Ok(segments)
}

/// Byte offset of the `}` closing an expression body.
fn expression_end(body: &str) -> Option<usize> {
	let mut depth = 0usize;
	let mut quote = None;
	let mut escaped = false;
	for (offset, c) in body.char_indices() {
		if let Some(open) = quote {
			match c {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				_ if c == open => quote = None,
				_ => {}
			}
			continue;
		}
		match c {
			'\'' | '"' | '`' => quote = Some(c),
			'{' => depth += 1,
			'}' if depth == 0 => return Some(offset),
			'}' => depth -= 1,
			_ => {}
		}
	}
	None
}

/// The built-in evaluator. Parsed expressions are cached by source text.
#[derive(Default)]
pub struct ExpressionEvaluator {
	cache: RefCell<HashMap<String, Rc<Expr>>>,
}

impl ExpressionEvaluator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of cached parsed expressions.
	pub fn cached(&self) -> usize {
		self.cache.borrow().len()
	}

	fn parse(&self, source: &str) -> EvalResult<Rc<Expr>> {
		if let Some(expression) = self.cache.borrow().get(source) {
			return Ok(Rc::clone(expression));
		}
		let expression = Rc::new(parser::parse(source)?);
		self.cache
			.borrow_mut()
			.insert(source.to_string(), Rc::clone(&expression));
		Ok(expression)
	}
}

impl Evaluator for ExpressionEvaluator {
	fn evaluate(&self, scope: &dyn Scope, source: &str, context: &Context) -> EvalResult<Value> {
		let expression = self.parse(source)?;
		Interpreter::new(scope, context).eval(&expression)
	}

	fn assign(&self, scope: &dyn Scope, target: &str, value: Value, context: &Context) -> EvalResult<()> {
		let expression = self.parse(target)?;
		if !expression.is_assignable() {
			return Err(EvalError::Syntax {
				expression: target.to_string(),
				message: "not an assignable expression".to_string(),
			});
		}
		Interpreter::new(scope, context).assign(&expression, value)
	}
}

impl core::fmt::Debug for ExpressionEvaluator {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("ExpressionEvaluator")
			.field("cached", &self.cached())
			.finish()
	}
}
