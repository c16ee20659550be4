//! Tree-walking interpreter for parsed expressions.

use super::parser::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
use super::{Context, EvalError, EvalResult, Scope};
use crate::value::{List, Value};

pub(crate) struct Interpreter<'a> {
	scope: &'a dyn Scope,
	context: &'a Context,
}

impl<'a> Interpreter<'a> {
	pub(crate) fn new(scope: &'a dyn Scope, context: &'a Context) -> Self {
		Self { scope, context }
	}

	pub(crate) fn eval(&self, expr: &Expr) -> EvalResult<Value> {
		match expr {
			Expr::Literal(literal) => Ok(match literal {
				Literal::Undefined => Value::Undefined,
				Literal::Null => Value::Null,
				Literal::Bool(flag) => Value::Bool(*flag),
				Literal::Number(number) => Value::Number(*number),
				Literal::String(text) => Value::String(text.clone()),
			}),
			Expr::Identifier(name) => self.resolve(name),
			Expr::This => Ok(self.scope.this()),
			Expr::Array(items) => Ok(Value::list(
				items
					.iter()
					.map(|item| self.eval(item))
					.collect::<EvalResult<Vec<_>>>()?,
			)),
			Expr::Object(entries) => Ok(Value::map(
				entries
					.iter()
					.map(|(key, value)| Ok((key.clone(), self.eval(value)?)))
					.collect::<EvalResult<Vec<_>>>()?,
			)),
			Expr::Member { object, property } => {
				let object = self.eval(object)?;
				member(&object, property)
			}
			Expr::Index { object, index } => {
				let object = self.eval(object)?;
				let index = self.eval(index)?;
				element(&object, &index)
			}
			Expr::Call { callee, arguments } => {
				let arguments = arguments
					.iter()
					.map(|argument| self.eval(argument))
					.collect::<EvalResult<Vec<_>>>()?;
				self.call(callee, &arguments)
			}
			Expr::Unary { operator, operand } => {
				let operand = self.eval(operand)?;
				Ok(match operator {
					UnaryOp::Not => Value::Bool(!operand.is_truthy()),
					UnaryOp::Negate => Value::Number(-operand.to_number()),
					UnaryOp::Plus => Value::Number(operand.to_number()),
				})
			}
			Expr::Binary {
				operator,
				left,
				right,
			} => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				Ok(binary(*operator, &left, &right))
			}
			Expr::Logical {
				operator,
				left,
				right,
			} => {
				let left = self.eval(left)?;
				let short_circuit = match operator {
					LogicalOp::And => !left.is_truthy(),
					LogicalOp::Or => left.is_truthy(),
					LogicalOp::Coalesce => !left.is_nullish(),
				};
				if short_circuit {
					Ok(left)
				} else {
					self.eval(right)
				}
			}
			Expr::Conditional {
				test,
				consequent,
				alternate,
			} => {
				if self.eval(test)?.is_truthy() {
					self.eval(consequent)
				} else {
					self.eval(alternate)
				}
			}
			Expr::Assign {
				operator,
				target,
				value,
			} => {
				let value = self.eval(value)?;
				let value = match operator {
					AssignOp::Assign => value,
					AssignOp::AddAssign => binary(BinaryOp::Add, &self.eval(target)?, &value),
					AssignOp::SubtractAssign => {
						binary(BinaryOp::Subtract, &self.eval(target)?, &value)
					}
				};
				self.assign(target, value.clone())?;
				Ok(value)
			}
			Expr::Sequence(expressions) => {
				let mut last = Value::Undefined;
				for expression in expressions {
					last = self.eval(expression)?;
				}
				Ok(last)
			}
		}
	}

	/// Stores `value` into an assignable expression.
	pub(crate) fn assign(&self, target: &Expr, value: Value) -> EvalResult<()> {
		match target {
			Expr::Identifier(name) => {
				if self.context.contains(name) {
					return Err(EvalError::Type(format!("cannot assign to binding `{name}`")));
				}
				self.scope
					.assign(name, value)
					.unwrap_or_else(|| Err(EvalError::Reference(name.clone())))
			}
			Expr::Member { object, property } => {
				if matches!(**object, Expr::This) {
					if let Some(result) = self.scope.assign(property, value.clone()) {
						return result;
					}
				}
				let object = self.eval(object)?;
				set_member(&object, property, value)
			}
			Expr::Index { object, index } => {
				let object = self.eval(object)?;
				match (&object, self.eval(index)?) {
					(Value::List(list), Value::Number(index)) if index >= 0.0 && index.fract() == 0.0 => {
						if index > (list.len() + List::MAX_GAP) as f64 || !list.set(index as usize, value) {
							return Err(EvalError::Type("list index out of range".to_string()));
						}
						Ok(())
					}
					(_, key) => set_member(&object, &key.to_display_string(), value),
				}
			}
			_ => Err(EvalError::Type("invalid assignment target".to_string())),
		}
	}

	fn resolve(&self, name: &str) -> EvalResult<Value> {
		if let Some(value) = self.context.get(name) {
			return Ok(value.clone());
		}
		self.scope
			.lookup(name)
			.ok_or_else(|| EvalError::Reference(name.to_string()))
	}

	fn call(&self, callee: &Expr, arguments: &[Value]) -> EvalResult<Value> {
		match callee {
			Expr::Identifier(name) => {
				if self.context.contains(name) {
					return Err(EvalError::Type(format!("`{name}` is not a function")));
				}
				self.scope
					.call(name, arguments)
					.unwrap_or_else(|| Err(EvalError::UnknownMethod(name.clone())))
			}
			Expr::Member { object, property } if matches!(**object, Expr::This) => self
				.scope
				.call(property, arguments)
				.unwrap_or_else(|| Err(EvalError::UnknownMethod(property.clone()))),
			Expr::Member { object, property } => {
				let receiver = self.eval(object)?;
				builtin_method(&receiver, property, arguments)
			}
			_ => Err(EvalError::Type("expression is not callable".to_string())),
		}
	}
}

fn member(object: &Value, property: &str) -> EvalResult<Value> {
	if object.is_nullish() {
		return Err(EvalError::Type(format!(
			"cannot read `{property}` of {}",
			object.to_display_string()
		)));
	}
	Ok(match (object, property) {
		(Value::String(text), "length") => Value::from(text.chars().count()),
		(Value::List(list), "length") => Value::from(list.len()),
		(Value::Map(map), "length") if !map.contains_key("length") => Value::from(map.len()),
		(Value::Map(map), _) => map.get(property).unwrap_or_default(),
		(Value::Node(node), _) => node.property(property),
		_ => Value::Undefined,
	})
}

fn element(object: &Value, index: &Value) -> EvalResult<Value> {
	match (object, index) {
		(Value::List(list), Value::Number(index)) => Ok(if *index >= 0.0 && index.fract() == 0.0 {
			list.get(*index as usize).unwrap_or_default()
		} else {
			Value::Undefined
		}),
		(Value::String(text), Value::Number(index)) => Ok(if *index >= 0.0 && index.fract() == 0.0 {
			text.chars()
				.nth(*index as usize)
				.map_or(Value::Undefined, |c| Value::String(c.to_string()))
		} else {
			Value::Undefined
		}),
		_ => member(object, &index.to_display_string()),
	}
}

fn set_member(object: &Value, property: &str, value: Value) -> EvalResult<()> {
	match object {
		Value::Map(map) => {
			map.insert(property, value);
			Ok(())
		}
		Value::Node(node) => Ok(node.set_property(property, value)?),
		other => Err(EvalError::Type(format!(
			"cannot set `{property}` on {}",
			other.type_name()
		))),
	}
}

fn builtin_method(receiver: &Value, name: &str, arguments: &[Value]) -> EvalResult<Value> {
	let argument = |index: usize| arguments.get(index).cloned().unwrap_or_default();
	match (receiver, name) {
		(Value::List(list), "push") => {
			for argument in arguments {
				list.push(argument.clone());
			}
			Ok(Value::from(list.len()))
		}
		(Value::List(list), "pop") => Ok(list.pop().unwrap_or_default()),
		(Value::List(list), "includes") => Ok(Value::Bool(index_of(list.to_vec(), &argument(0)).is_some())),
		(Value::List(list), "indexOf") => Ok(Value::Number(
			index_of(list.to_vec(), &argument(0)).map_or(-1.0, |index| index as f64),
		)),
		(Value::List(list), "join") => {
			let separator = match argument(0) {
				Value::Undefined => ",".to_string(),
				other => other.to_display_string(),
			};
			Ok(Value::String(
				list.to_vec()
					.iter()
					.map(|item| {
						if item.is_nullish() {
							String::new()
						} else {
							item.to_display_string()
						}
					})
					.collect::<Vec<_>>()
					.join(&separator),
			))
		}
		(Value::String(text), "includes") => {
			Ok(Value::Bool(text.contains(argument(0).to_display_string().as_str())))
		}
		(Value::String(text), "toUpperCase") => Ok(Value::String(text.to_uppercase())),
		(Value::String(text), "toLowerCase") => Ok(Value::String(text.to_lowercase())),
		(Value::String(text), "trim") => Ok(Value::String(text.trim().to_string())),
		(Value::Date(date), "getTime") => Ok(Value::Number(date.timestamp_millis() as f64)),
		(receiver, _) if receiver.is_nullish() => Err(EvalError::Type(format!(
			"cannot call `{name}` on {}",
			receiver.to_display_string()
		))),
		_ => Err(EvalError::UnknownMethod(format!(
			"{}.{name}",
			receiver.type_name()
		))),
	}
}

/// Position of `needle` under strict equality, treating `NaN` as equal to itself.
fn index_of(items: Vec<Value>, needle: &Value) -> Option<usize> {
	items.iter().position(|item| {
		item.strict_equals(needle)
			|| matches!((item, needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
	})
}

fn binary(operator: BinaryOp, left: &Value, right: &Value) -> Value {
	let numeric = |value: &Value| {
		matches!(
			value,
			Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
		)
	};
	match operator {
		BinaryOp::Add if numeric(left) && numeric(right) => {
			Value::Number(left.to_number() + right.to_number())
		}
		BinaryOp::Add => {
			Value::String(format!("{}{}", left.to_display_string(), right.to_display_string()))
		}
		BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
		BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
		BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
		BinaryOp::Remainder => Value::Number(left.to_number() % right.to_number()),
		BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
			let ordering = match (left, right) {
				(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
				_ => left.to_number().partial_cmp(&right.to_number()),
			};
			Value::Bool(ordering.is_some_and(|ordering| match operator {
				BinaryOp::Less => ordering.is_lt(),
				BinaryOp::LessEqual => ordering.is_le(),
				BinaryOp::Greater => ordering.is_gt(),
				_ => ordering.is_ge(),
			}))
		}
		BinaryOp::LooseEqual => Value::Bool(left.loosely_equals(right)),
		BinaryOp::LooseNotEqual => Value::Bool(!left.loosely_equals(right)),
		BinaryOp::StrictEqual => Value::Bool(left.strict_equals(right)),
		BinaryOp::StrictNotEqual => Value::Bool(!left.strict_equals(right)),
	}
}
