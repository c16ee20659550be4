//! Extra bindings visible to an expression.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

/// Named values layered over the component's properties while evaluating.
///
/// Structural directives derive a new context for the subtree they render
/// (loop variables, `$node`); a context is never mutated once shared.
///
/// # Example
///
/// ```ignore
/// let row = context.with("index", Value::from(0)).with("item", Value::from("a"));
/// assert_eq!(row.get("item"), Some(&Value::from("a")));
/// assert_eq!(context.get("item"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
	bindings: Rc<BTreeMap<String, Value>>,
}

impl Context {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of this context with `name` bound to `value`.
	pub fn with(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		let mut bindings = (*self.bindings).clone();
		bindings.insert(name.into(), value.into());
		Self {
			bindings: Rc::new(bindings),
		}
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.bindings.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.bindings.contains_key(name)
	}

	/// Bound names in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.bindings.keys().map(String::as_str)
	}
}

impl<K, V> FromIterator<(K, V)> for Context
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			bindings: Rc::new(
				iter.into_iter()
					.map(|(name, value)| (name.into(), value.into()))
					.collect(),
			),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_with_leaves_original_untouched() {
		let base: Context = [("a", 1)].into_iter().collect();

		let derived = base.with("b", 2).with("a", 3);

		assert_eq!(base.get("a"), Some(&Value::from(1)));
		assert!(!base.contains("b"));
		assert_eq!(derived.get("a"), Some(&Value::from(3)));
		assert_eq!(derived.names().collect::<Vec<_>>(), vec!["a", "b"]);
	}
}
