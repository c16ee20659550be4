//! Error types for property writes and directive binding.
//!
//! Structural and type errors propagate out of the directive that raised them.
//! Expression evaluation errors never reach this type: the component's
//! lenient evaluation wrappers log them and degrade to `undefined`.

/// Result alias used throughout the binding engine.
pub type BindResult<T> = Result<T, BindError>;

/// Error raised while binding directives or writing reactive properties.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
	/// The attribute names a directive that is not in the registry
	#[error("Invalid binder: {0}")]
	InvalidBinder(String),

	/// A list or map property received a value of the wrong shape
	#[error("Invalid value: {name} => {value}")]
	InvalidValue {
		/// Property name
		name: String,
		/// JSON rendering of the rejected value
		value: String,
	},

	/// The iteration source is neither a list nor a map
	#[error("Invalid iterator: {0}")]
	InvalidIterator(String),

	/// The style expression did not evaluate to a map
	#[error("Invalid style object: {0}")]
	InvalidStyle(String),

	/// Two-way binding was attached to something that is not a form control
	#[error("Unsupported node: <{0}>")]
	UnsupportedNode(String),

	/// The component declares no property with this name
	#[error("Unknown property: {0}")]
	UnknownProperty(String),

	/// The operation requires a mounted component
	#[error("Component is not mounted: <{0}>")]
	NotMounted(String),

	/// Configuration could not be parsed or is inconsistent
	#[error("Invalid configuration: {0}")]
	Config(String),
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(BindError::InvalidBinder("x-foo".into()), "Invalid binder: x-foo")]
	#[case(
		BindError::InvalidValue { name: "items".into(), value: "42".into() },
		"Invalid value: items => 42"
	)]
	#[case(BindError::InvalidIterator("count".into()), "Invalid iterator: count")]
	#[case(BindError::UnsupportedNode("div".into()), "Unsupported node: <div>")]
	fn test_error_messages(#[case] error: BindError, #[case] expected: &str) {
		assert_eq!(error.to_string(), expected);
	}
}
