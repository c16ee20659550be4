//! Binding engine configuration.
//!
//! Defaults match the conventional directive syntax (`x-if`, `x-for`, ...).
//! A component definition may carry its own configuration, loaded from TOML:
//!
//! ```toml
//! prefix = "rx-"
//! index_name = "i"
//! item_name = "row"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BindError, BindResult};

/// Configuration consulted while binding a component's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
	/// Prefix that marks directive attributes. Must end with `-`.
	pub prefix: String,
	/// Loop index variable when the iteration pattern names none
	pub index_name: String,
	/// Loop item variable when the iteration pattern names none
	pub item_name: String,
	/// Slot name used when a slot directive has no value
	pub default_slot: String,
	/// Upper bound on tasks run by a single flush
	pub max_flush_tasks: usize,
}

impl Default for DirectiveConfig {
	fn default() -> Self {
		Self {
			prefix: "x-".to_string(),
			index_name: "index".to_string(),
			item_name: "item".to_string(),
			default_slot: "default".to_string(),
			max_flush_tasks: 10_000,
		}
	}
}

impl DirectiveConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates a TOML document. Missing keys keep their defaults.
	///
	/// # Example
	///
	/// ```ignore
	/// let config = DirectiveConfig::from_toml_str("prefix = \"rx-\"")?;
	/// assert_eq!(config.prefix, "rx-");
	/// assert_eq!(config.item_name, "item");
	/// ```
	pub fn from_toml_str(source: &str) -> BindResult<Self> {
		let config: Self = toml::from_str(source).map_err(|e| BindError::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Sets the directive prefix.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Sets the default loop index and item names.
	pub fn with_loop_names(mut self, index: impl Into<String>, item: impl Into<String>) -> Self {
		self.index_name = index.into();
		self.item_name = item.into();
		self
	}

	/// Sets the default slot name.
	pub fn with_default_slot(mut self, slot: impl Into<String>) -> Self {
		self.default_slot = slot.into();
		self
	}

	/// Sets the per-flush task limit.
	pub fn with_max_flush_tasks(mut self, limit: usize) -> Self {
		self.max_flush_tasks = limit;
		self
	}

	/// Checks that the values can be used to bind a tree.
	pub fn validate(&self) -> BindResult<()> {
		if self.prefix.len() < 2 || !self.prefix.ends_with('-') {
			return Err(BindError::Config(format!(
				"prefix must be non-empty and end with '-': {:?}",
				self.prefix
			)));
		}
		if self.index_name.is_empty() || self.item_name.is_empty() {
			return Err(BindError::Config("loop variable names must not be empty".to_string()));
		}
		if self.max_flush_tasks == 0 {
			return Err(BindError::Config("max_flush_tasks must be positive".to_string()));
		}
		Ok(())
	}

	/// Name of the attribute that marks the alternative branch of a conditional.
	pub fn else_attribute(&self) -> String {
		format!("{}else", self.prefix)
	}
}
