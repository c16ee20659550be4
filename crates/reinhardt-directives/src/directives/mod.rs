//! Directive catalogue.
//!
//! A directive is selected by the name between the configured prefix and
//! the first `:` of a normalized attribute (`x-on:click` selects `on`). The
//! catalogue is a fixed table; an attribute naming anything else is an
//! [`InvalidBinder`](crate::error::BindError::InvalidBinder) error.
//!
//! | directive | attribute              | effect                                   |
//! |-----------|------------------------|------------------------------------------|
//! | `if`      | `x-if="expr"`          | attaches the node (or its `x-else` sibling) |
//! | `for`     | `x-for="list as i: v"` | clones the node per list item or map entry |
//! | `model`   | `x-model="expr"`       | two-way binding of a form control        |
//! | `slot`    | `x-slot="name"`        | renders a template supplied by the host  |
//! | `prop`    | `x-prop:name="expr"`   | sets a node property                     |
//! | `attr`    | `x-attr:name="text"`   | sets an attribute from interpolated text |
//! | `class`   | `x-class="expr"`       | adds classes                             |
//! | `style`   | `x-style="expr"`       | sets inline style properties             |
//! | `text`    | `x-text="expr"`        | sets the text content                    |
//! | `html`    | `x-html="expr"`        | sets the inner markup                    |
//! | `show`    | `x-show="expr"`        | toggles the `hidden` flag                |
//! | `on`      | `x-on:event="expr"`    | evaluates the expression on each event   |
//!
//! Text nodes containing `${...}` are bound by [`interpolation`].

mod assign;
mod conditional;
mod event;
pub(crate) mod interpolation;
mod iteration;
mod model;
mod slot;

use crate::component::Component;
use crate::dom::Node;
use crate::error::BindResult;
use crate::expression::Context;

/// Whether the tree walk continues into the node after a directive bound it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep processing the node's attributes and children
	Continue,
	/// The directive manages the node; skip the rest of it
	Stop,
}

/// A named attribute-driven binding behavior.
pub trait Directive {
	/// Name selecting the directive, without prefix or argument.
	fn name(&self) -> &'static str;

	/// Attaches the directive to `node`.
	///
	/// `attribute` is the normalized attribute name (`x-on:click`); its value
	/// is read from the node.
	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow>;
}

const CATALOGUE: &[&dyn Directive] = &[
	&conditional::Conditional,
	&iteration::Iteration,
	&model::Model,
	&slot::Slot,
	&assign::Prop,
	&assign::Attr,
	&assign::Class,
	&assign::Style,
	&assign::Text,
	&assign::Html,
	&assign::Show,
	&event::On,
];

/// Directive registered under `name`.
pub fn lookup(name: &str) -> Option<&'static dyn Directive> {
	CATALOGUE
		.iter()
		.copied()
		.find(|directive| directive.name() == name)
}

/// Names of every registered directive.
pub fn names() -> impl Iterator<Item = &'static str> {
	CATALOGUE.iter().map(|directive| directive.name())
}

/// Argument of a directive attribute (`click` in `x-on:click`), or `None`.
fn argument(attribute: &str) -> Option<&str> {
	crate::attribute::directive_argument(attribute)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("if")]
	#[case("for")]
	#[case("model")]
	#[case("slot")]
	#[case("prop")]
	#[case("attr")]
	#[case("class")]
	#[case("style")]
	#[case("text")]
	#[case("html")]
	#[case("show")]
	#[case("on")]
	fn test_lookup_finds_catalogue_entries(#[case] name: &str) {
		assert_eq!(lookup(name).map(|directive| directive.name()), Some(name));
	}

	#[rstest]
	#[case("else")]
	#[case("bind")]
	#[case("")]
	fn test_lookup_rejects_unknown_names(#[case] name: &str) {
		assert!(lookup(name).is_none());
	}

	#[test]
	fn test_names_are_unique() {
		let mut all: Vec<_> = names().collect();
		let count = all.len();
		all.sort_unstable();
		all.dedup();
		assert_eq!(all.len(), count);
	}
}
