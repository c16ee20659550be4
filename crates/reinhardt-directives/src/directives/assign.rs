//! Directives that write one aspect of a node from an expression.
//!
//! They share one life cycle: the attribute is stripped when the binding
//! attaches, the node is written on every update, and rolling back puts the
//! attribute back and undoes whatever the directive changed.

use super::{Directive, Flow, argument};
use crate::attribute::text_to_property;
use crate::component::Component;
use crate::dom::Node;
use crate::error::{BindError, BindResult};
use crate::expression::Context;
use crate::reactive::ObserverSpec;
use crate::value::Value;

fn observe_assignment<U, R>(
	component: &Component,
	node: &Node,
	attribute: &str,
	update: U,
	restore: R,
) -> BindResult<Flow>
where
	U: Fn(&Component, &Node) -> BindResult<()> + 'static,
	R: Fn(&Node) + 'static,
{
	let weak = component.downgrade();
	let original = node.get_attribute(attribute).unwrap_or_default();
	let stripped = attribute.to_string();
	let attribute = attribute.to_string();
	component.observe(
		node,
		ObserverSpec::new()
			.with_commit(move |node| {
				node.remove_attribute(&stripped);
				Ok(())
			})
			.with_update(move |node| weak.with(|component| update(component, node)))
			.with_roll_back(move |node| {
				node.set_attribute(&attribute, original.as_str());
				restore(node);
			}),
	)?;
	Ok(Flow::Continue)
}

/// Display text of a value, with `null` and `undefined` as empty.
fn text_of(value: &Value) -> String {
	if value.is_nullish() {
		String::new()
	} else {
		value.to_display_string()
	}
}

/// `x-prop:name="expr"` (or `:name="expr"`) sets a node property.
///
/// An empty value reads the property named by the argument, so `:title`
/// binds `title` to `title`.
pub(crate) struct Prop;

impl Directive for Prop {
	fn name(&self) -> &'static str {
		"prop"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let raw = argument(attribute).unwrap_or_default();
		let expression = node
			.get_attribute(attribute)
			.filter(|value| !value.is_empty())
			.unwrap_or_else(|| raw.to_string());
		let name = text_to_property(raw);
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| node.set_property(&name, component.evaluate(&expression, &context)),
			|_| {},
		)
	}
}

/// `x-attr:name="text ${expr}"` sets an attribute from interpolated text.
pub(crate) struct Attr;

impl Directive for Attr {
	fn name(&self) -> &'static str {
		"attr"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let name = argument(attribute).unwrap_or_default().to_string();
		let template = node.get_attribute(attribute).unwrap_or_default();
		let context = context.clone();
		let restored = name.clone();
		let original = template.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| {
				node.set_attribute(&name, component.interpolate(&template, &context));
				Ok(())
			},
			move |node| {
				if original.is_empty() {
					node.remove_attribute(&restored);
				} else {
					node.set_attribute(&restored, original.as_str());
				}
			},
		)
	}
}

/// `x-class="expr"` adds classes on top of the node's own `class` attribute.
///
/// A map toggles each key by the truthiness of its value; a list adds each
/// item; anything else adds its whitespace-separated words.
pub(crate) struct Class;

impl Directive for Class {
	fn name(&self) -> &'static str {
		"class"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let original = node.get_attribute("class");
		let reset = {
			let original = original.clone();
			move |node: &Node| match &original {
				Some(class) => node.set_attribute("class", class.as_str()),
				None => {
					node.remove_attribute("class");
				}
			}
		};
		let restore = reset.clone();
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| {
				reset(node);
				match component.evaluate(&expression, &context) {
					Value::Map(map) => {
						for (key, value) in map.entries() {
							for class in key.split_whitespace() {
								node.toggle_class(class, value.is_truthy());
							}
						}
					}
					Value::List(list) => {
						for item in list.to_vec() {
							add_classes(node, &text_of(&item));
						}
					}
					value if value.is_truthy() => add_classes(node, &value.to_display_string()),
					_ => {}
				}
				Ok(())
			},
			restore,
		)
	}
}

fn add_classes(node: &Node, classes: &str) {
	for class in classes.split_whitespace() {
		node.add_class(class);
	}
}

/// `x-style="expr"` sets inline style properties from a map.
pub(crate) struct Style;

impl Directive for Style {
	fn name(&self) -> &'static str {
		"style"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let original = node.get_attribute("style");
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| match component.evaluate(&expression, &context) {
				Value::Map(map) => {
					for (name, value) in map.entries() {
						node.set_style_property(&name, &text_of(&value));
					}
					Ok(())
				}
				_ => Err(BindError::InvalidStyle(expression.clone())),
			},
			move |node| match &original {
				Some(style) => node.set_attribute("style", style.as_str()),
				None => {
					node.remove_attribute("style");
				}
			},
		)
	}
}

/// `x-text="expr"` replaces the node's content with text.
pub(crate) struct Text;

impl Directive for Text {
	fn name(&self) -> &'static str {
		"text"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| {
				node.set_text_content(&text_of(&component.evaluate(&expression, &context)));
				Ok(())
			},
			|_| {},
		)
	}
}

/// `x-html="expr"` replaces the node's content with parsed markup.
///
/// The markup is not bound: directives and `${...}` inside it stay inert.
/// Binding stops at this node, so attributes after `x-html` are left as-is.
pub(crate) struct Html;

impl Directive for Html {
	fn name(&self) -> &'static str {
		"html"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| {
				node.set_inner_html(&text_of(&component.evaluate(&expression, &context)));
				Ok(())
			},
			|_| {},
		)?;
		// Re-renders replace the children without tearing them down
		Ok(Flow::Stop)
	}
}

/// `x-show="expr"` hides the node while the expression is falsy.
pub(crate) struct Show;

impl Directive for Show {
	fn name(&self) -> &'static str {
		"show"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let was_hidden = node.hidden();
		let context = context.clone();
		observe_assignment(
			component,
			node,
			attribute,
			move |component, node| {
				node.set_hidden(!component.evaluate(&expression, &context).is_truthy());
				Ok(())
			},
			move |node| node.set_hidden(was_hidden),
		)
	}
}
