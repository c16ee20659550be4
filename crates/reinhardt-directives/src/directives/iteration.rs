//! `x-for`: one clone of the node per list item or map entry.

use core::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use super::{Directive, Flow};
use crate::component::Component;
use crate::dom::Node;
use crate::error::{BindError, BindResult};
use crate::expression::Context;
use crate::reactive::{ObserverSpec, scheduler};
use crate::value::Value;

/// `source`, `source as item` or `source as index: item`
static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"([\w.$]+)(?:\s+as\s+(?:(\w+):\s*)?(\w+))?").expect("iteration pattern is valid")
});

/// Parsed `x-for` value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
	source: String,
	index: Option<String>,
	item: Option<String>,
}

impl Pattern {
	fn parse(expression: &str) -> Option<Self> {
		let captures = PATTERN.captures(expression)?;
		Some(Self {
			source: captures.get(1)?.as_str().to_string(),
			index: captures.get(2).map(|name| name.as_str().to_string()),
			item: captures.get(3).map(|name| name.as_str().to_string()),
		})
	}
}

/// List rendering.
///
/// The node becomes a template: a comment marker replaces it, and every
/// update tears down the previous clones and inserts a fresh clone per
/// entry before the marker. Each clone sees the entry's key under the index
/// name (a number for lists, the key for maps) and its value under the item
/// name.
pub(crate) struct Iteration;

impl Directive for Iteration {
	fn name(&self) -> &'static str {
		"for"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let pattern = Pattern::parse(&expression)
			.ok_or_else(|| BindError::InvalidIterator(expression.clone()))?;
		let index_name = pattern
			.index
			.unwrap_or_else(|| component.config().index_name.clone());
		let item_name = pattern
			.item
			.unwrap_or_else(|| component.config().item_name.clone());
		let source = pattern.source;
		let marker = Node::comment(format!("{attribute}: {expression}"));
		let clones: Rc<RefCell<Vec<Node>>> = Rc::new(RefCell::new(Vec::new()));

		let commit = {
			let node = node.clone();
			move |marker: &Node| {
				node.before(marker);
				node.remove();
				Ok(())
			}
		};

		let update = {
			let weak = component.downgrade();
			let node = node.clone();
			let attribute = attribute.to_string();
			let context = context.clone();
			let clones = Rc::clone(&clones);
			move |marker: &Node| {
				weak.with(|component| {
					let entries: Vec<(Value, Value)> = match component.evaluate(&source, &context) {
						Value::List(list) => list
							.to_vec()
							.into_iter()
							.enumerate()
							.map(|(index, item)| (Value::from(index), item))
							.collect(),
						Value::Map(map) => map
							.entries()
							.into_iter()
							.map(|(key, item)| (Value::String(key), item))
							.collect(),
						_ => return Err(BindError::InvalidIterator(source.clone())),
					};

					remove_clones(component, &clones);
					for (key, item) in entries {
						let clone = node.clone_node(true);
						clone.remove_attribute(&attribute);
						marker.before(&clone);
						clones.borrow_mut().push(clone.clone());
						let row = context.with(index_name.as_str(), key).with(item_name.as_str(), item);
						component.setup(&clone, &row)?;
					}

					if let Some(parent) = marker.parent() {
						let weak = component.downgrade();
						scheduler::defer(move || {
							weak.with(|component| component.force_update(Some(&parent)))
						});
					}
					Ok(())
				})
			}
		};

		let roll_back = {
			let weak = component.downgrade();
			let node = node.clone();
			move |marker: &Node| {
				if let Some(component) = weak.upgrade() {
					remove_clones(&component, &clones);
				}
				marker.before(&node);
				marker.remove();
			}
		};

		component.observe(
			&marker,
			ObserverSpec::new()
				.with_commit(commit)
				.with_update(update)
				.with_roll_back(roll_back),
		)?;
		Ok(Flow::Stop)
	}
}

fn remove_clones(component: &Component, clones: &RefCell<Vec<Node>>) {
	for clone in clones.take() {
		component.tear_down(&clone);
		clone.remove();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentDefinition;
	use crate::config::DirectiveConfig;
	use rstest::rstest;

	fn mount(template: &str, items: Value) -> Component {
		let definition = ComponentDefinition::new("x-list")
			.template(template)
			.property("items", items)
			.property("title", "t");
		let component = Component::new(definition, Node::element("x-list"));
		component.mount().unwrap();
		component
	}

	#[rstest]
	#[case("items", Some(("items", None, None)))]
	#[case("items as row", Some(("items", None, Some("row"))))]
	#[case("items as i: row", Some(("items", Some("i"), Some("row"))))]
	#[case("user.items as key:value", Some(("user.items", Some("key"), Some("value"))))]
	#[case("   ", None)]
	fn test_pattern_parse(
		#[case] expression: &str,
		#[case] expected: Option<(&str, Option<&str>, Option<&str>)>,
	) {
		let expected = expected.map(|(source, index, item)| Pattern {
			source: source.to_string(),
			index: index.map(str::to_string),
			item: item.map(str::to_string),
		});
		assert_eq!(Pattern::parse(expression), expected);
	}

	#[test]
	fn test_clones_each_item_in_order() {
		let component = mount(
			"<ul><li x-for=\"items\">${index}:${item}</li></ul>",
			Value::list(["a", "b", "c"]),
		);

		assert_eq!(
			component.root().inner_html(),
			"<ul><li>0:a</li><li>1:b</li><li>2:c</li><!--x-for: items--></ul>"
		);
	}

	#[test]
	fn test_in_place_mutation_re_renders() {
		let component = mount("<li x-for=\"items as i: v\">${v}</li>", Value::list(["a"]));
		let Value::List(items) = component.get("items") else {
			panic!("items should be a list");
		};

		items.push("b");
		items.remove(0);
		scheduler::flush().unwrap();

		assert_eq!(component.root().text_content(), "b");
		assert_eq!(component.root().elements_by_tag("li").len(), 1);
		assert_eq!(component.subscriber("items").unwrap().len(), 1);
	}

	#[test]
	fn test_map_entries_bind_keys() {
		let component = mount(
			"<p x-for=\"items as k: v\">${k}=${v}</p>",
			Value::map([("x", 1), ("y", 2)]),
		);

		assert_eq!(component.root().text_content(), "x=1y=2");
	}

	#[test]
	fn test_configured_loop_names() {
		let definition = ComponentDefinition::new("x-rows")
			.template("<p x-for=\"rows\">${n}.${row}</p>")
			.property("rows", Value::list(["a"]))
			.config(DirectiveConfig::new().with_loop_names("n", "row"));
		let component = Component::new(definition, Node::element("x-rows"));
		component.mount().unwrap();

		assert_eq!(component.root().text_content(), "0.a");
	}

	#[rstest]
	#[case(Value::from(3))]
	#[case(Value::from("abc"))]
	#[case(Value::Null)]
	fn test_non_iterable_source_is_rejected(#[case] source: Value) {
		let definition = ComponentDefinition::new("x-bad")
			.template("<p x-for=\"source\"></p>")
			.property("source", source);
		let component = Component::new(definition, Node::element("x-bad"));

		assert_eq!(
			component.mount(),
			Err(BindError::InvalidIterator("source".into()))
		);
	}

	#[test]
	fn test_tear_down_restores_template() {
		let template = "<ul><li x-for=\"items\" class=\"row\">${item}</li></ul>";
		let component = mount(template, Value::list(["a", "b"]));

		component.tear_down(component.root());

		assert_eq!(component.root().inner_html(), template);
		assert_eq!(component.observer_count(), 0);
	}
}
