//! `x-slot`: renders a `<template>` supplied by the component's host.

use core::cell::RefCell;
use std::rc::Rc;

use super::{Directive, Flow};
use crate::attribute::normalize_attribute;
use crate::component::Component;
use crate::dom::Node;
use crate::error::BindResult;
use crate::expression::Context;
use crate::reactive::ObserverSpec;

/// Template projection.
///
/// `<div x-slot="row" class="cell">` looks for a `<template slot="row">`
/// among the host's children (the default slot also accepts a template
/// without a `slot` attribute). A comment marker replaces the placeholder,
/// and every update clones the template's elements before the marker,
/// merging the placeholder's attributes into each clone.
///
/// Slot content may read any state, so re-rendering is tied to the first
/// declared property only. Writes to other properties do not re-render the
/// slot.
pub(crate) struct Slot;

impl Directive for Slot {
	fn name(&self) -> &'static str {
		"slot"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node
			.get_attribute(attribute)
			.filter(|name| !name.is_empty())
			.unwrap_or_else(|| component.config().default_slot.clone());
		let Some(template) = find_template(component, &expression) else {
			return Ok(Flow::Stop);
		};
		let original = node.get_attribute(attribute).unwrap_or_default();
		let marker = Node::comment(format!("{attribute}: {expression}"));
		let clones: Rc<RefCell<Vec<Node>>> = Rc::new(RefCell::new(Vec::new()));

		let commit = {
			let node = node.clone();
			let attribute = attribute.to_string();
			move |marker: &Node| {
				node.remove_attribute(&attribute);
				node.before(marker);
				node.remove();
				Ok(())
			}
		};

		let update = {
			let weak = component.downgrade();
			let node = node.clone();
			let context = context.clone();
			let clones = Rc::clone(&clones);
			move |marker: &Node| {
				weak.with(|component| {
					if let Some(trigger) = component.properties().first() {
						trigger.get();
					}
					remove_clones(component, &clones);
					let Some(content) = template.content() else {
						return Ok(());
					};
					let prefix = &component.config().prefix;
					for element in content.element_children() {
						let clone = element.clone_node(true);
						merge_placeholder_attributes(&node, &clone, prefix);
						marker.before(&clone);
						clones.borrow_mut().push(clone.clone());
						component.setup(&clone, &context)?;
					}
					Ok(())
				})
			}
		};

		let roll_back = {
			let weak = component.downgrade();
			let node = node.clone();
			let attribute = attribute.to_string();
			move |marker: &Node| {
				if let Some(component) = weak.upgrade() {
					remove_clones(&component, &clones);
				}
				node.set_attribute(&attribute, original.as_str());
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

fn find_template(component: &Component, name: &str) -> Option<Node> {
	let is_default = name == component.config().default_slot;
	component
		.host()
		.element_children()
		.into_iter()
		.filter(|child| child.tag_name() == "template")
		.find(|template| match template.get_attribute("slot") {
			Some(slot) => slot == name,
			None => is_default,
		})
}

/// Copies the placeholder's attributes onto `clone`.
///
/// Attribute values are joined with the clone's own value for the same
/// (normalized) name, so classes accumulate. Bindings written on the clone
/// itself win over the placeholder's.
fn merge_placeholder_attributes(placeholder: &Node, clone: &Node, prefix: &str) {
	let mut bindings = Vec::new();
	for name in clone.attribute_names() {
		let value = clone.get_attribute(&name).unwrap_or_default();
		let bind = normalize_attribute(&name, &value, prefix);
		if bind != name {
			clone.remove_attribute(&name);
			bindings.push((bind, value));
		}
	}
	for name in placeholder.attribute_names() {
		let value = placeholder.get_attribute(&name).unwrap_or_default();
		let bind = normalize_attribute(&name, &value, prefix);
		let merged = match clone.get_attribute(&bind) {
			Some(existing) => format!("{value} {existing}"),
			None => value,
		};
		clone.set_attribute(&bind, merged.trim());
	}
	for (name, value) in bindings {
		clone.set_attribute(&name, value);
	}
}

fn remove_clones(component: &Component, clones: &RefCell<Vec<Node>>) {
	for clone in clones.take() {
		component.tear_down(&clone);
		clone.remove();
	}
}
