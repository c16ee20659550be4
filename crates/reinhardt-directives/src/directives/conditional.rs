//! `x-if` / `x-else`: attaches a node only while its condition holds.

use core::cell::Cell;
use std::rc::Rc;

use super::{Directive, Flow};
use crate::component::Component;
use crate::dom::Node;
use crate::error::BindResult;
use crate::expression::Context;
use crate::reactive::ObserverSpec;

/// Conditional rendering.
///
/// A comment marker takes the node's place in the tree. While the condition
/// is truthy the node sits before the marker and is bound; otherwise it is
/// torn down and detached, and the element sibling carrying the `x-else`
/// attribute (if any) takes its place.
pub(crate) struct Conditional;

impl Directive for Conditional {
	fn name(&self) -> &'static str {
		"if"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let expression = node.get_attribute(attribute).unwrap_or_default();
		let else_attribute = component.config().else_attribute();
		let else_node = node
			.next_element_sibling()
			.filter(|sibling| sibling.has_attribute(&else_attribute));
		if let Some(else_node) = &else_node {
			component.claim(else_node);
		}
		let marker = Node::comment(format!("{attribute}: {expression}"));
		// Last rendered branch, so only transitions touch the tree
		let shown: Rc<Cell<Option<bool>>> = Rc::new(Cell::new(None));

		let commit = {
			let node = node.clone();
			let else_node = else_node.clone();
			let attribute = attribute.to_string();
			let else_attribute = else_attribute.clone();
			move |marker: &Node| {
				node.remove_attribute(&attribute);
				node.before(marker);
				if let Some(else_node) = &else_node {
					else_node.remove_attribute(&else_attribute);
				}
				Ok(())
			}
		};

		let update = {
			let weak = component.downgrade();
			let node = node.clone();
			let else_node = else_node.clone();
			let expression = expression.clone();
			let context = context.clone();
			let shown = Rc::clone(&shown);
			move |marker: &Node| {
				weak.with(|component| {
					let condition = component.evaluate(&expression, &context).is_truthy();
					if shown.replace(Some(condition)) == Some(condition) {
						return Ok(());
					}
					let (visible, hidden) = if condition {
						(Some(&node), else_node.as_ref())
					} else {
						(else_node.as_ref(), Some(&node))
					};
					if let Some(hidden) = hidden {
						component.tear_down(hidden);
						hidden.remove();
					}
					if let Some(visible) = visible {
						component.setup(visible, &context)?;
						if visible.parent().is_none() {
							marker.before(visible);
						}
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
					component.tear_down(&node);
					if let Some(else_node) = &else_node {
						component.tear_down(else_node);
						component.release_claim(else_node);
					}
				}
				node.set_attribute(&attribute, expression.as_str());
				marker.before(&node);
				if let Some(else_node) = &else_node {
					else_node.set_attribute(&else_attribute, "");
					marker.before(else_node);
				}
				marker.remove();
				shown.set(None);
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
