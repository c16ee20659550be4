//! Binding engine: walking a node tree and attaching directives to it.
//!
//! [`Component::setup`] visits a node and its descendants. Every attribute
//! of an element is normalized in place (`:title` becomes `x-prop:title`,
//! `@click` becomes `x-on:click`, ...) and, when it names a directive, the
//! directive is bound. Structural directives (`if`, `for`, `slot`) take
//! ownership of the node they are placed on and stop the walk there.
//!
//! A directive attaches itself through [`Component::observe`]: the observer
//! is made current, its `commit` runs once, then its first `update` runs.
//! Every reactive property read meanwhile records the observer as a
//! dependent, so later writes to those properties re-run `update`.
//!
//! [`Component::tear_down`] is the inverse: every observer bound to a node of
//! the subtree is removed and rolled back, restoring the attributes and
//! nodes the directives consumed.

use tracing::{trace, warn};

use crate::attribute::{directive_name, normalize_attribute};
use crate::component::{Component, definition};
use crate::directives::{self, Flow, interpolation};
use crate::dom::Node;
use crate::error::{BindError, BindResult};
use crate::expression::Context;
use crate::reactive::{DependencyGuard, Observer, ObserverSpec};
use crate::value::Value;

impl Component {
	/// Binds the directives of `node` and its descendants.
	///
	/// `context` carries the extra names visible to expressions in the
	/// subtree; `$node` is bound to the node being visited.
	///
	/// # Errors
	///
	/// Returns [`BindError::InvalidBinder`] for an attribute naming an
	/// unknown directive, or the first error a directive raises while
	/// binding. Binding stops at the first error.
	pub fn setup(&self, node: &Node, context: &Context) -> BindResult<()> {
		let context = context.with("$node", node.clone());
		if node.is_element() {
			let prefix = self.config().prefix.clone();
			for name in node.attribute_names() {
				// An earlier directive may have consumed it
				let Some(value) = node.get_attribute(&name) else {
					continue;
				};
				let attribute = normalize_attribute(&name, &value, &prefix);
				if attribute != name {
					node.remove_attribute(&name);
					node.set_attribute(&attribute, value);
				}
				let Some(directive) = directive_name(&attribute, &prefix) else {
					continue;
				};
				let handler = directives::lookup(directive)
					.ok_or_else(|| BindError::InvalidBinder(attribute.clone()))?;
				trace!(component = %self.tag(), attribute = %attribute, "Binding directive");
				if handler.bind(self, node, &attribute, &context)? == Flow::Stop {
					return Ok(());
				}
			}
			if node.is_custom_element() {
				return self.mount_child(node);
			}
		} else if node.is_text() && node.data().is_some_and(|data| data.contains("${")) {
			interpolation::bind(self, node, &context)?;
		}

		for child in node.effective_children() {
			// Detached by a sibling's directive, or owned by one
			if child.parent().is_none() || self.is_claimed(&child) {
				continue;
			}
			self.setup(&child, &context)?;
		}
		Ok(())
	}

	/// Mounts the component defined for a custom element found in the tree.
	///
	/// The element's subtree belongs to the child component; undefined tags
	/// are left alone.
	fn mount_child(&self, host: &Node) -> BindResult<()> {
		let child = match host.component() {
			Some(child) => child,
			None => match definition(host.tag_name()) {
				Some(definition) => Component::new(definition, host.clone()),
				None => {
					trace!(tag = %host.tag_name(), "Skipping undefined custom element");
					return Ok(());
				}
			},
		};
		self.adopt_child(&child);
		child.mount()
	}

	/// Removes every observer bound inside `node`'s subtree, rolling each one back.
	///
	/// Child components hosted in the subtree are unmounted. Tearing down a
	/// subtree without observers does nothing.
	pub fn tear_down(&self, node: &Node) {
		for property in self.properties() {
			property.subscriber().remove(node);
		}
		let removed: Vec<Observer> = {
			let mut statics = self.static_observers().borrow_mut();
			let (removed, kept): (Vec<Observer>, Vec<Observer>) = statics
				.drain(..)
				.partition(|observer| observer.object() == node);
			*statics = kept;
			removed
		};
		for observer in removed {
			observer.roll_back();
		}

		if let Some(child) = node.component().filter(|child| !child.ptr_eq(self)) {
			if self.children().iter().any(|existing| existing.ptr_eq(&child)) {
				child.unmount();
				self.release_child(&child);
			}
			return;
		}
		for child in node.effective_children() {
			self.tear_down(&child);
		}
	}

	/// Re-runs observers without committing again: every observer for
	/// `None`, or only those bound to the given node.
	///
	/// Every matching observer runs; the first error is returned.
	pub fn force_update(&self, node: Option<&Node>) -> BindResult<()> {
		let mut first_error = None;
		for property in self.properties() {
			if let Err(error) = property.subscriber().update(node) {
				first_error.get_or_insert(error);
			}
		}

		let statics = self.static_observers().borrow().clone();
		for observer in statics.iter().filter(|observer| observer.is_active()) {
			if node.is_some_and(|node| observer.object() != node) {
				continue;
			}
			let _guard = DependencyGuard::push(observer);
			if let Err(error) = observer.update(observer.object()) {
				first_error.get_or_insert(error);
			}
		}
		// Observers that picked up a dependency are now notified by it
		self.static_observers()
			.borrow_mut()
			.retain(|observer| observer.is_active() && !self.is_subscribed(observer));

		first_error.map_or(Ok(()), Err)
	}

	/// Attaches a directive's behaviors to `node`.
	///
	/// The observer is current while `commit` and then `update` run once, so
	/// the properties read during those calls become its dependencies. An
	/// observer that reads no property is kept by the component so tearing
	/// the node down still rolls it back.
	///
	/// # Errors
	///
	/// Returns the error raised by `commit` or `update`. The observer stays
	/// registered so a later tear down restores the node.
	pub fn observe(&self, node: &Node, spec: ObserverSpec) -> BindResult<Observer> {
		let observer = spec.build(node.clone());
		let result = {
			let _guard = DependencyGuard::push(&observer);
			observer.commit().and_then(|()| observer.update(node))
		};
		if observer.is_active() && !self.is_subscribed(&observer) {
			self.static_observers().borrow_mut().push(observer.clone());
		}
		result.map(|()| observer)
	}

	/// Evaluates an expression, logging failures and returning `undefined` for them.
	pub fn evaluate(&self, expression: &str, context: &Context) -> Value {
		self.evaluator()
			.evaluate(&self.scope(), expression, context)
			.unwrap_or_else(|error| {
				warn!(component = %self.tag(), expression, error = %error, "Expression evaluation failed");
				Value::Undefined
			})
	}

	/// Renders `${...}` interpolations, logging failures and rendering an
	/// empty string for them.
	pub fn interpolate(&self, template: &str, context: &Context) -> String {
		self.evaluator()
			.interpolate(&self.scope(), template, context)
			.unwrap_or_else(|error| {
				warn!(component = %self.tag(), template, error = %error, "Interpolation failed");
				String::new()
			})
	}

	/// Stores `value` into the assignable expression `target`, logging failures.
	pub fn assign(&self, target: &str, value: Value, context: &Context) {
		if let Err(error) = self
			.evaluator()
			.assign(&self.scope(), target, value, context)
		{
			warn!(component = %self.tag(), expression = target, error = %error, "Assignment failed");
		}
	}
}
