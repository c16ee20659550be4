//! Events and listener dispatch.
//!
//! Dispatch is synchronous and targets a single node; events do not bubble.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use super::Node;
use crate::value::Value;

/// Listener attached to a node. Identity (`Rc::ptr_eq`) is used for removal.
pub type EventListener = Rc<dyn Fn(&Event)>;

/// An event dispatched on a node.
#[derive(Debug)]
pub struct Event {
	kind: String,
	detail: Value,
	cancelable: bool,
	default_prevented: Cell<bool>,
	target: RefCell<Option<Node>>,
}

impl Event {
	/// Creates a non-cancelable event without detail.
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			detail: Value::Undefined,
			cancelable: false,
			default_prevented: Cell::new(false),
			target: RefCell::new(None),
		}
	}

	/// Attaches a detail payload.
	pub fn with_detail(mut self, detail: Value) -> Self {
		self.detail = detail;
		self
	}

	/// Makes the event cancelable.
	pub fn with_cancelable(mut self, cancelable: bool) -> Self {
		self.cancelable = cancelable;
		self
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}

	pub fn detail(&self) -> &Value {
		&self.detail
	}

	/// Node the event was dispatched on.
	pub fn target(&self) -> Option<Node> {
		self.target.borrow().clone()
	}

	/// Marks the default action as prevented. Ignored for non-cancelable events.
	pub fn prevent_default(&self) {
		if self.cancelable {
			self.default_prevented.set(true);
		}
	}

	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

impl Node {
	/// Attaches a listener. Adding the same listener twice for one kind is a no-op.
	pub fn add_event_listener(&self, kind: &str, listener: EventListener) {
		let mut listeners = self.0.listeners.borrow_mut();
		let exists = listeners
			.iter()
			.any(|(existing_kind, existing)| existing_kind == kind && Rc::ptr_eq(existing, &listener));
		if !exists {
			listeners.push((kind.to_string(), listener));
		}
	}

	/// Detaches a previously attached listener.
	pub fn remove_event_listener(&self, kind: &str, listener: &EventListener) {
		self.0
			.listeners
			.borrow_mut()
			.retain(|(existing_kind, existing)| !(existing_kind == kind && Rc::ptr_eq(existing, listener)));
	}

	/// Number of listeners attached for `kind`.
	pub fn listener_count(&self, kind: &str) -> usize {
		self.0
			.listeners
			.borrow()
			.iter()
			.filter(|(existing_kind, _)| existing_kind == kind)
			.count()
	}

	/// Dispatches `event` to the listeners attached for its kind, in
	/// attachment order. Returns `false` when a listener prevented the default.
	///
	/// Listeners attached or removed during dispatch take effect on the next dispatch.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		*event.target.borrow_mut() = Some(self.clone());
		let listeners: Vec<EventListener> = self
			.0
			.listeners
			.borrow()
			.iter()
			.filter(|(kind, _)| kind == event.kind())
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		for listener in listeners {
			listener(event);
		}
		!event.default_prevented()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dispatch_runs_matching_listeners_in_order() {
		let node = Node::element("button");
		let log = Rc::new(RefCell::new(Vec::new()));
		for label in ["first", "second"] {
			let log = Rc::clone(&log);
			node.add_event_listener("click", Rc::new(move |_: &Event| log.borrow_mut().push(label)));
		}
		node.add_event_listener("focus", Rc::new(|_: &Event| panic!("wrong kind")));

		node.dispatch_event(&Event::new("click"));

		assert_eq!(*log.borrow(), vec!["first", "second"]);
	}

	#[test]
	fn test_remove_listener_by_identity() {
		let node = Node::element("input");
		let listener: EventListener = Rc::new(|_: &Event| {});
		node.add_event_listener("input", Rc::clone(&listener));
		node.add_event_listener("input", Rc::clone(&listener));
		assert_eq!(node.listener_count("input"), 1);

		node.remove_event_listener("input", &listener);
		assert_eq!(node.listener_count("input"), 0);
	}

	#[test]
	fn test_prevent_default_requires_cancelable() {
		let node = Node::element("form");
		node.add_event_listener("submit", Rc::new(|event: &Event| event.prevent_default()));

		assert!(node.dispatch_event(&Event::new("submit")));
		let cancelable = Event::new("submit").with_cancelable(true);
		assert!(!node.dispatch_event(&cancelable));
		assert_eq!(cancelable.target(), Some(node));
	}
}
