//! Observers and the per-property subscriber lists that notify them.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use tracing::trace;

use super::stack::DependencyGuard;
use crate::dom::Node;
use crate::error::BindResult;

/// `update` and `commit` behavior of an observer.
pub type UpdateFn = Rc<dyn Fn(&Node) -> BindResult<()>>;

/// `roll_back` behavior of an observer.
pub type RollBackFn = Rc<dyn Fn(&Node)>;

struct ObserverInner {
	object: Node,
	update: UpdateFn,
	commit: UpdateFn,
	roll_back: RollBackFn,
	active: Cell<bool>,
}

/// One active directive binding: a node plus its update, commit and
/// roll-back behaviors.
///
/// Cloning shares the observer. An observer rolls back at most once; after
/// that it is inactive and subscribers skip it.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

impl Observer {
	/// Node the binding is attached to.
	pub fn object(&self) -> &Node {
		&self.0.object
	}

	pub fn is_active(&self) -> bool {
		self.0.active.get()
	}

	/// Runs the one-time commit against the observed node.
	pub fn commit(&self) -> BindResult<()> {
		(self.0.commit)(&self.0.object)
	}

	/// Runs the update against `target`. Inactive observers do nothing.
	pub fn update(&self, target: &Node) -> BindResult<()> {
		if !self.is_active() {
			return Ok(());
		}
		(self.0.update)(target)
	}

	/// Restores the pre-binding node state and deactivates the observer.
	pub fn roll_back(&self) {
		if self.0.active.replace(false) {
			(self.0.roll_back)(&self.0.object);
		}
	}

	/// Identity comparison.
	pub fn ptr_eq(&self, other: &Observer) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Returns `true` when both observers bind the same update behavior to the same node.
	pub fn same_binding(&self, other: &Observer) -> bool {
		self.0.object == other.0.object && Rc::ptr_eq(&self.0.update, &other.0.update)
	}
}

impl fmt::Debug for Observer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observer")
			.field("object", &self.0.object)
			.field("active", &self.is_active())
			.finish()
	}
}

/// Builder for the behaviors of an observer. Missing behaviors are no-ops.
///
/// # Example
///
/// ```ignore
/// let spec = ObserverSpec::new()
///     .with_commit(|node| {
///         node.remove_attribute("x-text");
///         Ok(())
///     })
///     .with_update(move |node| {
///         node.set_text_content(&label.get().to_display_string());
///         Ok(())
///     })
///     .with_roll_back(|node| node.set_attribute("x-text", "label"));
/// component.observe(&node, spec)?;
/// ```
#[derive(Default)]
pub struct ObserverSpec {
	update: Option<UpdateFn>,
	commit: Option<UpdateFn>,
	roll_back: Option<RollBackFn>,
}

impl ObserverSpec {
	pub fn new() -> Self {
		Self::default()
	}

	/// Behavior re-run on every notification.
	pub fn with_update(mut self, update: impl Fn(&Node) -> BindResult<()> + 'static) -> Self {
		self.update = Some(Rc::new(update));
		self
	}

	/// One-time behavior run when the binding attaches.
	pub fn with_commit(mut self, commit: impl Fn(&Node) -> BindResult<()> + 'static) -> Self {
		self.commit = Some(Rc::new(commit));
		self
	}

	/// Behavior restoring the node when the binding detaches.
	pub fn with_roll_back(mut self, roll_back: impl Fn(&Node) + 'static) -> Self {
		self.roll_back = Some(Rc::new(roll_back));
		self
	}

	/// Creates the observer for `object`.
	pub(crate) fn build(self, object: Node) -> Observer {
		Observer(Rc::new(ObserverInner {
			object,
			update: self.update.unwrap_or_else(noop_update),
			commit: self.commit.unwrap_or_else(noop_update),
			roll_back: self.roll_back.unwrap_or_else(noop_roll_back),
			active: Cell::new(true),
		}))
	}
}

fn noop_update() -> UpdateFn {
	Rc::new(|_: &Node| Ok(()))
}

fn noop_roll_back() -> RollBackFn {
	Rc::new(|_: &Node| {})
}

/// Observers of one reactive property, in insertion order.
pub struct Subscriber {
	name: String,
	observers: RefCell<Vec<Observer>>,
}

impl Subscriber {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			observers: RefCell::new(Vec::new()),
		}
	}

	/// Name of the property this subscriber belongs to.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Adds an observer unless one with the same node and update behavior exists.
	///
	/// Returns `true` when the observer was added.
	pub fn add(&self, observer: &Observer) -> bool {
		let mut observers = self.observers.borrow_mut();
		if observers.iter().any(|existing| existing.same_binding(observer)) {
			return false;
		}
		observers.push(observer.clone());
		true
	}

	/// Removes every observer bound to `object` and rolls each one back.
	///
	/// Returns the number of removed observers.
	pub fn remove(&self, object: &Node) -> usize {
		let removed: Vec<Observer> = {
			let mut observers = self.observers.borrow_mut();
			let (removed, kept): (Vec<Observer>, Vec<Observer>) = observers
				.drain(..)
				.partition(|observer| observer.object() == object);
			*observers = kept;
			removed
		};
		// Roll back outside the borrow: a roll-back may tear down subtrees
		for observer in &removed {
			observer.roll_back();
		}
		removed.len()
	}

	/// Re-runs observers: all of them for `None`, or only those bound to the given node.
	///
	/// Iterates over a snapshot, so observers added or removed by an update
	/// take effect on the next pass. Each observer is current while its
	/// update runs, so properties it starts reading become dependencies.
	/// Every matching observer runs; the first error is returned.
	pub fn update(&self, object: Option<&Node>) -> BindResult<()> {
		let snapshot = self.observers.borrow().clone();
		let mut first_error = None;
		for observer in snapshot.iter().filter(|observer| observer.is_active()) {
			if object.is_some_and(|object| observer.object() != object) {
				continue;
			}
			trace!(property = %self.name, node = ?observer.object(), "Updating observer");
			let _guard = DependencyGuard::push(observer);
			if let Err(error) = observer.update(observer.object()) {
				first_error.get_or_insert(error);
			}
		}
		self.observers.borrow_mut().retain(Observer::is_active);
		first_error.map_or(Ok(()), Err)
	}

	pub fn contains(&self, observer: &Observer) -> bool {
		self.observers
			.borrow()
			.iter()
			.any(|existing| existing.ptr_eq(observer))
	}

	/// Number of active observers. Rolled-back ones awaiting pruning are not counted.
	pub fn len(&self) -> usize {
		self.observers
			.borrow()
			.iter()
			.filter(|observer| observer.is_active())
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of active observers bound to `object`.
	pub fn count_for(&self, object: &Node) -> usize {
		self.observers
			.borrow()
			.iter()
			.filter(|observer| observer.is_active() && observer.object() == object)
			.count()
	}

	/// Drops every observer without rolling back.
	pub fn clear(&self) {
		self.observers.borrow_mut().clear();
	}
}

impl fmt::Debug for Subscriber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscriber")
			.field("name", &self.name)
			.field("observers", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::BindError;
	use rstest::rstest;

	fn counting_spec(updates: &Rc<Cell<usize>>, roll_backs: &Rc<Cell<usize>>) -> ObserverSpec {
		let updates = Rc::clone(updates);
		let roll_backs = Rc::clone(roll_backs);
		ObserverSpec::new()
			.with_update(move |_| {
				updates.set(updates.get() + 1);
				Ok(())
			})
			.with_roll_back(move |_| roll_backs.set(roll_backs.get() + 1))
	}

	#[test]
	fn test_add_is_idempotent_for_same_binding() {
		let subscriber = Subscriber::new("count");
		let observer = ObserverSpec::new().build(Node::element("p"));

		assert!(subscriber.add(&observer));
		assert!(!subscriber.add(&observer.clone()));

		assert_eq!(subscriber.len(), 1);
	}

	#[test]
	fn test_remove_rolls_back_every_observer_of_object() {
		let subscriber = Subscriber::new("count");
		let node = Node::element("p");
		let other = Node::element("p");
		let updates = Rc::new(Cell::new(0));
		let roll_backs = Rc::new(Cell::new(0));
		for target in [&node, &node, &other] {
			subscriber.add(&counting_spec(&updates, &roll_backs).build(target.clone()));
		}

		assert_eq!(subscriber.remove(&node), 2);

		assert_eq!(roll_backs.get(), 2);
		assert_eq!(subscriber.count_for(&node), 0);
		assert_eq!(subscriber.len(), 1);
		assert_eq!(subscriber.remove(&node), 0);
	}

	#[rstest]
	#[case(None, 2)]
	#[case(Some(0), 1)]
	fn test_update_all_or_targeted(#[case] target: Option<usize>, #[case] expected: usize) {
		let subscriber = Subscriber::new("count");
		let nodes = [Node::element("a"), Node::element("b")];
		let updates = Rc::new(Cell::new(0));
		let roll_backs = Rc::new(Cell::new(0));
		for node in &nodes {
			subscriber.add(&counting_spec(&updates, &roll_backs).build(node.clone()));
		}

		subscriber.update(target.map(|index| &nodes[index])).unwrap();

		assert_eq!(updates.get(), expected);
	}

	#[test]
	fn test_update_skips_and_prunes_rolled_back_observers() {
		let subscriber = Subscriber::new("count");
		let updates = Rc::new(Cell::new(0));
		let roll_backs = Rc::new(Cell::new(0));
		let observer = counting_spec(&updates, &roll_backs).build(Node::element("p"));
		subscriber.add(&observer);

		observer.roll_back();
		observer.roll_back();
		subscriber.update(None).unwrap();

		assert_eq!(roll_backs.get(), 1);
		assert_eq!(updates.get(), 0);
		assert!(subscriber.is_empty());
	}

	#[test]
	fn test_update_runs_all_and_returns_first_error() {
		let subscriber = Subscriber::new("items");
		let updates = Rc::new(Cell::new(0));
		let roll_backs = Rc::new(Cell::new(0));
		subscriber.add(
			&ObserverSpec::new()
				.with_update(|_| Err(BindError::InvalidIterator("items".into())))
				.build(Node::element("ul")),
		);
		subscriber.add(&counting_spec(&updates, &roll_backs).build(Node::element("p")));

		let result = subscriber.update(None);

		assert_eq!(result, Err(BindError::InvalidIterator("items".into())));
		assert_eq!(updates.get(), 1);
		assert_eq!(crate::reactive::dependency_depth(), 0);
	}

	#[test]
	fn test_update_tolerates_observers_removing_themselves() {
		let subscriber = Rc::new(Subscriber::new("flag"));
		let node = Node::element("p");
		let target = node.clone();
		let weak = Rc::downgrade(&subscriber);
		subscriber.add(
			&ObserverSpec::new()
				.with_update(move |_| {
					if let Some(subscriber) = weak.upgrade() {
						subscriber.remove(&target);
					}
					Ok(())
				})
				.build(node.clone()),
		);

		subscriber.update(None).unwrap();

		assert_eq!(subscriber.count_for(&node), 0);
	}
}
