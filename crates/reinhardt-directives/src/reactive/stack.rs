//! Stack of observers currently being evaluated.
//!
//! The stack lives in thread-local storage: binding is single-threaded and
//! each thread gets an independent stack. Entries are unique by identity;
//! the most recently pushed entry is the current observer, the one property
//! reads are attributed to.

use core::cell::RefCell;

use super::subscriber::Observer;

/// Ordered set of observers, last pushed is current.
#[derive(Default)]
pub struct DependencyStack {
	observers: RefCell<Vec<Observer>>,
}

impl DependencyStack {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes `observer` unless it is already on the stack.
	///
	/// Returns `true` when the observer was pushed.
	pub fn push(&self, observer: &Observer) -> bool {
		let mut observers = self.observers.borrow_mut();
		if observers.iter().any(|existing| existing.ptr_eq(observer)) {
			return false;
		}
		observers.push(observer.clone());
		true
	}

	/// Removes the most recently pushed observer.
	pub fn pop(&self) -> Option<Observer> {
		self.observers.borrow_mut().pop()
	}

	/// The most recently pushed observer.
	pub fn current(&self) -> Option<Observer> {
		self.observers.borrow().last().cloned()
	}

	pub fn is_empty(&self) -> bool {
		self.observers.borrow().is_empty()
	}

	pub fn len(&self) -> usize {
		self.observers.borrow().len()
	}
}

thread_local! {
	static DEPENDENCY_STACK: DependencyStack = DependencyStack::new();
}

/// Runs `f` with the thread's dependency stack.
pub fn with_dependency_stack<F, R>(f: F) -> R
where
	F: FnOnce(&DependencyStack) -> R,
{
	DEPENDENCY_STACK.with(f)
}

/// The thread's current observer, if any evaluation is in progress.
pub fn current_observer() -> Option<Observer> {
	with_dependency_stack(DependencyStack::current)
}

/// Number of observers on the thread's stack.
pub fn dependency_depth() -> usize {
	with_dependency_stack(DependencyStack::len)
}

/// Scope during which an observer is current.
///
/// The observer is popped when the guard drops, on success, on an early
/// `?` return and during unwinding alike. If the observer was already on the
/// stack the guard neither pushes nor pops.
///
/// # Example
///
/// ```ignore
/// let depth = dependency_depth();
/// {
///     let _guard = DependencyGuard::push(&observer);
///     observer.commit()?;
///     observer.update(observer.object())?;
/// }
/// assert_eq!(dependency_depth(), depth);
/// ```
#[must_use = "the observer is popped as soon as the guard is dropped"]
pub struct DependencyGuard {
	pushed: bool,
}

impl DependencyGuard {
	pub fn push(observer: &Observer) -> Self {
		Self {
			pushed: with_dependency_stack(|stack| stack.push(observer)),
		}
	}
}

impl Drop for DependencyGuard {
	fn drop(&mut self) {
		if self.pushed {
			// The stack may already be gone during thread teardown
			let _ = DEPENDENCY_STACK.try_with(|stack| stack.pop());
		}
	}
}
