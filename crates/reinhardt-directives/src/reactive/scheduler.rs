//! End-of-turn notification queue.
//!
//! Property writes never notify synchronously. They queue their subscriber
//! here; queuing a subscriber that is already pending moves it to the back
//! of the queue, cancelling the earlier notification. The host (or the
//! listeners installed by the event and model directives) calls [`flush`]
//! at the end of each external event, which runs every queued task,
//! including tasks queued while flushing.
//!
//! Like the dependency stack, the queue is thread-local.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use super::subscriber::Subscriber;
use crate::error::BindResult;

/// Task limit used by [`flush`].
pub const DEFAULT_MAX_FLUSH_TASKS: usize = 10_000;

enum Task {
	/// Re-run every observer of a property
	Notify(Rc<Subscriber>),
	/// One-shot work deferred to the end of the turn
	Deferred(Box<dyn FnOnce() -> BindResult<()>>),
}

#[derive(Default)]
struct Scheduler {
	queue: RefCell<VecDeque<Task>>,
	flushing: Cell<bool>,
}

thread_local! {
	static SCHEDULER: Scheduler = Scheduler::default();
}

/// Queues a notification for `subscriber`, replacing a pending one.
pub fn schedule(subscriber: &Rc<Subscriber>) {
	SCHEDULER.with(|scheduler| {
		let mut queue = scheduler.queue.borrow_mut();
		queue.retain(|task| !matches!(task, Task::Notify(pending) if Rc::ptr_eq(pending, subscriber)));
		queue.push_back(Task::Notify(Rc::clone(subscriber)));
	});
	trace!(property = subscriber.name(), "Notification scheduled");
}

/// Queues one-shot work to run during the next flush.
pub fn defer(task: impl FnOnce() -> BindResult<()> + 'static) {
	SCHEDULER.with(|scheduler| {
		scheduler
			.queue
			.borrow_mut()
			.push_back(Task::Deferred(Box::new(task)));
	});
}

/// Number of queued tasks.
pub fn pending_tasks() -> usize {
	SCHEDULER.with(|scheduler| scheduler.queue.borrow().len())
}

/// Returns `true` when `subscriber` has a pending notification.
pub fn is_scheduled(subscriber: &Rc<Subscriber>) -> bool {
	SCHEDULER.with(|scheduler| {
		scheduler
			.queue
			.borrow()
			.iter()
			.any(|task| matches!(task, Task::Notify(pending) if Rc::ptr_eq(pending, subscriber)))
	})
}

/// Runs queued tasks with the default task limit.
pub fn flush() -> BindResult<()> {
	flush_with_limit(DEFAULT_MAX_FLUSH_TASKS)
}

/// Runs queued tasks until the queue is empty or `limit` tasks have run.
///
/// A failing task does not stop the flush: every error is logged and the
/// first one is returned. Hitting the limit (typically an update that keeps
/// writing the properties it depends on) drops the remaining tasks with a
/// warning. A flush requested while flushing returns immediately; the outer
/// flush drains the queue.
pub fn flush_with_limit(limit: usize) -> BindResult<()> {
	if SCHEDULER.with(|scheduler| scheduler.flushing.replace(true)) {
		return Ok(());
	}
	let _flushing = FlushingGuard;

	let mut first_error = None;
	let mut ran = 0usize;
	loop {
		let Some(task) = SCHEDULER.with(|scheduler| scheduler.queue.borrow_mut().pop_front()) else {
			break;
		};
		if ran >= limit {
			let dropped = SCHEDULER.with(|scheduler| {
				let mut queue = scheduler.queue.borrow_mut();
				let dropped = queue.len() + 1;
				queue.clear();
				dropped
			});
			warn!(limit, dropped, "Flush limit reached, dropping pending tasks");
			break;
		}
		ran += 1;
		let result = match task {
			Task::Notify(subscriber) => {
				trace!(property = subscriber.name(), "Notifying observers");
				subscriber.update(None)
			}
			Task::Deferred(work) => work(),
		};
		if let Err(e) = result {
			error!(error = %e, "Scheduled task failed");
			first_error.get_or_insert(e);
		}
	}
	if ran > 0 {
		debug!(tasks = ran, "Flushed scheduled tasks");
	}
	first_error.map_or(Ok(()), Err)
}

struct FlushingGuard;

impl Drop for FlushingGuard {
	fn drop(&mut self) {
		let _ = SCHEDULER.try_with(|scheduler| scheduler.flushing.set(false));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::Node;
	use crate::error::BindError;
	use crate::reactive::ObserverSpec;

	fn counted_subscriber(name: &str, count: &Rc<Cell<usize>>) -> Rc<Subscriber> {
		let subscriber = Rc::new(Subscriber::new(name));
		let count = Rc::clone(count);
		subscriber.add(
			&ObserverSpec::new()
				.with_update(move |_| {
					count.set(count.get() + 1);
					Ok(())
				})
				.build(Node::element("p")),
		);
		subscriber
	}

	#[test]
	fn test_rescheduling_coalesces_notifications() {
		let count = Rc::new(Cell::new(0));
		let subscriber = counted_subscriber("count", &count);

		schedule(&subscriber);
		schedule(&subscriber);
		schedule(&subscriber);
		assert_eq!(pending_tasks(), 1);
		assert_eq!(count.get(), 0);

		flush().unwrap();

		assert_eq!(count.get(), 1);
		assert!(!is_scheduled(&subscriber));
	}

	#[test]
	fn test_rescheduling_moves_subscriber_to_back() {
		let order = Rc::new(RefCell::new(Vec::new()));
		let first = Rc::new(Subscriber::new("first"));
		let second = Rc::new(Subscriber::new("second"));
		for subscriber in [&first, &second] {
			let order = Rc::clone(&order);
			let name = subscriber.name().to_string();
			subscriber.add(
				&ObserverSpec::new()
					.with_update(move |_| {
						order.borrow_mut().push(name.clone());
						Ok(())
					})
					.build(Node::element("p")),
			);
		}

		schedule(&first);
		schedule(&second);
		schedule(&first);
		flush().unwrap();

		assert_eq!(*order.borrow(), vec!["second".to_string(), "first".to_string()]);
	}

	#[test]
	fn test_flush_runs_tasks_queued_while_flushing_and_reports_first_error() {
		let count = Rc::new(Cell::new(0));
		let subscriber = counted_subscriber("late", &count);
		defer(|| Err(BindError::InvalidStyle("a".into())));
		defer(move || {
			schedule(&subscriber);
			Ok(())
		});
		defer(|| Err(BindError::InvalidStyle("b".into())));

		let result = flush();

		assert_eq!(result, Err(BindError::InvalidStyle("a".into())));
		assert_eq!(count.get(), 1);
		assert_eq!(pending_tasks(), 0);
	}

	#[test]
	fn test_flush_limit_drops_runaway_tasks() {
		fn requeue() -> BindResult<()> {
			defer(requeue);
			Ok(())
		}
		defer(requeue);

		flush_with_limit(5).unwrap();

		assert_eq!(pending_tasks(), 0);
	}
}
