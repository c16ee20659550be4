//! Reactive properties and dependency tracking.
//!
//! The pieces fit together as follows:
//!
//! 1. A directive attaches an [`Observer`] through the binding engine, which
//!    pushes it onto the thread's [`DependencyStack`] while its `commit` and
//!    first `update` run.
//! 2. Every [`ReactiveProperty::get`] performed meanwhile registers the
//!    current observer with that property's [`Subscriber`].
//! 3. [`ReactiveProperty::set`] (or an in-place mutation of a list or map it
//!    holds) queues the subscriber on the [`scheduler`]. Queuing an already
//!    queued subscriber moves it to the back, so a burst of writes produces a
//!    single notification.
//! 4. [`scheduler::flush`] re-runs the queued subscribers' observers.
//!
//! ## Example
//!
//! ```ignore
//! let count = ReactiveProperty::new("count", Value::from(0), None);
//! count.set(Value::from(1))?;
//! count.set(Value::from(2))?;
//! // Observers of `count` run once, seeing 2
//! scheduler::flush()?;
//! ```

pub mod property;
pub mod scheduler;
pub mod stack;
pub mod subscriber;

pub use property::{ReactiveProperty, SemanticType};
pub use stack::{DependencyGuard, DependencyStack, current_observer, dependency_depth};
pub use subscriber::{Observer, ObserverSpec, RollBackFn, Subscriber, UpdateFn};
