//! Reinhardt Directives - reactive attribute bindings for a live node tree
//!
//! Components declare reactive properties and a template. Mounting a
//! component walks the template and attaches a directive to every `x-`
//! attribute and `${...}` text node; each directive records which properties
//! it read and is re-run when one of them is written.
//!
//! ## Architecture
//!
//! - [`reactive`]: dependency stack, subscribers, reactive properties and the notification scheduler
//! - [`value`]: the dynamic value model with observable lists and maps
//! - [`dom`]: an owned node tree with attributes, properties, events, markup parsing and serialization
//! - [`expression`]: the evaluator seam and the built-in expression language
//! - [`attribute`]: shorthand attribute normalization
//! - [`directives`]: the directive catalogue
//! - [`component`]: component definitions, registry and host lifecycle
//! - [`config`]: directive configuration
//!
//! The binding engine itself (`setup`, `tear_down`, `force_update`,
//! `observe`) lives on [`Component`].
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_directives::{Component, ComponentDefinition, Node, Value, flush};
//!
//! let counter = ComponentDefinition::new("x-counter")
//!     .template(r#"<button @click="count += 1">Clicked ${count} times</button>"#)
//!     .property("count", 0);
//!
//! let component = Component::new(counter, Node::element("x-counter"));
//! component.mount()?;
//!
//! component.set("count", Value::from(3))?;
//! component.set("count", Value::from(4))?;
//! // One notification, rendering the last write
//! flush()?;
//! assert_eq!(component.root().text_content(), "Clicked 4 times");
//! ```

pub mod attribute;
pub mod component;
pub mod config;
pub mod directives;
pub mod dom;
mod engine;
pub mod error;
pub mod expression;
pub mod reactive;
pub mod value;

pub use component::{Component, ComponentDefinition, WeakComponent, define_component, is_defined};
pub use config::DirectiveConfig;
pub use directives::{Directive, Flow};
pub use dom::{Event, Node};
pub use error::{BindError, BindResult};
pub use expression::{Context, EvalError, Evaluator, ExpressionEvaluator, Scope};
pub use reactive::scheduler::{defer, flush, flush_with_limit, pending_tasks};
pub use reactive::{Observer, ObserverSpec, ReactiveProperty, SemanticType, Subscriber};
pub use value::{Date, List, Map, Value};
