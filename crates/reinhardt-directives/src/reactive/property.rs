//! Reactive properties: tracked reads, coerced writes, coalesced notification.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use tracing::trace;

use super::scheduler;
use super::stack::current_observer;
use super::subscriber::Subscriber;
use crate::error::{BindError, BindResult};
use crate::value::{Date, List, Map, Notifier, Value};

/// Semantic type of a property, deciding how writes are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
	/// Values are stored as written
	None,
	/// `"on"`/`"1"` and `"off"`/`"0"` strings, truthiness otherwise
	Boolean,
	/// Numeric conversion
	Number,
	/// String conversion
	String,
	/// Date-like values update the stored date in place
	Date,
	/// JSON text or lists; contents are replaced in place
	List,
	/// JSON text or maps; entries are replaced in place
	Map,
}

impl SemanticType {
	/// Infers the semantic type from a default value.
	pub fn of(value: &Value) -> Self {
		match value {
			Value::Bool(_) => SemanticType::Boolean,
			Value::Number(_) => SemanticType::Number,
			Value::String(_) => SemanticType::String,
			Value::Date(_) => SemanticType::Date,
			Value::List(_) => SemanticType::List,
			Value::Map(_) => SemanticType::Map,
			Value::Undefined | Value::Null | Value::Node(_) => SemanticType::None,
		}
	}
}

/// A named, typed value whose reads are tracked and whose writes notify.
///
/// - Reading with [`get`](Self::get) while an observer is current registers
///   that observer with the property's [`Subscriber`].
/// - Writing with [`set`](Self::set) coerces the value per
///   [`SemanticType`] and queues one notification on the scheduler.
/// - A list or map stored in a `List`/`Map` property notifies on in-place
///   mutation too.
///
/// # Example
///
/// ```ignore
/// let tags = ReactiveProperty::new("tags", Value::list(["a"]), None);
/// tags.set(Value::from("[\"b\", \"c\"]"))?;
/// assert_eq!(tags.get_untracked(), Value::list(["b", "c"]));
/// ```
pub struct ReactiveProperty {
	name: String,
	semantic_type: SemanticType,
	value: RefCell<Value>,
	subscriber: Rc<Subscriber>,
	notifier: Notifier,
}

impl ReactiveProperty {
	/// Declares a property. Without an explicit type the type is inferred from `value`.
	///
	/// A list or map property whose initial value has the wrong shape starts empty.
	pub fn new(name: impl Into<String>, value: Value, semantic_type: Option<SemanticType>) -> Self {
		let name = name.into();
		let semantic_type = semantic_type.unwrap_or_else(|| SemanticType::of(&value));
		let subscriber = Rc::new(Subscriber::new(name.clone()));
		let notifier: Notifier = {
			let subscriber = Rc::downgrade(&subscriber);
			Rc::new(move || {
				if let Some(subscriber) = subscriber.upgrade() {
					scheduler::schedule(&subscriber);
				}
			})
		};
		let value = match (semantic_type, value) {
			(SemanticType::List, value @ Value::List(_)) => value,
			(SemanticType::List, _) => Value::List(List::new()),
			(SemanticType::Map, value @ Value::Map(_)) => value,
			(SemanticType::Map, _) => Value::Map(Map::new()),
			(_, value) => value,
		};
		let property = Self {
			name,
			semantic_type,
			value: RefCell::new(Value::Undefined),
			subscriber,
			notifier,
		};
		property.store(value);
		property
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn semantic_type(&self) -> SemanticType {
		self.semantic_type
	}

	pub fn subscriber(&self) -> &Rc<Subscriber> {
		&self.subscriber
	}

	/// Reads the value, registering the current observer as a dependent.
	pub fn get(&self) -> Value {
		if let Some(observer) = current_observer() {
			self.subscriber.add(&observer);
		}
		self.get_untracked()
	}

	/// Reads the value without tracking.
	pub fn get_untracked(&self) -> Value {
		self.value.borrow().clone()
	}

	/// Writes a value, coercing it per the semantic type, and schedules one
	/// notification.
	///
	/// # Errors
	///
	/// Returns [`BindError::InvalidValue`] when a list, map or date property
	/// receives a value of the wrong shape. The stored value is unchanged and
	/// nothing is scheduled.
	pub fn set(&self, value: Value) -> BindResult<()> {
		trace!(property = %self.name, value = ?value, "Writing property");
		match self.semantic_type {
			SemanticType::Boolean => {
				let flag = match &value {
					Value::String(text) if text == "on" || text == "1" => true,
					Value::String(text) if text == "off" || text == "0" => false,
					other => other.is_truthy(),
				};
				self.store(Value::Bool(flag));
			}
			SemanticType::Number => self.store(Value::Number(value.to_number())),
			SemanticType::String => self.store(Value::String(value.to_display_string())),
			SemanticType::Date => {
				let instant = Date::instant_of(&value).ok_or_else(|| self.invalid(&value))?;
				let current = self.get_untracked();
				match current {
					Value::Date(date) => date.set_time(instant),
					_ => self.store(Value::Date(Date::new(instant))),
				}
			}
			SemanticType::List => {
				let value = parse_json(value);
				let Value::List(current) = self.get_untracked() else {
					return Err(self.invalid(&value));
				};
				match value {
					Value::List(list) if list.ptr_eq(&current) => {}
					Value::List(list) if list.is_observed() => self.store(Value::List(list)),
					// The container notifies through the installed hook
					Value::List(list) => current.replace_all(list.to_vec()),
					other if !other.is_truthy() => current.clear(),
					other => return Err(self.invalid(&other)),
				}
			}
			SemanticType::Map => {
				let value = parse_json(value);
				let Value::Map(current) = self.get_untracked() else {
					return Err(self.invalid(&value));
				};
				match value {
					Value::Map(map) if map.ptr_eq(&current) => {}
					Value::Map(map) if map.is_observed() => self.store(Value::Map(map)),
					Value::Map(map) => current.replace_all(map.entries()),
					other if !other.is_truthy() => current.clear(),
					other => return Err(self.invalid(&other)),
				}
			}
			SemanticType::None => self.store(value),
		}
		scheduler::schedule(&self.subscriber);
		Ok(())
	}

	/// Replaces the stored value, moving the write hook from the old
	/// container to the new one.
	fn store(&self, value: Value) {
		let previous = self.value.replace(value.clone());
		match previous {
			Value::List(list) if !matches!(&value, Value::List(new) if new.ptr_eq(&list)) => {
				list.unobserve(&self.notifier);
			}
			Value::Map(map) if !matches!(&value, Value::Map(new) if new.ptr_eq(&map)) => {
				map.unobserve(&self.notifier);
			}
			_ => {}
		}
		match (&value, self.semantic_type) {
			(Value::List(list), SemanticType::List) => list.observe(Rc::clone(&self.notifier)),
			(Value::Map(map), SemanticType::Map) => map.observe(Rc::clone(&self.notifier)),
			_ => {}
		}
	}

	/// Detaches the write hook from a stored container.
	pub(crate) fn release(&self) {
		match &*self.value.borrow() {
			Value::List(list) => list.unobserve(&self.notifier),
			Value::Map(map) => map.unobserve(&self.notifier),
			_ => {}
		}
	}

	fn invalid(&self, value: &Value) -> BindError {
		BindError::InvalidValue {
			name: self.name.clone(),
			value: serde_json::to_string(&value.to_json()).unwrap_or_default(),
		}
	}
}

/// Decodes JSON text; other values pass through.
fn parse_json(value: Value) -> Value {
	match value {
		Value::String(text) => Value::from_json_text(&text),
		other => other,
	}
}

impl fmt::Debug for ReactiveProperty {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReactiveProperty")
			.field("name", &self.name)
			.field("semantic_type", &self.semantic_type)
			.field("value", &*self.value.borrow())
			.finish()
	}
}
