//! Dynamic values flowing between reactive properties, expressions and nodes.
//!
//! `Value` is deliberately loose: expressions compare, concatenate and test
//! truthiness the way template authors expect from a scripting language.
//!
//! ## Observable containers
//!
//! [`List`] and [`Map`] are shared handles (`Rc`) whose mutation methods call
//! every installed write-notification hook. A reactive property installs its
//! hook when it stores a container, so in-place mutation notifies the same
//! way reassignment does:
//!
//! ```ignore
//! let todos = component.get("todos")?;
//! if let Value::List(list) = todos {
//!     // Schedules exactly one notification for the "todos" property
//!     list.push("write tests");
//! }
//! ```
//!
//! [`Date`] is a shared cell so a write to a date-typed property mutates the
//! stored instance instead of replacing it.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use indexmap::IndexMap;

use crate::dom::Node;

/// Write-notification hook installed on an observable container.
pub(crate) type Notifier = Rc<dyn Fn()>;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
	/// Absence of a value (also the result of a failed evaluation)
	#[default]
	Undefined,
	/// Explicit null
	Null,
	/// Boolean
	Bool(bool),
	/// Double precision number
	Number(f64),
	/// Text
	String(String),
	/// Shared, in-place mutable date
	Date(Date),
	/// Observable ordered list
	List(List),
	/// Observable insertion-ordered map
	Map(Map),
	/// Live node reference
	Node(Node),
}

#[derive(Default)]
struct Notifiers(RefCell<Vec<Notifier>>);

impl Notifiers {
	fn add(&self, notifier: Notifier) {
		let mut notifiers = self.0.borrow_mut();
		if !notifiers.iter().any(|existing| Rc::ptr_eq(existing, &notifier)) {
			notifiers.push(notifier);
		}
	}

	fn remove(&self, notifier: &Notifier) {
		self.0
			.borrow_mut()
			.retain(|existing| !Rc::ptr_eq(existing, notifier));
	}

	fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}

	fn notify(&self) {
		// Snapshot so a hook may install or remove hooks
		let snapshot: Vec<Notifier> = self.0.borrow().clone();
		for notifier in snapshot {
			notifier();
		}
	}
}

#[derive(Default)]
struct ListInner {
	items: RefCell<Vec<Value>>,
	notifiers: Notifiers,
}

/// Observable list container.
///
/// Cloning a `List` clones the handle, not the items. Every mutation method
/// notifies the installed hooks once after the change has been applied.
#[derive(Clone, Default)]
pub struct List(Rc<ListInner>);

impl List {
	/// Largest number of `undefined` slots [`List::set`] pads in one write.
	pub const MAX_GAP: usize = 1024;

	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a list holding the given items.
	pub fn from_vec(items: Vec<Value>) -> Self {
		Self(Rc::new(ListInner {
			items: RefCell::new(items),
			notifiers: Notifiers::default(),
		}))
	}

	/// Returns the number of items.
	pub fn len(&self) -> usize {
		self.0.items.borrow().len()
	}

	/// Returns `true` when the list holds no items.
	pub fn is_empty(&self) -> bool {
		self.0.items.borrow().is_empty()
	}

	/// Returns a clone of the item at `index`.
	pub fn get(&self, index: usize) -> Option<Value> {
		self.0.items.borrow().get(index).cloned()
	}

	/// Returns a snapshot of the items.
	pub fn to_vec(&self) -> Vec<Value> {
		self.0.items.borrow().clone()
	}

	/// Returns the index of the first item loosely equal to `value`.
	pub fn position(&self, value: &Value) -> Option<usize> {
		self.0
			.items
			.borrow()
			.iter()
			.position(|item| item.loosely_equals(value))
	}

	/// Appends an item.
	pub fn push(&self, value: impl Into<Value>) {
		self.0.items.borrow_mut().push(value.into());
		self.0.notifiers.notify();
	}

	/// Removes and returns the last item.
	pub fn pop(&self) -> Option<Value> {
		let popped = self.0.items.borrow_mut().pop();
		if popped.is_some() {
			self.0.notifiers.notify();
		}
		popped
	}

	/// Inserts an item, clamping `index` to the list length.
	pub fn insert(&self, index: usize, value: impl Into<Value>) {
		{
			let mut items = self.0.items.borrow_mut();
			let index = index.min(items.len());
			items.insert(index, value.into());
		}
		self.0.notifiers.notify();
	}

	/// Removes and returns the item at `index`.
	pub fn remove(&self, index: usize) -> Option<Value> {
		let removed = {
			let mut items = self.0.items.borrow_mut();
			(index < items.len()).then(|| items.remove(index))
		};
		if removed.is_some() {
			self.0.notifiers.notify();
		}
		removed
	}

	/// Replaces the item at `index`, padding with `undefined` when the index
	/// lies past the end.
	///
	/// Returns `false`, leaving the list untouched, when `index` is more than
	/// [`List::MAX_GAP`] slots past the end.
	pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
		{
			let mut items = self.0.items.borrow_mut();
			if index.saturating_sub(items.len()) > Self::MAX_GAP {
				return false;
			}
			if index >= items.len() {
				items.resize(index + 1, Value::Undefined);
			}
			items[index] = value.into();
		}
		self.0.notifiers.notify();
		true
	}

	/// Keeps only the items for which `keep` returns `true`.
	///
	/// Notifies only when at least one item was removed.
	pub fn retain(&self, mut keep: impl FnMut(&Value) -> bool) {
		let changed = {
			let mut items = self.0.items.borrow_mut();
			let before = items.len();
			items.retain(|item| keep(item));
			items.len() != before
		};
		if changed {
			self.0.notifiers.notify();
		}
	}

	/// Removes every item.
	pub fn clear(&self) {
		self.0.items.borrow_mut().clear();
		self.0.notifiers.notify();
	}

	/// Replaces the contents while keeping the container identity.
	pub fn replace_all(&self, items: Vec<Value>) {
		*self.0.items.borrow_mut() = items;
		self.0.notifiers.notify();
	}

	/// Returns `true` when both handles point at the same container.
	pub fn ptr_eq(&self, other: &List) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Returns `true` when at least one write-notification hook is installed.
	pub fn is_observed(&self) -> bool {
		!self.0.notifiers.is_empty()
	}

	pub(crate) fn observe(&self, notifier: Notifier) {
		self.0.notifiers.add(notifier);
	}

	pub(crate) fn unobserve(&self, notifier: &Notifier) {
		self.0.notifiers.remove(notifier);
	}
}

impl fmt::Debug for List {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.items.borrow().iter()).finish()
	}
}

#[derive(Default)]
struct MapInner {
	entries: RefCell<IndexMap<String, Value>>,
	notifiers: Notifiers,
}

/// Observable map container preserving insertion order.
#[derive(Clone, Default)]
pub struct Map(Rc<MapInner>);

impl Map {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a map from ordered entries.
	///
	/// A duplicate key overwrites the earlier value but keeps its position.
	pub fn from_entries(entries: Vec<(String, Value)>) -> Self {
		Self(Rc::new(MapInner {
			entries: RefCell::new(entries.into_iter().collect()),
			notifiers: Notifiers::default(),
		}))
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.0.entries.borrow().len()
	}

	/// Returns `true` when the map holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.entries.borrow().is_empty()
	}

	/// Returns a clone of the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.0.entries.borrow().get(key).cloned()
	}

	/// Returns `true` when `key` is present.
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.entries.borrow().contains_key(key)
	}

	/// Returns the keys in insertion order.
	pub fn keys(&self) -> Vec<String> {
		self.0.entries.borrow().keys().cloned().collect()
	}

	/// Returns a snapshot of the entries in insertion order.
	pub fn entries(&self) -> Vec<(String, Value)> {
		self.0
			.entries
			.borrow()
			.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect()
	}

	/// Inserts or replaces the value stored under `key`.
	pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.entries.borrow_mut().insert(key.into(), value.into());
		self.0.notifiers.notify();
	}

	/// Removes and returns the value stored under `key`, keeping the order of
	/// the remaining entries.
	pub fn remove(&self, key: &str) -> Option<Value> {
		let removed = self.0.entries.borrow_mut().shift_remove(key);
		if removed.is_some() {
			self.0.notifiers.notify();
		}
		removed
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.0.entries.borrow_mut().clear();
		self.0.notifiers.notify();
	}

	/// Clears the map, then merges `entries` into it, keeping the container identity.
	pub fn replace_all(&self, entries: Vec<(String, Value)>) {
		{
			let mut target = self.0.entries.borrow_mut();
			target.clear();
			target.extend(entries);
		}
		self.0.notifiers.notify();
	}

	/// Returns `true` when both handles point at the same container.
	pub fn ptr_eq(&self, other: &Map) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Returns `true` when at least one write-notification hook is installed.
	pub fn is_observed(&self) -> bool {
		!self.0.notifiers.is_empty()
	}

	pub(crate) fn observe(&self, notifier: Notifier) {
		self.0.notifiers.add(notifier);
	}

	pub(crate) fn unobserve(&self, notifier: &Notifier) {
		self.0.notifiers.remove(notifier);
	}
}

impl fmt::Debug for Map {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.0.entries.borrow().iter())
			.finish()
	}
}

/// Shared date whose instant can be replaced in place.
#[derive(Clone)]
pub struct Date(Rc<Cell<DateTime<Utc>>>);

impl Date {
	/// Creates a date holding `instant`.
	pub fn new(instant: DateTime<Utc>) -> Self {
		Self(Rc::new(Cell::new(instant)))
	}

	/// Creates a date holding the current instant.
	pub fn now() -> Self {
		Self::new(Utc::now())
	}

	/// Returns the stored instant.
	pub fn get(&self) -> DateTime<Utc> {
		self.0.get()
	}

	/// Replaces the stored instant without changing identity.
	pub fn set_time(&self, instant: DateTime<Utc>) {
		self.0.set(instant);
	}

	/// Milliseconds since the Unix epoch.
	pub fn timestamp_millis(&self) -> i64 {
		self.0.get().timestamp_millis()
	}

	/// Returns `true` when both handles point at the same date.
	pub fn ptr_eq(&self, other: &Date) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
	pub fn parse(text: &str) -> Option<DateTime<Utc>> {
		let text = text.trim();
		if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
			return Some(instant.with_timezone(&Utc));
		}
		NaiveDate::parse_from_str(text, "%Y-%m-%d")
			.ok()
			.and_then(|date| date.and_hms_opt(0, 0, 0))
			.map(|naive| naive.and_utc())
	}

	/// Interprets a date-like value: a date, epoch milliseconds or a parseable string.
	pub fn instant_of(value: &Value) -> Option<DateTime<Utc>> {
		match value {
			Value::Date(date) => Some(date.get()),
			Value::Number(millis) if millis.is_finite() => {
				Utc.timestamp_millis_opt(*millis as i64).single()
			}
			Value::String(text) => Self::parse(text),
			_ => None,
		}
	}
}

impl fmt::Debug for Date {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Date({})", self.get().to_rfc3339())
	}
}

impl Value {
	/// Builds a list value from anything convertible into values.
	pub fn list<I, T>(items: I) -> Value
	where
		I: IntoIterator<Item = T>,
		T: Into<Value>,
	{
		Value::List(List::from_vec(items.into_iter().map(Into::into).collect()))
	}

	/// Builds a map value from `(key, value)` pairs.
	pub fn map<I, K, T>(entries: I) -> Value
	where
		I: IntoIterator<Item = (K, T)>,
		K: Into<String>,
		T: Into<Value>,
	{
		Value::Map(Map::from_entries(
			entries
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		))
	}

	/// Name of the value's runtime type, used in diagnostics.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Date(_) => "date",
			Value::List(_) => "list",
			Value::Map(_) => "map",
			Value::Node(_) => "node",
		}
	}

	/// Returns `true` for `undefined` and `null`.
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null)
	}

	/// Truthiness: empty strings, zero, NaN, `null`, `undefined` and `false` are falsy.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Undefined | Value::Null => false,
			Value::Bool(flag) => *flag,
			Value::Number(number) => *number != 0.0 && !number.is_nan(),
			Value::String(text) => !text.is_empty(),
			Value::Date(_) | Value::List(_) | Value::Map(_) | Value::Node(_) => true,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(number) => Some(*number),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&List> {
		match self {
			Value::List(list) => Some(list),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&Map> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_node(&self) -> Option<&Node> {
		match self {
			Value::Node(node) => Some(node),
			_ => None,
		}
	}

	/// String conversion following scripting-language rules.
	pub fn to_display_string(&self) -> String {
		match self {
			Value::Undefined => "undefined".to_string(),
			Value::Null => "null".to_string(),
			Value::Bool(flag) => flag.to_string(),
			Value::Number(number) => format_number(*number),
			Value::String(text) => text.clone(),
			Value::Date(date) => date.get().to_rfc3339(),
			Value::List(list) => list
				.to_vec()
				.iter()
				.map(|item| {
					if item.is_nullish() {
						String::new()
					} else {
						item.to_display_string()
					}
				})
				.collect::<Vec<_>>()
				.join(","),
			Value::Map(_) => "[object Object]".to_string(),
			Value::Node(node) => node.text_content(),
		}
	}

	/// Numeric conversion following scripting-language rules.
	pub fn to_number(&self) -> f64 {
		match self {
			Value::Undefined => f64::NAN,
			Value::Null => 0.0,
			Value::Bool(flag) => f64::from(u8::from(*flag)),
			Value::Number(number) => *number,
			Value::String(text) => parse_number(text),
			Value::Date(date) => date.timestamp_millis() as f64,
			Value::List(list) => match list.len() {
				0 => 0.0,
				1 => list.get(0).map_or(f64::NAN, |item| item.to_number()),
				_ => f64::NAN,
			},
			Value::Map(_) | Value::Node(_) => f64::NAN,
		}
	}

	/// Loose equality (`==`).
	pub fn loosely_equals(&self, other: &Value) -> bool {
		match (self, other) {
			(a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
			(Value::Bool(_), _) => Value::Number(self.to_number()).loosely_equals(other),
			(_, Value::Bool(_)) => self.loosely_equals(&Value::Number(other.to_number())),
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Number(a), Value::String(_)) => *a == other.to_number(),
			(Value::String(_), Value::Number(b)) => self.to_number() == *b,
			(Value::List(_) | Value::Map(_) | Value::Date(_), Value::String(b)) => {
				self.to_display_string() == *b
			}
			(Value::String(a), Value::List(_) | Value::Map(_) | Value::Date(_)) => {
				*a == other.to_display_string()
			}
			(Value::Date(_), Value::Number(b)) => self.to_number() == *b,
			(Value::Number(a), Value::Date(_)) => *a == other.to_number(),
			_ => self.strict_equals(other),
		}
	}

	/// Strict equality (`===`): containers, dates and nodes compare by identity.
	pub fn strict_equals(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Date(a), Value::Date(b)) => a.ptr_eq(b),
			(Value::List(a), Value::List(b)) => a.ptr_eq(b),
			(Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
			(Value::Node(a), Value::Node(b)) => a == b,
			_ => false,
		}
	}

	/// Lenient JSON decoding: non-empty text that parses as JSON becomes the
	/// decoded value, anything else stays a string.
	pub fn from_json_text(text: &str) -> Value {
		if text.is_empty() {
			return Value::String(String::new());
		}
		match serde_json::from_str::<serde_json::Value>(text) {
			Ok(json) => Value::from(json),
			Err(_) => Value::String(text.to_string()),
		}
	}

	/// Converts into JSON. Dates become RFC 3339 strings, nodes and `undefined` become null.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Undefined | Value::Null | Value::Node(_) => serde_json::Value::Null,
			Value::Bool(flag) => serde_json::Value::Bool(*flag),
			Value::Number(number) => serde_json::Number::from_f64(*number)
				.map_or(serde_json::Value::Null, serde_json::Value::Number),
			Value::String(text) => serde_json::Value::String(text.clone()),
			Value::Date(date) => serde_json::Value::String(date.get().to_rfc3339()),
			Value::List(list) => {
				serde_json::Value::Array(list.to_vec().iter().map(Value::to_json).collect())
			}
			Value::Map(map) => serde_json::Value::Object(
				map.entries()
					.into_iter()
					.map(|(key, value)| (key, value.to_json()))
					.collect(),
			),
		}
	}

	/// Copies containers and dates recursively; other values are cloned as is.
	///
	/// The copies carry no write-notification hooks.
	pub fn deep_clone(&self) -> Value {
		match self {
			Value::List(list) => Value::List(List::from_vec(
				list.to_vec().iter().map(Value::deep_clone).collect(),
			)),
			Value::Map(map) => Value::Map(Map::from_entries(
				map.entries()
					.into_iter()
					.map(|(key, value)| (key, value.deep_clone()))
					.collect(),
			)),
			Value::Date(date) => Value::Date(Date::new(date.get())),
			other => other.clone(),
		}
	}
}

/// Formats a number without a trailing `.0` for integral values.
pub(crate) fn format_number(number: f64) -> String {
	if number.is_nan() {
		"NaN".to_string()
	} else if number.is_infinite() {
		(if number > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
	} else if number == number.trunc() && number.abs() < 1e15 {
		format!("{}", number as i64)
	} else {
		format!("{number}")
	}
}

fn parse_number(text: &str) -> f64 {
	let text = text.trim();
	match text {
		"" => 0.0,
		"Infinity" | "+Infinity" => f64::INFINITY,
		"-Infinity" => f64::NEG_INFINITY,
		_ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
		_ => text.parse::<f64>().unwrap_or(f64::NAN),
	}
}

impl PartialEq for Value {
	/// Structural equality: containers compare by content, nodes by identity.
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::List(a), Value::List(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
			(Value::Map(a), Value::Map(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
			(Value::Date(a), Value::Date(b)) => a.get() == b.get(),
			_ => self.strict_equals(other),
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("undefined"),
			Value::Null => f.write_str("null"),
			Value::Bool(flag) => write!(f, "{flag}"),
			Value::Number(number) => f.write_str(&format_number(*number)),
			Value::String(text) => write!(f, "{text:?}"),
			Value::Date(date) => fmt::Debug::fmt(date, f),
			Value::List(list) => fmt::Debug::fmt(list, f),
			Value::Map(map) => fmt::Debug::fmt(map, f),
			Value::Node(node) => fmt::Debug::fmt(node, f),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_display_string())
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(flag) => Value::Bool(flag),
			serde_json::Value::Number(number) => Value::Number(number.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(text) => Value::String(text),
			serde_json::Value::Array(items) => {
				Value::List(List::from_vec(items.into_iter().map(Value::from).collect()))
			}
			serde_json::Value::Object(entries) => Value::Map(Map::from_entries(
				entries
					.into_iter()
					.map(|(key, value)| (key, Value::from(value)))
					.collect(),
			)),
		}
	}
}

impl From<bool> for Value {
	fn from(flag: bool) -> Self {
		Value::Bool(flag)
	}
}

impl From<f64> for Value {
	fn from(number: f64) -> Self {
		Value::Number(number)
	}
}

impl From<i32> for Value {
	fn from(number: i32) -> Self {
		Value::Number(f64::from(number))
	}
}

impl From<i64> for Value {
	fn from(number: i64) -> Self {
		Value::Number(number as f64)
	}
}

impl From<usize> for Value {
	fn from(number: usize) -> Self {
		Value::Number(number as f64)
	}
}

impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Value::String(text.to_string())
	}
}

impl From<String> for Value {
	fn from(text: String) -> Self {
		Value::String(text)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::List(List::from_vec(items))
	}
}

impl From<List> for Value {
	fn from(list: List) -> Self {
		Value::List(list)
	}
}

impl From<Map> for Value {
	fn from(map: Map) -> Self {
		Value::Map(map)
	}
}

impl From<Date> for Value {
	fn from(date: Date) -> Self {
		Value::Date(date)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(instant: DateTime<Utc>) -> Self {
		Value::Date(Date::new(instant))
	}
}

impl From<Node> for Value {
	fn from(node: Node) -> Self {
		Value::Node(node)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Undefined, false)]
	#[case(Value::Null, false)]
	#[case(Value::from(0), false)]
	#[case(Value::Number(f64::NAN), false)]
	#[case(Value::from(""), false)]
	#[case(Value::from("0"), true)]
	#[case(Value::from(3), true)]
	#[case(Value::list(Vec::<Value>::new()), true)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.is_truthy(), expected);
	}

	#[rstest]
	#[case(Value::from(3), "3")]
	#[case(Value::from(2.5), "2.5")]
	#[case(Value::Number(-0.0), "0")]
	#[case(Value::Number(f64::NAN), "NaN")]
	#[case(Value::list(["a", "b"]), "a,b")]
	#[case(Value::list([Value::from(1), Value::Null]), "1,")]
	#[case(Value::map([("a", 1)]), "[object Object]")]
	fn test_display_string(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(value.to_display_string(), expected);
	}

	#[rstest]
	#[case(Value::from("1"), Value::from(1), true)]
	#[case(Value::from(true), Value::from(1), true)]
	#[case(Value::from("y"), Value::from("y"), true)]
	#[case(Value::Null, Value::Undefined, true)]
	#[case(Value::Null, Value::from(0), false)]
	#[case(Value::from("x"), Value::from("y"), false)]
	fn test_loose_equality(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
		assert_eq!(a.loosely_equals(&b), expected);
	}

	#[test]
	fn test_strict_equality_uses_identity_for_containers() {
		let list = List::from_vec(vec![Value::from(1)]);
		let same = Value::List(list.clone());
		let copy = Value::list([1]);

		assert!(Value::List(list).strict_equals(&same));
		assert!(!same.strict_equals(&copy));
		assert_eq!(same, copy);
	}

	#[rstest]
	#[case("[3,4,5]", Value::list([3, 4, 5]))]
	#[case("{\"a\":true}", Value::map([("a", true)]))]
	#[case("42", Value::from(42))]
	#[case("hello", Value::from("hello"))]
	#[case("", Value::from(""))]
	fn test_from_json_text(#[case] text: &str, #[case] expected: Value) {
		assert_eq!(Value::from_json_text(text), expected);
	}

	#[test]
	fn test_list_mutations_notify_each_hook_once() {
		let list = List::new();
		let count = Rc::new(Cell::new(0));
		let hook: Notifier = {
			let count = Rc::clone(&count);
			Rc::new(move || count.set(count.get() + 1))
		};
		list.observe(Rc::clone(&hook));
		list.observe(Rc::clone(&hook));

		list.push(1);
		list.insert(0, 0);
		assert!(list.set(1, 5));
		assert_eq!(list.remove(9), None);

		assert_eq!(count.get(), 3);
		assert_eq!(list.to_vec(), vec![Value::from(0), Value::from(5)]);

		list.unobserve(&hook);
		list.clear();
		assert_eq!(count.get(), 3);
		assert!(!list.is_observed());
	}

	#[rstest]
	#[case(List::MAX_GAP + 2, 2 + List::MAX_GAP + 1)]
	#[case(List::MAX_GAP + 3, 2)]
	#[case(usize::MAX, 2)]
	fn test_list_set_bounds_padding(#[case] index: usize, #[case] expected_len: usize) {
		// Arrange
		let list = List::from_vec(vec![Value::from(1), Value::from(2)]);
		let count = Rc::new(Cell::new(0));
		list.observe({
			let count = Rc::clone(&count);
			Rc::new(move || count.set(count.get() + 1))
		});

		// Act
		let stored = list.set(index, "far");

		// Assert
		assert_eq!(stored, expected_len > 2);
		assert_eq!(list.len(), expected_len);
		assert_eq!(count.get(), usize::from(stored));
	}

	#[test]
	fn test_large_map_keeps_insertion_order_and_first_position_of_duplicates() {
		// Arrange
		let mut entries: Vec<(String, Value)> =
			(0..5000).rev().map(|n| (format!("k{n}"), Value::from(n))).collect();
		entries.push(("k4999".into(), Value::from("last")));

		// Act
		let map = Map::from_entries(entries);
		map.insert("k0", "updated");
		assert_eq!(map.remove("k2500"), Some(Value::from(2500)));

		// Assert
		let keys = map.keys();
		assert_eq!(map.len(), 4999);
		assert_eq!(keys.first().map(String::as_str), Some("k4999"));
		assert_eq!(keys.last().map(String::as_str), Some("k0"));
		assert_eq!(keys[2498], "k2501");
		assert_eq!(keys[2499], "k2499");
		assert_eq!(map.get("k4999"), Some(Value::from("last")));
		assert_eq!(map.get("k0"), Some(Value::from("updated")));
	}

	#[test]
	fn test_map_replace_all_keeps_identity_and_order() {
		let map = Map::from_entries(vec![("b".into(), Value::from(1))]);
		let alias = map.clone();

		map.replace_all(vec![
			("z".into(), Value::from(1)),
			("a".into(), Value::from(2)),
		]);

		assert!(alias.ptr_eq(&map));
		assert_eq!(alias.keys(), vec!["z".to_string(), "a".to_string()]);
		assert_eq!(alias.get("b"), None);
	}

	#[test]
	fn test_deep_clone_detaches_containers() {
		let original = Value::map([("tags", Value::list(["a"]))]);
		let copy = original.deep_clone();

		if let Some(Value::List(tags)) = copy.as_map().and_then(|map| map.get("tags")) {
			tags.push("b");
		}

		assert_eq!(original.to_json(), serde_json::json!({ "tags": ["a"] }));
		assert_eq!(copy.to_json(), serde_json::json!({ "tags": ["a", "b"] }));
	}

	#[rstest]
	#[case("2024-03-01", 1_709_251_200_000)]
	#[case("2024-03-01T00:00:01Z", 1_709_251_201_000)]
	fn test_date_parse(#[case] text: &str, #[case] millis: i64) {
		let instant = Date::parse(text).unwrap();
		assert_eq!(instant.timestamp_millis(), millis);
	}
}
