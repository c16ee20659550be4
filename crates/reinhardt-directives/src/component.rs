//! Components: declared reactive properties bound to a rendered template.
//!
//! A [`ComponentDefinition`] describes a custom element tag: its template,
//! its properties with their defaults, its methods and its directive
//! configuration. A [`Component`] is one instance of a definition mounted
//! on a host element.
//!
//! ## Lifecycle
//!
//! 1. [`Component::new`] renders the template into the component's root
//!    fragment and links the component to its host node.
//! 2. [`Component::mount`] declares the properties, copies host attributes
//!    onto matching properties, projects host children into `<slot>`
//!    placeholders and binds the rendered tree.
//! 3. [`Component::unmount`] tears the tree down and drops the properties.
//!
//! Custom elements found while binding a tree are mounted as child
//! components when their tag has been registered with [`define_component`].
//!
//! ## Example
//!
//! ```ignore
//! let counter = ComponentDefinition::new("x-counter")
//!     .template("<button @click=\"count += 1\">${count}</button>")
//!     .property("count", 0);
//!
//! let component = Component::new(counter, Node::element("x-counter"));
//! component.mount()?;
//! component.set("count", Value::from(5))?;
//! component.flush()?;
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::attribute::text_to_property;
use crate::config::DirectiveConfig;
use crate::dom::{Event, Node, parse_fragment};
use crate::error::{BindError, BindResult};
use crate::expression::{Context, EvalResult, Evaluator, ExpressionEvaluator, Scope};
use crate::reactive::{Observer, ReactiveProperty, SemanticType, Subscriber, scheduler};
use crate::value::Value;

/// A component method callable from binding expressions.
pub type Method = Rc<dyn Fn(&Component, &[Value]) -> BindResult<Value>>;

#[derive(Clone)]
struct PropertyDeclaration {
	name: String,
	default: Value,
	semantic_type: Option<SemanticType>,
}

/// Blueprint of a custom element.
#[derive(Clone)]
pub struct ComponentDefinition {
	tag: String,
	template: String,
	properties: Vec<PropertyDeclaration>,
	methods: BTreeMap<String, Method>,
	config: DirectiveConfig,
	evaluator: Rc<dyn Evaluator>,
}

impl ComponentDefinition {
	/// Creates a definition for `tag` with a template that projects its children.
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into().to_ascii_lowercase(),
			template: "<slot></slot>".to_string(),
			properties: Vec::new(),
			methods: BTreeMap::new(),
			config: DirectiveConfig::default(),
			evaluator: Rc::new(ExpressionEvaluator::new()),
		}
	}

	/// Sets the markup rendered into each instance.
	pub fn template(mut self, markup: impl Into<String>) -> Self {
		self.template = markup.into();
		self
	}

	/// Declares a property whose semantic type is inferred from `default`.
	pub fn property(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
		self.declare(name.into(), default.into(), None)
	}

	/// Declares a property with an explicit semantic type.
	pub fn typed_property(
		self,
		name: impl Into<String>,
		default: impl Into<Value>,
		semantic_type: SemanticType,
	) -> Self {
		self.declare(name.into(), default.into(), Some(semantic_type))
	}

	fn declare(mut self, name: String, default: Value, semantic_type: Option<SemanticType>) -> Self {
		let declaration = PropertyDeclaration {
			name,
			default,
			semantic_type,
		};
		match self.properties.iter_mut().find(|existing| existing.name == declaration.name) {
			Some(existing) => *existing = declaration,
			None => self.properties.push(declaration),
		}
		self
	}

	/// Registers a method callable from expressions as `name(...)` or `this.name(...)`.
	pub fn method(
		mut self,
		name: impl Into<String>,
		method: impl Fn(&Component, &[Value]) -> BindResult<Value> + 'static,
	) -> Self {
		self.methods.insert(name.into(), Rc::new(method));
		self
	}

	/// Sets the directive configuration.
	pub fn config(mut self, config: DirectiveConfig) -> Self {
		self.config = config;
		self
	}

	/// Replaces the expression evaluator.
	pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
		self.evaluator = Rc::new(evaluator);
		self
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	/// Declared property names in declaration order.
	pub fn property_names(&self) -> Vec<&str> {
		self.properties
			.iter()
			.map(|declaration| declaration.name.as_str())
			.collect()
	}

	pub fn directive_config(&self) -> &DirectiveConfig {
		&self.config
	}
}

impl fmt::Debug for ComponentDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentDefinition")
			.field("tag", &self.tag)
			.field("properties", &self.property_names())
			.field("methods", &self.methods.keys().collect::<Vec<_>>())
			.field("config", &self.config)
			.finish()
	}
}

thread_local! {
	static DEFINITIONS: RefCell<HashMap<String, Rc<ComponentDefinition>>> = RefCell::new(HashMap::new());
}

/// Registers a definition under its tag so binding instantiates it for
/// matching custom elements.
///
/// # Errors
///
/// Returns [`BindError::Config`] when the tag is not a valid custom element
/// name, is already defined, or the definition's configuration is invalid.
pub fn define_component(definition: ComponentDefinition) -> BindResult<()> {
	definition.config.validate()?;
	let tag = definition.tag.clone();
	if !tag.contains('-') || tag.starts_with('-') {
		return Err(BindError::Config(format!(
			"custom element names must contain a hyphen: <{tag}>"
		)));
	}
	DEFINITIONS.with(|definitions| {
		let mut definitions = definitions.borrow_mut();
		if definitions.contains_key(&tag) {
			return Err(BindError::Config(format!("<{tag}> is already defined")));
		}
		definitions.insert(tag.clone(), Rc::new(definition));
		Ok(())
	})?;
	debug!(component = %tag, "Component defined");
	Ok(())
}

/// Returns `true` when a definition is registered for `tag`.
pub fn is_defined(tag: &str) -> bool {
	DEFINITIONS.with(|definitions| definitions.borrow().contains_key(&tag.to_ascii_lowercase()))
}

/// Definition registered for `tag`.
pub fn definition(tag: &str) -> Option<Rc<ComponentDefinition>> {
	DEFINITIONS.with(|definitions| definitions.borrow().get(&tag.to_ascii_lowercase()).cloned())
}

struct ComponentInner {
	definition: Rc<ComponentDefinition>,
	host: Node,
	root: Node,
	properties: RefCell<Vec<Rc<ReactiveProperty>>>,
	/// Observers that read none of the component's properties
	static_observers: RefCell<Vec<Observer>>,
	/// Nodes set up by the structural directive that owns them, skipped by the tree walk
	claimed: RefCell<Vec<Node>>,
	children: RefCell<Vec<Component>>,
	parent: RefCell<Option<WeakComponent>>,
	mounted: Cell<bool>,
}

/// A mounted (or mountable) instance of a [`ComponentDefinition`].
///
/// Cloning shares the instance.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

/// Non-owning handle to a [`Component`].
///
/// Directive closures hold this handle so the component's observers do not
/// keep the component alive.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
	pub fn upgrade(&self) -> Option<Component> {
		self.0.upgrade().map(Component)
	}

	/// Runs `f` with the component, or does nothing once it has been dropped.
	pub(crate) fn with<F>(&self, f: F) -> BindResult<()>
	where
		F: FnOnce(&Component) -> BindResult<()>,
	{
		match self.upgrade() {
			Some(component) => f(&component),
			None => Ok(()),
		}
	}
}

impl Component {
	/// Creates an instance on `host` and renders the template into its root.
	///
	/// The component is linked to the host node, so property reads and
	/// writes on the host go through the component once it is mounted.
	pub fn new(definition: impl Into<Rc<ComponentDefinition>>, host: Node) -> Self {
		let definition = definition.into();
		let root = Node::fragment();
		root.append_child(&parse_fragment(&definition.template));
		let component = Self(Rc::new(ComponentInner {
			definition,
			host,
			root,
			properties: RefCell::new(Vec::new()),
			static_observers: RefCell::new(Vec::new()),
			claimed: RefCell::new(Vec::new()),
			children: RefCell::new(Vec::new()),
			parent: RefCell::new(None),
			mounted: Cell::new(false),
		}));
		component.0.host.attach_component(&component);
		component
	}

	pub fn downgrade(&self) -> WeakComponent {
		WeakComponent(Rc::downgrade(&self.0))
	}

	pub fn ptr_eq(&self, other: &Component) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn definition(&self) -> &Rc<ComponentDefinition> {
		&self.0.definition
	}

	pub fn tag(&self) -> &str {
		&self.0.definition.tag
	}

	pub fn config(&self) -> &DirectiveConfig {
		&self.0.definition.config
	}

	/// Element the component is mounted on.
	pub fn host(&self) -> &Node {
		&self.0.host
	}

	/// Fragment holding the rendered template.
	pub fn root(&self) -> &Node {
		&self.0.root
	}

	pub fn is_mounted(&self) -> bool {
		self.0.mounted.get()
	}

	/// Enclosing component, when this one was mounted while binding another.
	pub fn parent(&self) -> Option<Component> {
		self.0.parent.borrow().as_ref().and_then(WeakComponent::upgrade)
	}

	/// Child components mounted while binding this component's tree.
	pub fn children(&self) -> Vec<Component> {
		self.0.children.borrow().clone()
	}

	/// Declares the properties and binds the rendered tree.
	///
	/// Mounting a mounted component does nothing.
	///
	/// # Errors
	///
	/// Fails when a pre-existing value or host attribute cannot be written
	/// to its property, or when binding the tree fails.
	pub fn mount(&self) -> BindResult<()> {
		if self.is_mounted() {
			return Ok(());
		}
		for declaration in &self.0.definition.properties {
			let property = Rc::new(ReactiveProperty::new(
				declaration.name.clone(),
				declaration.default.deep_clone(),
				declaration
					.semantic_type
					.or_else(|| Some(SemanticType::of(&declaration.default))),
			));
			if let Some(existing) = self.0.host.take_own_property(&declaration.name) {
				property.set(existing)?;
			}
			self.0.properties.borrow_mut().push(property);
		}
		self.0.mounted.set(true);

		for name in self.0.host.attribute_names() {
			let property = text_to_property(&name);
			if self.has_property(&property) {
				let value = self.0.host.get_attribute(&name).unwrap_or_default();
				self.set(&property, Value::String(value))?;
			}
		}

		self.project_children();
		let context = Context::new().with(
			"$parent",
			self.parent()
				.map_or(Value::Undefined, |parent| Value::Node(parent.host().clone())),
		);
		self.setup(&self.0.root, &context)?;
		debug!(
			component = %self.tag(),
			properties = self.0.properties.borrow().len(),
			observers = self.observer_count(),
			"Component mounted"
		);

		if let Some(parent) = self.parent() {
			let parent = parent.downgrade();
			let host = self.0.host.clone();
			scheduler::defer(move || parent.with(|parent| parent.force_update(Some(&host))));
		}
		Ok(())
	}

	/// Tears the rendered tree down and drops every property and observer.
	///
	/// Unmounting an unmounted component does nothing.
	pub fn unmount(&self) {
		if !self.is_mounted() {
			return;
		}
		self.tear_down(&self.0.root);
		for child in self.0.children.take() {
			child.unmount();
		}
		for observer in self.0.static_observers.take() {
			observer.roll_back();
		}
		self.0.claimed.borrow_mut().clear();
		for property in self.0.properties.take() {
			property.release();
			property.subscriber().clear();
		}
		self.0.mounted.set(false);
		debug!(component = %self.tag(), "Component unmounted");
	}

	/// Assigns host children to the `<slot>` placeholders of the rendered tree.
	///
	/// Named slots take the children whose `slot` attribute matches; the
	/// unnamed slot takes the rest.
	fn project_children(&self) {
		let children = self.0.host.children();
		for slot in self.0.root.elements_by_tag("slot") {
			let name = slot.get_attribute("name").filter(|name| !name.is_empty());
			let assigned = children
				.iter()
				.filter(|child| match (&name, child.get_attribute("slot")) {
					(Some(name), Some(slot)) => *name == slot,
					(None, None) => true,
					_ => false,
				})
				.cloned()
				.collect();
			slot.assign_nodes(assigned);
		}
	}

	/// Declares (or redeclares) a reactive property on this instance.
	///
	/// A redeclared property starts with a fresh subscriber.
	pub fn define(
		&self,
		name: impl Into<String>,
		value: impl Into<Value>,
		semantic_type: Option<SemanticType>,
	) -> Rc<ReactiveProperty> {
		let property = Rc::new(ReactiveProperty::new(name, value.into(), semantic_type));
		let mut properties = self.0.properties.borrow_mut();
		match properties.iter_mut().find(|existing| existing.name() == property.name()) {
			Some(existing) => {
				existing.release();
				*existing = Rc::clone(&property);
			}
			None => properties.push(Rc::clone(&property)),
		}
		property
	}

	pub fn has_property(&self, name: &str) -> bool {
		self.0
			.properties
			.borrow()
			.iter()
			.any(|property| property.name() == name)
	}

	pub fn property(&self, name: &str) -> Option<Rc<ReactiveProperty>> {
		self.0
			.properties
			.borrow()
			.iter()
			.find(|property| property.name() == name)
			.cloned()
	}

	/// Properties in declaration order.
	pub fn properties(&self) -> Vec<Rc<ReactiveProperty>> {
		self.0.properties.borrow().clone()
	}

	/// Reads a property, registering the current observer as a dependent.
	///
	/// Unknown names read as `undefined`.
	pub fn get(&self, name: &str) -> Value {
		self.property(name)
			.map_or(Value::Undefined, |property| property.get())
	}

	/// Writes a property.
	///
	/// # Errors
	///
	/// Returns [`BindError::UnknownProperty`] for undeclared names and
	/// [`BindError::InvalidValue`] when the value does not fit the property.
	pub fn set(&self, name: &str, value: Value) -> BindResult<()> {
		self.property(name)
			.ok_or_else(|| BindError::UnknownProperty(name.to_string()))?
			.set(value)
	}

	/// Subscriber of a property.
	pub fn subscriber(&self, name: &str) -> Option<Rc<Subscriber>> {
		self.property(name)
			.map(|property| Rc::clone(property.subscriber()))
	}

	/// Calls a registered method.
	///
	/// # Errors
	///
	/// Returns [`BindError::UnknownProperty`] when no method has that name,
	/// or the method's own error.
	pub fn call(&self, name: &str, arguments: &[Value]) -> BindResult<Value> {
		let method = self
			.0
			.definition
			.methods
			.get(name)
			.cloned()
			.ok_or_else(|| BindError::UnknownProperty(name.to_string()))?;
		method(self, arguments)
	}

	/// Dispatches a cancelable custom event on the host.
	///
	/// Returns `false` when a listener prevented the default action.
	pub fn dispatch_custom_event(&self, kind: &str, detail: Value) -> bool {
		let event = Event::new(kind).with_detail(detail).with_cancelable(true);
		self.0.host.dispatch_event(&event)
	}

	/// Runs pending notifications, bounded by the configured task limit.
	pub fn flush(&self) -> BindResult<()> {
		scheduler::flush_with_limit(self.config().max_flush_tasks)
	}

	/// Number of registered observer entries, across every subscriber plus
	/// the static observers.
	pub fn observer_count(&self) -> usize {
		let subscribed: usize = self
			.0
			.properties
			.borrow()
			.iter()
			.map(|property| property.subscriber().len())
			.sum();
		subscribed + self.0.static_observers.borrow().len()
	}

	/// Number of observer entries bound to `node`.
	pub fn observers_on(&self, node: &Node) -> usize {
		let subscribed: usize = self
			.0
			.properties
			.borrow()
			.iter()
			.map(|property| property.subscriber().count_for(node))
			.sum();
		subscribed
			+ self
				.0
				.static_observers
				.borrow()
				.iter()
				.filter(|observer| observer.object() == node)
				.count()
	}

	pub(crate) fn evaluator(&self) -> &dyn Evaluator {
		self.0.definition.evaluator.as_ref()
	}

	pub(crate) fn scope(&self) -> ComponentScope<'_> {
		ComponentScope { component: self }
	}

	pub(crate) fn static_observers(&self) -> &RefCell<Vec<Observer>> {
		&self.0.static_observers
	}

	/// Returns `true` when `observer` is registered with one of the properties.
	pub(crate) fn is_subscribed(&self, observer: &Observer) -> bool {
		self.0
			.properties
			.borrow()
			.iter()
			.any(|property| property.subscriber().contains(observer))
	}

	pub(crate) fn claim(&self, node: &Node) {
		let mut claimed = self.0.claimed.borrow_mut();
		if !claimed.contains(node) {
			claimed.push(node.clone());
		}
	}

	pub(crate) fn release_claim(&self, node: &Node) {
		self.0.claimed.borrow_mut().retain(|claimed| claimed != node);
	}

	pub(crate) fn is_claimed(&self, node: &Node) -> bool {
		self.0.claimed.borrow().contains(node)
	}

	pub(crate) fn adopt_child(&self, child: &Component) {
		*child.0.parent.borrow_mut() = Some(self.downgrade());
		let mut children = self.0.children.borrow_mut();
		if !children.iter().any(|existing| existing.ptr_eq(child)) {
			children.push(child.clone());
		}
	}

	pub(crate) fn release_child(&self, child: &Component) {
		self.0
			.children
			.borrow_mut()
			.retain(|existing| !existing.ptr_eq(child));
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component")
			.field("tag", &self.tag())
			.field("mounted", &self.is_mounted())
			.field("properties", &self.0.properties.borrow())
			.finish()
	}
}

/// [`Scope`] exposing a component's properties and methods to expressions.
pub(crate) struct ComponentScope<'a> {
	component: &'a Component,
}

impl Scope for ComponentScope<'_> {
	fn this(&self) -> Value {
		Value::Node(self.component.host().clone())
	}

	fn lookup(&self, name: &str) -> Option<Value> {
		self.component.property(name).map(|property| property.get())
	}

	fn assign(&self, name: &str, value: Value) -> Option<EvalResult<()>> {
		self.component
			.property(name)
			.map(|property| property.set(value).map_err(Into::into))
	}

	fn call(&self, name: &str, arguments: &[Value]) -> Option<EvalResult<Value>> {
		let method = self.component.0.definition.methods.get(name).cloned()?;
		Some(method(self.component, arguments).map_err(Into::into))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn counter() -> ComponentDefinition {
		ComponentDefinition::new("x-counter")
			.template("<span x-text=\"count\"></span>")
			.property("count", 0)
			.property("tags", Value::list(Vec::<Value>::new()))
			.property("userName", "anonymous")
			.method("reset", |component, _| {
				component.set("count", Value::from(0))?;
				Ok(Value::Undefined)
			})
	}

	#[test]
	fn test_mount_declares_properties_in_order() {
		let component = Component::new(counter(), Node::element("x-counter"));

		component.mount().unwrap();

		let names: Vec<String> = component
			.properties()
			.iter()
			.map(|property| property.name().to_string())
			.collect();
		assert_eq!(names, vec!["count", "tags", "userName"]);
		assert_eq!(component.get("count"), Value::from(0));
		assert_eq!(component.get("missing"), Value::Undefined);
	}

	#[test]
	fn test_host_values_win_over_defaults() {
		let host = Node::element("x-counter");
		host.set_property("count", Value::from(7)).unwrap();
		host.set_attribute("user-name", "ada");
		host.set_attribute("tags", "[\"a\"]");
		let component = Component::new(counter(), host.clone());

		component.mount().unwrap();

		assert_eq!(component.get("count"), Value::from(7));
		assert_eq!(component.get("userName"), Value::from("ada"));
		assert_eq!(component.get("tags"), Value::list(["a"]));
		assert_eq!(host.property("count"), Value::from(7));
	}

	#[test]
	fn test_defaults_are_not_shared_between_instances() {
		let definition = Rc::new(counter());
		let first = Component::new(Rc::clone(&definition), Node::element("x-counter"));
		let second = Component::new(definition, Node::element("x-counter"));
		first.mount().unwrap();
		second.mount().unwrap();

		if let Value::List(tags) = first.get("tags") {
			tags.push("only-first");
		}

		assert_eq!(second.get("tags"), Value::list(Vec::<Value>::new()));
	}

	#[test]
	fn test_set_unknown_property_fails() {
		let component = Component::new(counter(), Node::element("x-counter"));
		component.mount().unwrap();

		assert_eq!(
			component.set("nope", Value::from(1)),
			Err(BindError::UnknownProperty("nope".into()))
		);
	}

	#[test]
	fn test_call_method() {
		let component = Component::new(counter(), Node::element("x-counter"));
		component.mount().unwrap();
		component.set("count", Value::from(3)).unwrap();

		component.call("reset", &[]).unwrap();

		assert_eq!(component.get("count"), Value::from(0));
		assert!(component.call("launch", &[]).is_err());
	}

	#[test]
	fn test_unmount_clears_properties_and_observers() {
		let component = Component::new(counter(), Node::element("x-counter"));
		component.mount().unwrap();
		assert_eq!(component.observer_count(), 1);

		component.unmount();

		assert!(!component.is_mounted());
		assert!(component.properties().is_empty());
		assert_eq!(component.observer_count(), 0);
		assert_eq!(
			component.root().inner_html(),
			"<span x-text=\"count\"></span>"
		);
	}

	#[test]
	fn test_dispatch_custom_event_reports_prevented_default() {
		let component = Component::new(counter(), Node::element("x-counter"));
		let seen = Rc::new(RefCell::new(Value::Undefined));
		let listener: crate::dom::EventListener = {
			let seen = Rc::clone(&seen);
			Rc::new(move |event: &Event| {
				*seen.borrow_mut() = event.detail().clone();
				event.prevent_default();
			})
		};
		component.host().add_event_listener("saved", listener);

		assert!(!component.dispatch_custom_event("saved", Value::from(42)));
		assert_eq!(*seen.borrow(), Value::from(42));
		assert!(component.dispatch_custom_event("other", Value::Null));
	}

	#[rstest]
	#[case("counter")]
	#[case("-leading")]
	fn test_define_component_rejects_invalid_names(#[case] tag: &str) {
		let result = define_component(ComponentDefinition::new(tag));

		assert!(matches!(result, Err(BindError::Config(_))));
		assert!(!is_defined(tag));
	}

	#[test]
	fn test_define_component_registers_once() {
		define_component(counter()).unwrap();

		assert!(is_defined("X-Counter"));
		assert_eq!(definition("x-counter").unwrap().property_names().len(), 3);
		assert!(define_component(counter()).is_err());
	}

	#[test]
	fn test_project_children_by_slot_name() {
		let definition = ComponentDefinition::new("x-card")
			.template("<header><slot name=\"title\"></slot></header><slot></slot>");
		let host = Node::element("x-card");
		host.set_inner_html("<h1 slot=\"title\">T</h1><p>body</p>");
		let component = Component::new(definition, host);

		component.mount().unwrap();

		let slots = component.root().elements_by_tag("slot");
		let titles = slots[0].assigned_nodes().unwrap();
		let rest = slots[1].assigned_nodes().unwrap();
		assert_eq!(titles.len(), 1);
		assert_eq!(titles[0].tag_name(), "h1");
		assert_eq!(rest.len(), 1);
		assert_eq!(rest[0].tag_name(), "p");
	}
}
