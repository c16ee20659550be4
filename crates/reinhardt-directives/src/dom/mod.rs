//! Live node tree the binding engine mutates in place.
//!
//! A [`Node`] is a cheap reference-counted handle; equality is identity, so two
//! handles compare equal only when they refer to the same node. Parents are
//! held weakly and children strongly, which means a detached subtree lives
//! exactly as long as some handle (an observer, a directive's clone list or
//! the caller) keeps it.
//!
//! The tree offers the subset of document APIs the directives need:
//!
//! - structure: [`Node::append_child`], [`Node::insert_before`],
//!   [`Node::before`], [`Node::remove`], [`Node::clone_node`]
//! - attributes, text and markup: [`Node::set_attribute`],
//!   [`Node::set_text_content`], [`Node::set_inner_html`]
//! - element state: class list, inline style, `hidden`, form control values
//! - events: [`Node::add_event_listener`], [`Node::dispatch_event`]
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_directives::dom::{Node, parse_fragment};
//!
//! let fragment = parse_fragment(r#"<ul><li class="item">one</li></ul>"#);
//! let list = fragment.first_child().unwrap();
//! let item = list.first_child().unwrap();
//!
//! item.add_class("active");
//! assert_eq!(list.outer_html(), r#"<ul><li class="item active">one</li></ul>"#);
//! ```

mod element;
mod event;
mod markup;

use core::cell::RefCell;
use core::fmt;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

pub use element::ControlType;
pub use event::{Event, EventListener};
pub use markup::{VOID_ELEMENTS, parse_fragment};

use crate::component::{Component, WeakComponent};
use crate::value::Value;

/// Kind of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	/// Element with a tag name and attributes
	Element,
	/// Character data
	Text,
	/// Comment, used by structural directives as position markers
	Comment,
	/// Parentless container whose children move when it is inserted
	Fragment,
}

/// Mutable state of form controls that shadows their attributes once written.
#[derive(Debug, Clone, Default)]
struct ControlState {
	value: Option<String>,
	checked: Option<bool>,
	selected: Option<bool>,
}

struct ElementData {
	tag: String,
	attributes: RefCell<Vec<(String, String)>>,
	controls: RefCell<ControlState>,
	properties: RefCell<BTreeMap<String, Value>>,
	/// Content fragment of a `<template>` element
	content: Option<Node>,
	/// Nodes projected into a `<slot>` element
	assigned: RefCell<Option<Vec<Node>>>,
	/// Component mounted on this element
	component: RefCell<Option<WeakComponent>>,
}

enum NodeData {
	Element(ElementData),
	Text(RefCell<String>),
	Comment(RefCell<String>),
	Fragment,
}

struct NodeInner {
	data: NodeData,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	listeners: RefCell<Vec<(String, EventListener)>>,
}

/// Handle to a node in the live tree.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
	fn with_data(data: NodeData) -> Self {
		Self(Rc::new(NodeInner {
			data,
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			listeners: RefCell::new(Vec::new()),
		}))
	}

	/// Creates an element. The tag name is lowercased; `<template>` elements
	/// receive their own content fragment.
	pub fn element(tag: &str) -> Self {
		let tag = tag.to_ascii_lowercase();
		let content = (tag == "template").then(Node::fragment);
		Self::with_data(NodeData::Element(ElementData {
			tag,
			attributes: RefCell::new(Vec::new()),
			controls: RefCell::new(ControlState::default()),
			properties: RefCell::new(BTreeMap::new()),
			content,
			assigned: RefCell::new(None),
			component: RefCell::new(None),
		}))
	}

	/// Creates a text node.
	pub fn text(data: impl Into<String>) -> Self {
		Self::with_data(NodeData::Text(RefCell::new(data.into())))
	}

	/// Creates a comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::with_data(NodeData::Comment(RefCell::new(data.into())))
	}

	/// Creates an empty fragment.
	pub fn fragment() -> Self {
		Self::with_data(NodeData::Fragment)
	}

	pub fn kind(&self) -> NodeKind {
		match &self.0.data {
			NodeData::Element(_) => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::Comment(_) => NodeKind::Comment,
			NodeData::Fragment => NodeKind::Fragment,
		}
	}

	pub fn is_element(&self) -> bool {
		matches!(self.0.data, NodeData::Element(_))
	}

	pub fn is_text(&self) -> bool {
		matches!(self.0.data, NodeData::Text(_))
	}

	pub fn is_comment(&self) -> bool {
		matches!(self.0.data, NodeData::Comment(_))
	}

	pub fn is_fragment(&self) -> bool {
		matches!(self.0.data, NodeData::Fragment)
	}

	/// Lowercase tag name, or an empty string for non-element nodes.
	pub fn tag_name(&self) -> &str {
		match &self.0.data {
			NodeData::Element(element) => &element.tag,
			_ => "",
		}
	}

	/// Returns `true` for elements whose tag name contains a hyphen.
	pub fn is_custom_element(&self) -> bool {
		self.tag_name().contains('-')
	}

	fn element_data(&self) -> Option<&ElementData> {
		match &self.0.data {
			NodeData::Element(element) => Some(element),
			_ => None,
		}
	}

	/// Character data of a text or comment node.
	pub fn data(&self) -> Option<String> {
		match &self.0.data {
			NodeData::Text(data) | NodeData::Comment(data) => Some(data.borrow().clone()),
			_ => None,
		}
	}

	/// Returns the parent node, if attached.
	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// Returns a snapshot of the child nodes.
	pub fn children(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	/// Returns the element children only.
	pub fn element_children(&self) -> Vec<Node> {
		self.0
			.children
			.borrow()
			.iter()
			.filter(|child| child.is_element())
			.cloned()
			.collect()
	}

	pub fn first_child(&self) -> Option<Node> {
		self.0.children.borrow().first().cloned()
	}

	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	fn index_in_parent(&self) -> Option<(Node, usize)> {
		let parent = self.parent()?;
		let index = parent.0.children.borrow().iter().position(|child| child == self)?;
		Some((parent, index))
	}

	/// Returns the sibling following this node.
	pub fn next_sibling(&self) -> Option<Node> {
		let (parent, index) = self.index_in_parent()?;
		parent.0.children.borrow().get(index + 1).cloned()
	}

	/// Returns the first element sibling following this node.
	pub fn next_element_sibling(&self) -> Option<Node> {
		let (parent, index) = self.index_in_parent()?;
		parent
			.0
			.children
			.borrow()
			.iter()
			.skip(index + 1)
			.find(|sibling| sibling.is_element())
			.cloned()
	}

	/// Returns `true` when `other` is this node or one of its descendants.
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node == *self {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Returns the topmost ancestor (the node itself when detached).
	pub fn root(&self) -> Node {
		let mut node = self.clone();
		while let Some(parent) = node.parent() {
			node = parent;
		}
		node
	}

	/// Returns every descendant in document order, excluding the node itself.
	pub fn descendants(&self) -> Vec<Node> {
		let mut nodes = Vec::new();
		let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
		while let Some(node) = stack.pop() {
			stack.extend(node.children().into_iter().rev());
			nodes.push(node);
		}
		nodes
	}

	/// Returns descendant elements with the given tag name.
	pub fn elements_by_tag(&self, tag: &str) -> Vec<Node> {
		self.descendants()
			.into_iter()
			.filter(|node| node.tag_name() == tag)
			.collect()
	}

	/// Returns the first descendant element matching `predicate`.
	pub fn find(&self, predicate: impl Fn(&Node) -> bool) -> Option<Node> {
		self.descendants()
			.into_iter()
			.find(|node| node.is_element() && predicate(node))
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.children.borrow_mut().retain(|child| child != self);
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}

	/// Appends a child, moving it from its previous parent. Appending a
	/// fragment moves the fragment's children instead.
	pub fn append_child(&self, child: &Node) {
		self.insert_before(child, None);
	}

	/// Inserts `child` before `reference`, or appends when `reference` is
	/// `None` or not a child of this node.
	///
	/// Inserting a node into its own subtree is ignored.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if child.contains(self) {
			return;
		}
		if child.is_fragment() {
			for grandchild in child.children() {
				self.insert_before(&grandchild, reference);
			}
			return;
		}
		child.detach();
		{
			let mut children = self.0.children.borrow_mut();
			let index = reference
				.and_then(|reference| children.iter().position(|existing| existing == reference))
				.unwrap_or(children.len());
			children.insert(index, child.clone());
		}
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
	}

	/// Inserts `node` immediately before this node. No-op when this node is detached.
	pub fn before(&self, node: &Node) {
		if let Some(parent) = self.parent() {
			parent.insert_before(node, Some(self));
		}
	}

	/// Detaches the node from its parent.
	pub fn remove(&self) {
		self.detach();
	}

	/// Removes every child.
	pub fn clear_children(&self) {
		for child in self.children() {
			child.detach();
		}
	}

	/// Copies the node. Attributes and form control state are copied;
	/// listeners, properties and mounted components are not.
	pub fn clone_node(&self, deep: bool) -> Node {
		let copy = match &self.0.data {
			NodeData::Element(element) => {
				let copy = Node::element(&element.tag);
				if let Some(target) = copy.element_data() {
					*target.attributes.borrow_mut() = element.attributes.borrow().clone();
					*target.controls.borrow_mut() = element.controls.borrow().clone();
					if let (Some(source), Some(content), true) =
						(&element.content, &target.content, deep)
					{
						for child in source.children() {
							content.append_child(&child.clone_node(true));
						}
					}
				}
				copy
			}
			NodeData::Text(data) => Node::text(data.borrow().clone()),
			NodeData::Comment(data) => Node::comment(data.borrow().clone()),
			NodeData::Fragment => Node::fragment(),
		};
		if deep {
			for child in self.children() {
				copy.append_child(&child.clone_node(true));
			}
		}
		copy
	}

	/// Content fragment of a `<template>` element.
	pub fn content(&self) -> Option<Node> {
		self.element_data().and_then(|element| element.content.clone())
	}

	/// Nodes projected into this `<slot>`, if any have been assigned.
	pub fn assigned_nodes(&self) -> Option<Vec<Node>> {
		self.element_data()
			.and_then(|element| element.assigned.borrow().clone())
	}

	/// Projects `nodes` into this `<slot>` element.
	pub fn assign_nodes(&self, nodes: Vec<Node>) {
		if let Some(element) = self.element_data() {
			*element.assigned.borrow_mut() = Some(nodes);
		}
	}

	/// Children the binding engine walks: assigned nodes of a slot with
	/// projected content, raw children otherwise.
	pub fn effective_children(&self) -> Vec<Node> {
		match self.assigned_nodes() {
			Some(nodes) if self.tag_name() == "slot" && !nodes.is_empty() => nodes,
			_ => self.children(),
		}
	}

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.element_data().and_then(|element| {
			element
				.attributes
				.borrow()
				.iter()
				.find(|(attribute, _)| attribute == name)
				.map(|(_, value)| value.clone())
		})
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.element_data().is_some_and(|element| {
			element
				.attributes
				.borrow()
				.iter()
				.any(|(attribute, _)| attribute == name)
		})
	}

	/// Sets an attribute, keeping its position when it already exists.
	pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
		if let Some(element) = self.element_data() {
			let value = value.into();
			let mut attributes = element.attributes.borrow_mut();
			match attributes.iter_mut().find(|(attribute, _)| attribute == name) {
				Some(entry) => entry.1 = value,
				None => attributes.push((name.to_string(), value)),
			}
		}
	}

	/// Removes an attribute and returns its previous value.
	pub fn remove_attribute(&self, name: &str) -> Option<String> {
		let element = self.element_data()?;
		let mut attributes = element.attributes.borrow_mut();
		let index = attributes.iter().position(|(attribute, _)| attribute == name)?;
		Some(attributes.remove(index).1)
	}

	/// Attribute names in document order.
	pub fn attribute_names(&self) -> Vec<String> {
		self.element_data()
			.map(|element| {
				element
					.attributes
					.borrow()
					.iter()
					.map(|(name, _)| name.clone())
					.collect()
			})
			.unwrap_or_default()
	}

	/// Concatenated text of the node and its descendants (comments excluded).
	pub fn text_content(&self) -> String {
		match &self.0.data {
			NodeData::Text(data) | NodeData::Comment(data) => data.borrow().clone(),
			_ => self
				.descendants()
				.iter()
				.filter_map(|node| match &node.0.data {
					NodeData::Text(data) => Some(data.borrow().clone()),
					_ => None,
				})
				.collect(),
		}
	}

	/// Replaces the character data, or replaces the children with a single text node.
	pub fn set_text_content(&self, text: &str) {
		match &self.0.data {
			NodeData::Text(data) | NodeData::Comment(data) => *data.borrow_mut() = text.to_string(),
			_ => {
				self.clear_children();
				if !text.is_empty() {
					self.append_child(&Node::text(text));
				}
			}
		}
	}

	/// Serialized markup of the children.
	pub fn inner_html(&self) -> String {
		let mut output = String::new();
		let children = self.content().unwrap_or_else(|| self.clone()).children();
		for child in &children {
			markup::serialize(child, self.tag_name(), &mut output);
		}
		output
	}

	/// Serialized markup of the node itself.
	pub fn outer_html(&self) -> String {
		let mut output = String::new();
		let parent_tag = self.parent().map(|parent| parent.tag_name().to_string());
		markup::serialize(self, parent_tag.as_deref().unwrap_or_default(), &mut output);
		output
	}

	/// Replaces the children with parsed `markup`.
	pub fn set_inner_html(&self, markup: &str) {
		let target = self.content().unwrap_or_else(|| self.clone());
		target.clear_children();
		target.append_child(&parse_fragment(markup));
	}

	/// Component mounted on this element.
	pub fn component(&self) -> Option<Component> {
		self.element_data()
			.and_then(|element| element.component.borrow().as_ref().and_then(WeakComponent::upgrade))
	}

	pub(crate) fn attach_component(&self, component: &Component) {
		if let Some(element) = self.element_data() {
			*element.component.borrow_mut() = Some(component.downgrade());
		}
	}

	pub(crate) fn detach_component(&self) {
		if let Some(element) = self.element_data() {
			element.component.borrow_mut().take();
		}
	}

	/// Removes and returns a value assigned to the node's own property bag.
	pub(crate) fn take_own_property(&self, name: &str) -> Option<Value> {
		self.element_data()
			.and_then(|element| element.properties.borrow_mut().remove(name))
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Node {}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.data {
			NodeData::Element(element) => write!(f, "<{}>", element.tag),
			NodeData::Text(data) => write!(f, "#text {:?}", data.borrow()),
			NodeData::Comment(data) => write!(f, "<!--{}-->", data.borrow()),
			NodeData::Fragment => f.write_str("#fragment"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_insert_before_and_remove_keep_parent_links() {
		let list = Node::element("ul");
		let first = Node::element("li");
		let second = Node::element("li");
		list.append_child(&second);
		list.insert_before(&first, Some(&second));

		assert_eq!(list.children(), vec![first.clone(), second.clone()]);
		assert_eq!(first.next_element_sibling(), Some(second.clone()));

		first.remove();
		assert_eq!(first.parent(), None);
		assert_eq!(list.children(), vec![second]);
	}

	#[test]
	fn test_before_inserts_marker_in_front() {
		let parent = Node::element("div");
		let child = Node::element("span");
		parent.append_child(&child);
		let marker = Node::comment("x-if: visible");

		child.before(&marker);

		assert_eq!(parent.children(), vec![marker, child]);
	}

	#[test]
	fn test_appending_fragment_moves_its_children() {
		let fragment = parse_fragment("<b>1</b><i>2</i>");
		let parent = Node::element("p");

		parent.append_child(&fragment);

		assert_eq!(fragment.child_count(), 0);
		assert_eq!(parent.inner_html(), "<b>1</b><i>2</i>");
	}

	#[test]
	fn test_inserting_ancestor_into_descendant_is_ignored() {
		let outer = Node::element("div");
		let inner = Node::element("div");
		outer.append_child(&inner);

		inner.append_child(&outer);

		assert_eq!(outer.parent(), None);
		assert!(outer.contains(&inner));
	}

	#[test]
	fn test_clone_node_copies_attributes_but_not_identity() {
		let source = parse_fragment(r#"<li data-id="1"><span>a</span></li>"#)
			.first_child()
			.unwrap();

		let shallow = source.clone_node(false);
		let deep = source.clone_node(true);

		assert_ne!(deep, source);
		assert_eq!(shallow.child_count(), 0);
		assert_eq!(deep.outer_html(), source.outer_html());
	}

	#[rstest]
	#[case("<p>a<b>b</b><!--c--></p>", "ab")]
	#[case("<p></p>", "")]
	fn test_text_content(#[case] markup: &str, #[case] expected: &str) {
		let node = parse_fragment(markup).first_child().unwrap();
		assert_eq!(node.text_content(), expected);
	}

	#[test]
	fn test_set_text_content_replaces_children() {
		let node = parse_fragment("<p><b>old</b></p>").first_child().unwrap();
		node.set_text_content("new");
		assert_eq!(node.inner_html(), "new");
	}

	#[test]
	fn test_attribute_order_is_preserved_on_update() {
		let node = Node::element("a");
		node.set_attribute("href", "/");
		node.set_attribute("title", "home");
		node.set_attribute("href", "/index");

		assert_eq!(node.attribute_names(), vec!["href".to_string(), "title".to_string()]);
		assert_eq!(node.remove_attribute("href"), Some("/index".to_string()));
		assert!(!node.has_attribute("href"));
	}

	#[test]
	fn test_effective_children_prefer_assigned_slot_nodes() {
		let slot = Node::element("slot");
		let fallback = Node::text("fallback");
		slot.append_child(&fallback);
		assert_eq!(slot.effective_children(), vec![fallback]);

		let projected = Node::element("span");
		slot.assign_nodes(vec![projected.clone()]);
		assert_eq!(slot.effective_children(), vec![projected]);
	}
}
