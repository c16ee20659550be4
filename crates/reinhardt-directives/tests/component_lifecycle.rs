//! Integration tests for component definitions, nesting and host lifecycle

use reinhardt_directives::{
	BindError, Component, ComponentDefinition, DirectiveConfig, Event, Node, Value,
	define_component, flush, is_defined, pending_tasks,
};
use rstest::rstest;

fn mount_parent(tag: &str, child: &str, template: &str) -> Component {
	define_component(
		ComponentDefinition::new(child)
			.template("<b>${label}</b><i>${$parent.title}</i>")
			.property("label", ""),
	)
	.unwrap();
	let parent = Component::new(
		ComponentDefinition::new(tag)
			.template(template)
			.property("title", "hi"),
		Node::element(tag),
	);
	parent.mount().unwrap();
	parent
}

#[test]
fn test_nested_component_receives_bound_property() {
	// Arrange & Act
	let parent = mount_parent("lc-outer", "lc-inner", "<lc-inner :label=\"title + '!'\"></lc-inner>");

	// Assert
	let children = parent.children();
	assert_eq!(children.len(), 1);
	let child = &children[0];
	assert!(child.is_mounted());
	assert!(child.parent().is_some_and(|owner| owner.ptr_eq(&parent)));
	assert_eq!(child.get("label"), Value::from("hi!"));
	assert_eq!(child.root().text_content(), "hi!hi");
}

#[test]
fn test_parent_write_reaches_nested_component_in_one_flush() {
	// Arrange
	let parent = mount_parent("lc-outer2", "lc-inner2", "<lc-inner2 :label=\"title\"></lc-inner2>");
	flush().unwrap();
	let child = parent.children()[0].clone();

	// Act
	parent.set("title", Value::from("yo")).unwrap();
	flush().unwrap();

	// Assert
	assert_eq!(child.get("label"), Value::from("yo"));
	assert_eq!(child.root().text_content(), "yoyo");
	assert_eq!(pending_tasks(), 0);
}

#[test]
fn test_child_mount_defers_targeted_parent_refresh() {
	// Arrange & Act
	let parent = mount_parent("lc-outer3", "lc-inner3", "<lc-inner3 :label=\"title\"></lc-inner3>");

	// Assert
	assert!(pending_tasks() > 0);
	flush().unwrap();
	assert_eq!(pending_tasks(), 0);
	assert_eq!(parent.children()[0].root().text_content(), "hihi");
}

#[test]
fn test_tearing_down_host_unmounts_child() {
	// Arrange
	let parent = mount_parent("lc-outer4", "lc-inner4", "<lc-inner4 :label=\"title\"></lc-inner4>");
	let child = parent.children()[0].clone();
	let host = child.host().clone();

	// Act
	parent.tear_down(parent.root());

	// Assert
	assert!(!child.is_mounted());
	assert!(parent.children().is_empty());
	assert_eq!(parent.observer_count(), 0);
	assert_eq!(host.get_attribute("x-prop:label").as_deref(), Some("title"));
}

#[test]
fn test_undefined_custom_element_is_left_alone() {
	let component = Component::new(
		ComponentDefinition::new("lc-host").template("<lc-missing><p x-text=\"1\"></p></lc-missing>"),
		Node::element("lc-host"),
	);

	component.mount().unwrap();

	assert!(component.children().is_empty());
	assert_eq!(component.observer_count(), 0);
	assert_eq!(
		component.root().inner_html(),
		"<lc-missing><p x-text=\"1\"></p></lc-missing>"
	);
}

#[rstest]
#[case("nodash")]
#[case("-leading")]
fn test_invalid_tags_are_rejected(#[case] tag: &str) {
	let result = define_component(ComponentDefinition::new(tag));

	assert!(matches!(result, Err(BindError::Config(_))));
	assert!(!is_defined(tag));
}

#[test]
fn test_redefinition_is_rejected() {
	define_component(ComponentDefinition::new("lc-once")).unwrap();

	assert!(is_defined("LC-ONCE"));
	assert!(matches!(
		define_component(ComponentDefinition::new("lc-once")),
		Err(BindError::Config(_))
	));
}

#[test]
fn test_host_children_are_projected_into_slots() {
	let host = Node::element("lc-card");
	host.set_inner_html("<h1 slot=\"title\">Title</h1><p>Body</p>");
	let component = Component::new(
		ComponentDefinition::new("lc-card")
			.template("<header><slot name=\"title\"></slot></header><main><slot></slot></main>"),
		host,
	);

	component.mount().unwrap();

	let slots = component.root().elements_by_tag("slot");
	assert_eq!(slots[0].assigned_nodes().map(|nodes| nodes.len()), Some(1));
	assert_eq!(slots[1].assigned_nodes().map(|nodes| nodes.len()), Some(1));
}

#[test]
fn test_custom_event_reaches_host_listener() {
	let component = Component::new(
		ComponentDefinition::new("lc-emitter")
			.template("<button @click=\"picked = true\"></button>")
			.property("picked", false),
		Node::element("lc-emitter"),
	);
	component.mount().unwrap();
	let seen = std::rc::Rc::new(std::cell::Cell::new(false));
	let flag = std::rc::Rc::clone(&seen);
	component.host().add_event_listener(
		"picked",
		std::rc::Rc::new(move |event: &Event| flag.set(event.detail() == &Value::from(3))),
	);

	let not_prevented = component.dispatch_custom_event("picked", Value::from(3));

	assert!(not_prevented);
	assert!(seen.get());
}

#[test]
fn test_custom_prefix_from_toml() {
	let config = DirectiveConfig::from_toml_str("prefix = \"rx-\"\nitem_name = \"row\"").unwrap();
	let component = Component::new(
		ComponentDefinition::new("lc-prefixed")
			.template("<p rx-for=\"rows\">${row}</p><p x-for=\"rows\"></p>")
			.property("rows", Value::list(["a", "b"]))
			.config(config),
		Node::element("lc-prefixed"),
	);

	component.mount().unwrap();

	assert_eq!(component.root().text_content(), "ab");
	assert_eq!(component.root().elements_by_tag("p").len(), 3);
}

#[test]
fn test_unmount_then_mount_renders_again() {
	let component = Component::new(
		ComponentDefinition::new("lc-again")
			.template("<p x-text=\"count\"></p>")
			.property("count", 4),
		Node::element("lc-again"),
	);
	component.mount().unwrap();

	component.unmount();
	assert_eq!(component.observer_count(), 0);
	assert_eq!(component.get("count"), Value::Undefined);

	component.mount().unwrap();
	assert_eq!(component.root().text_content(), "4");
	assert_eq!(component.observer_count(), 1);
}
