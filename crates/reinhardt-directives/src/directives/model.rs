//! `x-model`: two-way binding between a form control and an expression.

use std::rc::Rc;

use tracing::error;

use super::{Directive, Flow};
use crate::component::{Component, WeakComponent};
use crate::dom::{ControlType, Event, EventListener, Node};
use crate::error::{BindError, BindResult};
use crate::expression::Context;
use crate::reactive::ObserverSpec;
use crate::value::Value;

/// Two-way form binding.
///
/// The control is refreshed from the expression on every notification, and
/// the expression is written back from the control on `input` (text
/// controls) or `change` (everything else). When the bound value is a map,
/// the control reads and writes the entry named after its `name` attribute.
pub(crate) struct Model;

impl Directive for Model {
	fn name(&self) -> &'static str {
		"model"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let control = node
			.control_type()
			.ok_or_else(|| BindError::UnsupportedNode(node.tag_name().to_string()))?;
		let binding = Rc::new(Binding {
			component: component.downgrade(),
			expression: node.get_attribute(attribute).unwrap_or_default(),
			context: context.clone(),
			control,
		});
		let kind = match control {
			ControlType::Text | ControlType::TextArea => "input",
			_ => "change",
		};
		let listener: EventListener = {
			let binding = Rc::clone(&binding);
			Rc::new(move |event: &Event| binding.handle(event))
		};

		let commit = {
			let attribute = attribute.to_string();
			let listener = Rc::clone(&listener);
			move |node: &Node| {
				node.remove_attribute(&attribute);
				node.add_event_listener(kind, Rc::clone(&listener));
				Ok(())
			}
		};
		let update = {
			let binding = Rc::clone(&binding);
			move |node: &Node| {
				binding.component.with(|component| {
					binding.update_node(node, &binding.get(component));
					Ok(())
				})
			}
		};
		let roll_back = {
			let attribute = attribute.to_string();
			move |node: &Node| {
				node.remove_event_listener(kind, &listener);
				node.set_attribute(&attribute, binding.expression.as_str());
			}
		};

		component.observe(
			node,
			ObserverSpec::new()
				.with_commit(commit)
				.with_update(update)
				.with_roll_back(roll_back),
		)?;
		Ok(Flow::Continue)
	}
}

struct Binding {
	component: WeakComponent,
	expression: String,
	context: Context,
	control: ControlType,
}

impl Binding {
	fn get(&self, component: &Component) -> Value {
		component.evaluate(&self.expression, &self.context)
	}

	fn set(&self, component: &Component, value: Value) {
		component.assign(&self.expression, value, &self.context);
	}

	/// Writes the control's state back, then runs the resulting notifications.
	fn handle(&self, event: &Event) {
		let (Some(component), Some(node)) = (self.component.upgrade(), event.target()) else {
			return;
		};
		self.update_property(&component, &node);
		if let Err(e) = component.flush() {
			error!(component = %component.tag(), expression = %self.expression, error = %e, "Model update failed");
		}
	}

	fn update_node(&self, node: &Node, value: &Value) {
		let field = |value: &Value| match value {
			Value::Map(map) => map.get(&node.name()).unwrap_or_default(),
			other => other.clone(),
		};
		match self.control {
			ControlType::Text | ControlType::TextArea => node.set_value(&display(&field(value))),
			ControlType::Radio => {
				node.set_checked(Value::String(node.value()).loosely_equals(value));
			}
			ControlType::Checkbox => {
				let checked = match value {
					Value::List(list) => contains(&list.to_vec(), &node.value()),
					other => field(other).is_truthy(),
				};
				node.set_checked(checked);
			}
			ControlType::SelectOne => match field(value) {
				Value::String(text) if text.is_empty() => node.set_selected_index(Some(0)),
				value if value.is_nullish() => node.set_selected_index(Some(0)),
				value => node.set_value(&value.to_display_string()),
			},
			ControlType::SelectMultiple => {
				let selected = match value {
					Value::List(list) => list.to_vec(),
					_ => Vec::new(),
				};
				for option in node.options() {
					option.set_selected(contains(&selected, &option.value()));
				}
			}
		}
	}

	fn update_property(&self, component: &Component, node: &Node) {
		let value = self.get(component);
		match (self.control, value) {
			(ControlType::Checkbox, Value::List(list)) => {
				let own = node.value();
				if node.checked() {
					list.push(own);
				} else {
					list.retain(|item| !Value::String(own.clone()).loosely_equals(item));
				}
			}
			(ControlType::Checkbox, Value::Map(map)) => {
				map.insert(node.name(), checkbox_value(node));
			}
			(ControlType::Checkbox, _) => self.set(component, Value::String(checkbox_value(node))),
			(ControlType::SelectMultiple, value) => {
				let selected: Vec<Value> = node
					.options()
					.iter()
					.filter(|option| option.selected())
					.map(|option| Value::String(option.value()))
					.collect();
				match value {
					Value::List(list) => list.replace_all(selected),
					_ => self.set(component, Value::list(selected)),
				}
			}
			(_, Value::Map(map)) => map.insert(node.name(), node.value()),
			_ => self.set(component, Value::String(node.value())),
		}
	}
}

/// Value a checkbox contributes: its value when checked, empty otherwise.
fn checkbox_value(node: &Node) -> String {
	if node.checked() {
		node.value()
	} else {
		String::new()
	}
}

fn contains(items: &[Value], text: &str) -> bool {
	let text = Value::String(text.to_string());
	items.iter().any(|item| item.loosely_equals(&text))
}

fn display(value: &Value) -> String {
	if value.is_nullish() {
		String::new()
	} else {
		value.to_display_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentDefinition;
	use crate::reactive::scheduler;
	use rstest::rstest;

	fn mount(template: &str, value: Value) -> Component {
		let definition = ComponentDefinition::new("x-form")
			.template(template)
			.property("value", value);
		let component = Component::new(definition, Node::element("x-form"));
		component.mount().unwrap();
		component
	}

	fn control(component: &Component, tag: &str) -> Node {
		component
			.root()
			.find(|node| node.tag_name() == tag)
			.unwrap()
	}

	fn fire(node: &Node, kind: &str) {
		node.dispatch_event(&Event::new(kind));
	}

	#[test]
	fn test_text_input_round_trip() {
		let component = mount("<input x-model=\"value\">", Value::from("ada"));
		let input = control(&component, "input");
		assert_eq!(input.value(), "ada");

		input.set_value("grace");
		fire(&input, "input");
		assert_eq!(component.get("value"), Value::from("grace"));

		component.set("value", Value::from("lovelace")).unwrap();
		scheduler::flush().unwrap();
		assert_eq!(input.value(), "lovelace");
	}

	#[test]
	fn test_change_event_is_ignored_by_text_input() {
		let component = mount("<input x-model=\"value\">", Value::from("a"));
		let input = control(&component, "input");

		input.set_value("b");
		fire(&input, "change");

		assert_eq!(component.get("value"), Value::from("a"));
	}

	#[test]
	fn test_map_shaped_property_binds_named_field() {
		let component = mount(
			"<input name=\"first\" x-model=\"value\">",
			Value::map([("first", "ada"), ("last", "lovelace")]),
		);
		let input = control(&component, "input");
		assert_eq!(input.value(), "ada");

		input.set_value("grace");
		fire(&input, "input");

		assert_eq!(
			component.get("value"),
			Value::map([("first", "grace"), ("last", "lovelace")])
		);
	}

	#[test]
	fn test_checkbox_toggles_membership_of_list() {
		let component = mount(
			"<input type=\"checkbox\" value=\"y\" x-model=\"value\">",
			Value::list(["x"]),
		);
		let checkbox = control(&component, "input");
		assert!(!checkbox.checked());

		checkbox.set_checked(true);
		fire(&checkbox, "change");
		assert_eq!(component.get("value"), Value::list(["x", "y"]));
		assert!(checkbox.checked());

		checkbox.set_checked(false);
		fire(&checkbox, "change");
		assert_eq!(component.get("value"), Value::list(["x"]));
	}

	#[rstest]
	#[case(true, Value::from(true))]
	#[case(false, Value::from(false))]
	fn test_checkbox_with_boolean_property(#[case] checked: bool, #[case] expected: Value) {
		let definition = ComponentDefinition::new("x-flag")
			.template("<input type=\"checkbox\" x-model=\"flag\">")
			.property("flag", !checked);
		let component = Component::new(definition, Node::element("x-flag"));
		component.mount().unwrap();
		let checkbox = control(&component, "input");

		checkbox.set_checked(checked);
		fire(&checkbox, "change");

		assert_eq!(component.get("flag"), expected);
	}

	#[test]
	fn test_radio_group_reflects_property() {
		let component = mount(
			"<input type=\"radio\" name=\"size\" value=\"s\" x-model=\"value\">\
			 <input type=\"radio\" name=\"size\" value=\"m\" x-model=\"value\">",
			Value::from("m"),
		);
		let radios = component.root().elements_by_tag("input");
		assert!(!radios[0].checked());
		assert!(radios[1].checked());

		radios[0].set_checked(true);
		fire(&radios[0], "change");

		assert_eq!(component.get("value"), Value::from("s"));
		assert!(radios[0].checked());
		assert!(!radios[1].checked());
	}

	#[test]
	fn test_single_select_resets_to_first_option_when_empty() {
		let component = mount(
			"<select x-model=\"value\"><option>a</option><option>b</option></select>",
			Value::from("b"),
		);
		let select = control(&component, "select");
		assert_eq!(select.value(), "b");

		component.set("value", Value::from("")).unwrap();
		scheduler::flush().unwrap();

		assert_eq!(select.selected_index(), Some(0));
	}

	#[test]
	fn test_multi_select_rebuilds_list() {
		let component = mount(
			"<select multiple x-model=\"value\">\
			 <option>a</option><option>b</option><option>c</option></select>",
			Value::list(["b"]),
		);
		let select = control(&component, "select");
		let options = select.options();
		assert!(options[1].selected());

		options[0].set_selected(true);
		options[2].set_selected(true);
		options[1].set_selected(false);
		fire(&select, "change");

		assert_eq!(component.get("value"), Value::list(["a", "c"]));
	}

	#[test]
	fn test_model_on_non_control_is_unsupported() {
		let definition = ComponentDefinition::new("x-div")
			.template("<div x-model=\"value\"></div>")
			.property("value", "");
		let component = Component::new(definition, Node::element("x-div"));

		assert_eq!(
			component.mount(),
			Err(BindError::UnsupportedNode("div".into()))
		);
	}

	#[test]
	fn test_tear_down_detaches_listener() {
		let component = mount("<input x-model=\"value\">", Value::from("a"));
		let input = control(&component, "input");
		assert_eq!(input.listener_count("input"), 1);

		component.tear_down(component.root());

		assert_eq!(input.listener_count("input"), 0);
		assert_eq!(input.get_attribute("x-model").as_deref(), Some("value"));
	}
}
