//! Element state: class list, inline style, visibility, form controls and
//! property access.

use super::{Node, NodeData};
use crate::attribute::camel_to_kebab;
use crate::error::BindResult;
use crate::value::{List, Value};

/// Form control categories with distinct two-way binding behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
	/// `<input>` of any type other than radio and checkbox
	Text,
	/// `<textarea>`
	TextArea,
	/// `<input type="radio">`
	Radio,
	/// `<input type="checkbox">`
	Checkbox,
	/// `<select>` without `multiple`
	SelectOne,
	/// `<select multiple>`
	SelectMultiple,
}

impl Node {
	/// Classes listed in the `class` attribute.
	pub fn class_list(&self) -> Vec<String> {
		self.get_attribute("class")
			.map(|classes| classes.split_whitespace().map(str::to_string).collect())
			.unwrap_or_default()
	}

	pub fn has_class(&self, name: &str) -> bool {
		self.class_list().iter().any(|class| class == name)
	}

	/// Adds a class when not already present.
	pub fn add_class(&self, name: &str) {
		let mut classes = self.class_list();
		if name.is_empty() || classes.iter().any(|class| class == name) {
			return;
		}
		classes.push(name.to_string());
		self.set_attribute("class", classes.join(" "));
	}

	pub fn remove_class(&self, name: &str) {
		let classes = self.class_list();
		if classes.iter().any(|class| class == name) {
			let remaining: Vec<String> = classes.into_iter().filter(|class| class != name).collect();
			self.set_attribute("class", remaining.join(" "));
		}
	}

	/// Adds or removes a class depending on `present`.
	pub fn toggle_class(&self, name: &str, present: bool) {
		if present {
			self.add_class(name);
		} else {
			self.remove_class(name);
		}
	}

	fn style_declarations(&self) -> Vec<(String, String)> {
		self.get_attribute("style")
			.map(|style| {
				style
					.split(';')
					.filter_map(|declaration| {
						let (name, value) = declaration.split_once(':')?;
						let name = name.trim();
						(!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	/// Value of an inline style property. Accepts camelCase or kebab-case names.
	pub fn style_property(&self, name: &str) -> Option<String> {
		let name = camel_to_kebab(name);
		self.style_declarations()
			.into_iter()
			.find(|(property, _)| *property == name)
			.map(|(_, value)| value)
	}

	/// Sets an inline style property; an empty value removes it.
	pub fn set_style_property(&self, name: &str, value: &str) {
		let name = camel_to_kebab(name);
		let mut declarations = self.style_declarations();
		let value = value.trim();
		match declarations.iter().position(|(property, _)| *property == name) {
			Some(index) if value.is_empty() => {
				declarations.remove(index);
			}
			Some(index) => declarations[index].1 = value.to_string(),
			None if value.is_empty() => return,
			None => declarations.push((name, value.to_string())),
		}
		let style = declarations
			.iter()
			.map(|(property, value)| format!("{property}: {value};"))
			.collect::<Vec<_>>()
			.join(" ");
		self.set_attribute("style", style);
	}

	pub fn hidden(&self) -> bool {
		self.has_attribute("hidden")
	}

	pub fn set_hidden(&self, hidden: bool) {
		if hidden {
			self.set_attribute("hidden", "");
		} else {
			self.remove_attribute("hidden");
		}
	}

	/// Form control category, or `None` for elements that are not form controls.
	pub fn control_type(&self) -> Option<ControlType> {
		match self.tag_name() {
			"input" => Some(
				match self
					.get_attribute("type")
					.map(|kind| kind.to_ascii_lowercase())
					.as_deref()
				{
					Some("radio") => ControlType::Radio,
					Some("checkbox") => ControlType::Checkbox,
					_ => ControlType::Text,
				},
			),
			"textarea" => Some(ControlType::TextArea),
			"select" if self.has_attribute("multiple") => Some(ControlType::SelectMultiple),
			"select" => Some(ControlType::SelectOne),
			_ => None,
		}
	}

	/// The control's `name` attribute, or an empty string.
	pub fn name(&self) -> String {
		self.get_attribute("name").unwrap_or_default()
	}

	/// Current value of a form control or option.
	///
	/// Checkboxes and radios without a `value` attribute report `"on"`.
	pub fn value(&self) -> String {
		let Some(element) = self.element_data() else {
			return String::new();
		};
		if let Some(value) = element.controls.borrow().value.clone() {
			return value;
		}
		match self.control_type() {
			Some(ControlType::Radio | ControlType::Checkbox) => {
				self.get_attribute("value").unwrap_or_else(|| "on".to_string())
			}
			Some(ControlType::TextArea) => self.text_content(),
			Some(ControlType::SelectOne | ControlType::SelectMultiple) => self
				.selected_index()
				.and_then(|index| self.options().get(index).map(Node::value))
				.unwrap_or_default(),
			_ if self.tag_name() == "option" => self.get_attribute("value").unwrap_or_else(|| {
				self.text_content()
					.split_whitespace()
					.collect::<Vec<_>>()
					.join(" ")
			}),
			_ => self.get_attribute("value").unwrap_or_default(),
		}
	}

	/// Sets the value. On a `<select>` this selects the first option with a
	/// matching value and deselects the rest.
	pub fn set_value(&self, value: &str) {
		match self.control_type() {
			Some(ControlType::SelectOne | ControlType::SelectMultiple) => {
				let mut matched = false;
				for option in self.options() {
					let selected = !matched && option.value() == value;
					matched |= selected;
					option.set_option_state(selected);
				}
			}
			_ if self.tag_name() == "option" => self.set_attribute("value", value),
			_ => {
				if let Some(element) = self.element_data() {
					element.controls.borrow_mut().value = Some(value.to_string());
				}
			}
		}
	}

	pub fn checked(&self) -> bool {
		self.element_data()
			.and_then(|element| element.controls.borrow().checked)
			.unwrap_or_else(|| self.has_attribute("checked"))
	}

	/// Sets the checked state. Checking a named radio unchecks the other
	/// radios of the same group in the same tree.
	pub fn set_checked(&self, checked: bool) {
		let Some(element) = self.element_data() else {
			return;
		};
		element.controls.borrow_mut().checked = Some(checked);
		if checked && self.control_type() == Some(ControlType::Radio) {
			let group = self.name();
			if group.is_empty() {
				return;
			}
			for radio in self.root().descendants() {
				if radio != *self
					&& radio.control_type() == Some(ControlType::Radio)
					&& radio.name() == group
				{
					if let Some(other) = radio.element_data() {
						other.controls.borrow_mut().checked = Some(false);
					}
				}
			}
		}
	}

	pub fn selected(&self) -> bool {
		self.element_data()
			.and_then(|element| element.controls.borrow().selected)
			.unwrap_or_else(|| self.has_attribute("selected"))
	}

	/// Selects or deselects an option. Selecting an option of a single
	/// select deselects its siblings.
	pub fn set_selected(&self, selected: bool) {
		if selected {
			let select = {
				let mut current = self.parent();
				while let Some(node) = current.clone() {
					if node.tag_name() == "select" {
						break;
					}
					current = node.parent();
				}
				current
			};
			if let Some(select) = select.filter(|select| !select.has_attribute("multiple")) {
				for option in select.options() {
					option.set_option_state(option == *self);
				}
				return;
			}
		}
		self.set_option_state(selected);
	}

	fn set_option_state(&self, selected: bool) {
		if let Some(element) = self.element_data() {
			element.controls.borrow_mut().selected = Some(selected);
		}
	}

	/// `<option>` descendants of a `<select>`.
	pub fn options(&self) -> Vec<Node> {
		self.elements_by_tag("option")
	}

	/// Index of the first selected option. An untouched single select
	/// without explicit selection reports its first option.
	pub fn selected_index(&self) -> Option<usize> {
		let options = self.options();
		if let Some(index) = options.iter().position(Node::selected) {
			return Some(index);
		}
		let untouched = options.iter().all(|option| {
			option
				.element_data()
				.is_some_and(|element| element.controls.borrow().selected.is_none())
		});
		(self.control_type() == Some(ControlType::SelectOne) && untouched && !options.is_empty())
			.then_some(0)
	}

	/// Selects the option at `index`; `None` deselects every option.
	pub fn set_selected_index(&self, index: Option<usize>) {
		for (position, option) in self.options().iter().enumerate() {
			option.set_option_state(Some(position) == index);
		}
	}

	/// Reads a named property.
	///
	/// Properties declared by a component mounted on this element are read
	/// through the component (and therefore tracked). Known element
	/// properties map onto node state; anything else comes from the node's
	/// own property bag.
	pub fn property(&self, name: &str) -> Value {
		if let Some(component) = self.component() {
			if component.has_property(name) {
				return component.get(name);
			}
		}
		match (&self.0.data, name) {
			(NodeData::Text(data) | NodeData::Comment(data), "data" | "nodeValue" | "textContent") => {
				Value::String(data.borrow().clone())
			}
			(_, "textContent") => Value::String(self.text_content()),
			(_, "parentNode") => self.parent().map_or(Value::Null, Value::Node),
			(_, "nextElementSibling") => self.next_element_sibling().map_or(Value::Null, Value::Node),
			(NodeData::Element(element), _) => match name {
				"value" => Value::String(self.value()),
				"checked" => Value::Bool(self.checked()),
				"selected" => Value::Bool(self.selected()),
				"hidden" => Value::Bool(self.hidden()),
				"disabled" => Value::Bool(self.has_attribute("disabled")),
				"innerHTML" => Value::String(self.inner_html()),
				"className" => Value::String(self.get_attribute("class").unwrap_or_default()),
				"id" => Value::String(self.get_attribute("id").unwrap_or_default()),
				"name" => Value::String(self.name()),
				"tagName" => Value::String(self.tag_name().to_ascii_uppercase()),
				"type" => Value::String(
					self.control_type()
						.map(control_type_name)
						.unwrap_or_default()
						.to_string(),
				),
				"selectedIndex" => Value::Number(self.selected_index().map_or(-1.0, |index| index as f64)),
				"options" => Value::List(List::from_vec(
					self.options().into_iter().map(Value::Node).collect(),
				)),
				_ => element
					.properties
					.borrow()
					.get(name)
					.cloned()
					.unwrap_or_default(),
			},
			_ => Value::Undefined,
		}
	}

	/// Writes a named property. See [`Node::property`] for the lookup order.
	pub fn set_property(&self, name: &str, value: Value) -> BindResult<()> {
		if let Some(component) = self.component() {
			if component.has_property(name) {
				return component.set(name, value);
			}
		}
		let text = || {
			if value.is_nullish() {
				String::new()
			} else {
				value.to_display_string()
			}
		};
		match (&self.0.data, name) {
			(NodeData::Text(_) | NodeData::Comment(_), "data" | "nodeValue" | "textContent") => {
				self.set_text_content(&text());
			}
			(NodeData::Element(element), _) => match name {
				"value" => self.set_value(&text()),
				"checked" => self.set_checked(value.is_truthy()),
				"selected" => self.set_selected(value.is_truthy()),
				"hidden" => self.set_hidden(value.is_truthy()),
				"disabled" if value.is_truthy() => self.set_attribute("disabled", ""),
				"disabled" => {
					self.remove_attribute("disabled");
				}
				"textContent" => self.set_text_content(&text()),
				"innerHTML" => self.set_inner_html(&text()),
				"className" => self.set_attribute("class", text()),
				"id" => self.set_attribute("id", text()),
				"selectedIndex" => {
					let index = value.to_number();
					self.set_selected_index((index >= 0.0).then_some(index as usize));
				}
				_ => {
					element.properties.borrow_mut().insert(name.to_string(), value.clone());
				}
			},
			_ => {}
		}
		Ok(())
	}
}

fn control_type_name(control: ControlType) -> &'static str {
	match control {
		ControlType::Text => "text",
		ControlType::TextArea => "textarea",
		ControlType::Radio => "radio",
		ControlType::Checkbox => "checkbox",
		ControlType::SelectOne => "select-one",
		ControlType::SelectMultiple => "select-multiple",
	}
}

impl ControlType {
	/// Name reported by the control's `type` property.
	pub fn as_str(self) -> &'static str {
		control_type_name(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::parse_fragment;
	use rstest::rstest;

	fn first(markup: &str) -> Node {
		parse_fragment(markup).first_child().unwrap()
	}

	#[test]
	fn test_class_list_operations() {
		let node = first(r#"<div class="a b"></div>"#);

		node.add_class("c");
		node.add_class("a");
		node.remove_class("b");
		node.toggle_class("d", true);

		assert_eq!(node.class_list(), vec!["a", "c", "d"]);
	}

	#[test]
	fn test_style_property_accepts_camel_case() {
		let node = first(r#"<div style="color: red"></div>"#);

		node.set_style_property("backgroundColor", "blue");
		node.set_style_property("color", "");

		assert_eq!(node.get_attribute("style").unwrap(), "background-color: blue;");
		assert_eq!(node.style_property("background-color").as_deref(), Some("blue"));
	}

	#[rstest]
	#[case(r#"<input>"#, ControlType::Text)]
	#[case(r#"<input type="Checkbox">"#, ControlType::Checkbox)]
	#[case(r#"<input type="radio">"#, ControlType::Radio)]
	#[case(r#"<textarea></textarea>"#, ControlType::TextArea)]
	#[case(r#"<select></select>"#, ControlType::SelectOne)]
	#[case(r#"<select multiple></select>"#, ControlType::SelectMultiple)]
	fn test_control_type(#[case] markup: &str, #[case] expected: ControlType) {
		assert_eq!(first(markup).control_type(), Some(expected));
	}

	#[test]
	fn test_checkbox_value_defaults_to_on() {
		assert_eq!(first("<input type=checkbox>").value(), "on");
		assert_eq!(first("<input type=checkbox value=y>").value(), "y");
	}

	#[test]
	fn test_select_value_and_index() {
		let select = first("<select><option>a</option><option value=\"2\">b</option></select>");
		assert_eq!(select.selected_index(), Some(0));
		assert_eq!(select.value(), "a");

		select.set_value("2");
		assert_eq!(select.selected_index(), Some(1));

		select.set_value("missing");
		assert_eq!(select.selected_index(), None);
		assert_eq!(select.value(), "");
	}

	#[test]
	fn test_selecting_option_of_single_select_deselects_siblings() {
		let select = first("<select><option>a</option><option>b</option></select>");
		let options = select.options();

		options[1].set_selected(true);
		options[0].set_selected(true);

		assert!(options[0].selected());
		assert!(!options[1].selected());
	}

	#[test]
	fn test_checking_radio_unchecks_group() {
		let form = first(r#"<form><input type="radio" name="g" checked><input type="radio" name="g"></form>"#);
		let radios = form.elements_by_tag("input");

		radios[1].set_checked(true);

		assert!(!radios[0].checked());
		assert!(radios[1].checked());
	}

	#[test]
	fn test_unknown_properties_use_node_bag() {
		let node = Node::element("div");
		node.set_property("answer", Value::from(42)).unwrap();

		assert_eq!(node.property("answer"), Value::from(42));
		assert_eq!(node.property("missing"), Value::Undefined);
	}

	#[test]
	fn test_text_content_property_ignores_nullish() {
		let node = Node::element("span");
		node.set_property("textContent", Value::Null).unwrap();
		assert_eq!(node.text_content(), "");

		node.set_property("textContent", Value::from(7)).unwrap();
		assert_eq!(node.text_content(), "7");
	}
}
