//! `x-on:<event>`: runs an expression whenever the node receives an event.

use std::rc::Rc;

use tracing::error;

use super::{Directive, Flow, argument};
use crate::attribute::text_to_property;
use crate::component::{Component, WeakComponent};
use crate::dom::{Event, EventListener, Node};
use crate::error::BindResult;
use crate::expression::Context;
use crate::reactive::ObserverSpec;
use crate::value::Value;

/// Event binding.
///
/// `x-on:click="count += 1"` (or `@click`) evaluates the expression on each
/// `click` dispatched on the node, with the event exposed as `$e`
/// (`$e.type`, `$e.detail`, `$e.target`). Writes made by the handler are
/// flushed before the dispatch returns. The event name is camel-cased from
/// the argument, so `@value-changed` listens for `valueChanged`.
pub(crate) struct On;

impl Directive for On {
	fn name(&self) -> &'static str {
		"on"
	}

	fn bind(
		&self,
		component: &Component,
		node: &Node,
		attribute: &str,
		context: &Context,
	) -> BindResult<Flow> {
		let kind = text_to_property(argument(attribute).unwrap_or_default());
		let handler = Rc::new(Handler {
			component: component.downgrade(),
			expression: node.get_attribute(attribute).unwrap_or_default(),
			context: context.clone(),
		});
		let listener: EventListener = {
			let handler = Rc::clone(&handler);
			Rc::new(move |event: &Event| handler.handle(event))
		};

		let commit = {
			let attribute = attribute.to_string();
			let kind = kind.clone();
			let listener = Rc::clone(&listener);
			move |node: &Node| {
				node.remove_attribute(&attribute);
				node.add_event_listener(&kind, Rc::clone(&listener));
				Ok(())
			}
		};
		let roll_back = {
			let attribute = attribute.to_string();
			move |node: &Node| {
				node.remove_event_listener(&kind, &listener);
				node.set_attribute(&attribute, handler.expression.as_str());
			}
		};

		component.observe(
			node,
			ObserverSpec::new()
				.with_commit(commit)
				.with_roll_back(roll_back),
		)?;
		Ok(Flow::Continue)
	}
}

struct Handler {
	component: WeakComponent,
	expression: String,
	context: Context,
}

impl Handler {
	fn handle(&self, event: &Event) {
		let Some(component) = self.component.upgrade() else {
			return;
		};
		let context = self.context.with("$e", event_value(event));
		component.evaluate(&self.expression, &context);
		if let Err(e) = component.flush() {
			error!(component = %component.tag(), expression = %self.expression, event = %event.kind(), error = %e, "Event handler update failed");
		}
	}
}

fn event_value(event: &Event) -> Value {
	Value::map([
		("type", Value::from(event.kind())),
		("detail", event.detail().clone()),
		("target", event.target().map_or(Value::Null, Value::Node)),
	])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentDefinition;
	use rstest::rstest;

	fn mount(template: &str) -> Component {
		let definition = ComponentDefinition::new("x-clicker")
			.template(template)
			.property("count", 0)
			.property("last", "")
			.method("bump", |component, arguments| {
				let step = arguments.first().map_or(1.0, Value::to_number);
				let count = component.get("count").to_number();
				component.set("count", Value::from(count + step))?;
				Ok(Value::Undefined)
			});
		let component = Component::new(definition, Node::element("x-clicker"));
		component.mount().unwrap();
		component
	}

	fn button(component: &Component) -> Node {
		component.root().elements_by_tag("button")[0].clone()
	}

	#[rstest]
	#[case("<button x-on:click=\"count += 1\">${count}</button>")]
	#[case("<button @click=\"count += 1\">${count}</button>")]
	#[case("<button @click=\"bump()\">${count}</button>")]
	fn test_handler_runs_and_flushes(#[case] template: &str) {
		let component = mount(template);
		let button = button(&component);

		button.dispatch_event(&Event::new("click"));
		button.dispatch_event(&Event::new("click"));

		assert_eq!(component.get("count"), Value::from(2));
		assert_eq!(button.text_content(), "2");
	}

	#[test]
	fn test_event_is_exposed_as_dollar_e() {
		let component = mount("<button @picked=\"last = $e.type + ':' + $e.detail\"></button>");

		button(&component).dispatch_event(&Event::new("picked").with_detail(Value::from(7)));

		assert_eq!(component.get("last"), Value::from("picked:7"));
	}

	#[test]
	fn test_event_name_is_camel_cased() {
		let component = mount("<button @value-changed=\"bump(5)\"></button>");
		let button = button(&component);

		assert_eq!(button.listener_count("valueChanged"), 1);
		button.dispatch_event(&Event::new("valueChanged"));

		assert_eq!(component.get("count"), Value::from(5));
	}

	#[test]
	fn test_tear_down_detaches_and_restores() {
		let component = mount("<button x-on:click=\"bump()\"></button>");
		let button = button(&component);

		component.tear_down(component.root());
		button.dispatch_event(&Event::new("click"));

		assert_eq!(button.listener_count("click"), 0);
		assert_eq!(button.get_attribute("x-on:click").as_deref(), Some("bump()"));
		assert_eq!(component.get("count"), Value::from(0));
	}
}
