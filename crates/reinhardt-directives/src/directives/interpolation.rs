//! Text interpolation: `Hello, ${name}!` inside a text node.

use crate::component::Component;
use crate::dom::Node;
use crate::error::BindResult;
use crate::expression::Context;
use crate::reactive::ObserverSpec;

/// Binds a text node whose content contains `${...}` markers.
///
/// The original text is the template; every update re-renders it and
/// rolling back puts it back.
pub(crate) fn bind(component: &Component, node: &Node, context: &Context) -> BindResult<()> {
	let template = node.text_content();
	let weak = component.downgrade();
	let context = context.clone();
	let original = template.clone();
	component.observe(
		node,
		ObserverSpec::new()
			.with_update(move |node| {
				weak.with(|component| {
					node.set_text_content(&component.interpolate(&template, &context));
					Ok(())
				})
			})
			.with_roll_back(move |node| node.set_text_content(&original)),
	)?;
	Ok(())
}
