//! Attribute name normalization and naming helpers.
//!
//! Template authors may use shorthand attribute forms; the binding engine
//! rewrites them to the canonical directive form before lookup:
//!
//! | written            | normalized (prefix `x-`) |
//! |--------------------|--------------------------|
//! | `:class`, `:style` | `x-class`, `x-style`     |
//! | `:title`           | `x-prop:title`           |
//! | `@click`           | `x-on:click`             |
//! | `href="/u/${id}"`  | `x-attr:href`            |
//!
//! Normalization is idempotent: a normalized name normalizes to itself.

/// Rewrites shorthand attribute names into their directive form.
///
/// # Arguments
///
/// * `name` - Attribute name as written
/// * `value` - Attribute value, inspected for `${` interpolation markers
/// * `prefix` - Directive prefix, usually `x-`
///
/// # Example
///
/// ```ignore
/// assert_eq!(normalize_attribute(":value", "name", "x-"), "x-prop:value");
/// assert_eq!(normalize_attribute("@input", "save()", "x-"), "x-on:input");
/// assert_eq!(normalize_attribute("title", "Hi ${name}", "x-"), "x-attr:title");
/// assert_eq!(normalize_attribute("id", "main", "x-"), "id");
/// ```
pub fn normalize_attribute(name: &str, value: &str, prefix: &str) -> String {
	match name {
		":class" | ":style" => format!("{prefix}{}", &name[1..]),
		_ if name.starts_with(':') => format!("{prefix}prop{name}"),
		_ if name.starts_with('@') => format!("{prefix}on:{}", &name[1..]),
		_ if !name.starts_with(prefix) && value.contains("${") => format!("{prefix}attr:{name}"),
		_ => name.to_string(),
	}
}

/// Name of the directive an attribute refers to, or `None` for plain attributes.
///
/// `x-on:click` refers to the `on` directive, `x-if` to the `if` directive.
pub fn directive_name<'a>(attribute: &'a str, prefix: &str) -> Option<&'a str> {
	let rest = attribute.strip_prefix(prefix)?;
	let name = rest.split(':').next().unwrap_or(rest);
	(!name.is_empty()).then_some(name)
}

/// Argument following the last `:` of a directive attribute.
///
/// Returns `None` when the attribute carries no argument.
pub fn directive_argument(attribute: &str) -> Option<&str> {
	attribute
		.rsplit_once(':')
		.map(|(_, argument)| argument)
		.filter(|argument| !argument.is_empty())
}

/// Converts kebab-case text to camelCase (`user-name` becomes `userName`).
pub fn text_to_property(text: &str) -> String {
	let mut property = String::with_capacity(text.len());
	for (index, part) in text.split('-').enumerate() {
		let mut chars = part.chars();
		if let Some(first) = chars.next() {
			if index == 0 || property.is_empty() {
				property.extend(first.to_lowercase());
			} else {
				property.extend(first.to_uppercase());
			}
			property.push_str(chars.as_str());
		}
	}
	property
}

/// Converts camelCase text to kebab-case (`backgroundColor` becomes `background-color`).
pub fn camel_to_kebab(text: &str) -> String {
	let mut kebab = String::with_capacity(text.len() + 4);
	for c in text.chars() {
		if c.is_ascii_uppercase() {
			if !kebab.is_empty() {
				kebab.push('-');
			}
			kebab.push(c.to_ascii_lowercase());
		} else {
			kebab.push(c);
		}
	}
	kebab
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(":class", "{ active: on }", "x-class")]
	#[case(":style", "styles", "x-style")]
	#[case(":user-name", "name", "x-prop:user-name")]
	#[case("@click", "save()", "x-on:click")]
	#[case("href", "/users/${id}", "x-attr:href")]
	#[case("x-text", "${raw}", "x-text")]
	#[case("id", "main", "id")]
	fn test_normalize_attribute(#[case] name: &str, #[case] value: &str, #[case] expected: &str) {
		let normalized = normalize_attribute(name, value, "x-");
		assert_eq!(normalized, expected);
		assert_eq!(normalize_attribute(&normalized, value, "x-"), normalized);
	}

	#[test]
	fn test_custom_prefix() {
		assert_eq!(normalize_attribute("@submit", "go()", "rx-"), "rx-on:submit");
		assert_eq!(directive_name("rx-on:submit", "rx-"), Some("on"));
		assert_eq!(directive_name("x-on:submit", "rx-"), None);
	}

	#[rstest]
	#[case("x-if", Some("if"))]
	#[case("x-prop:value", Some("prop"))]
	#[case("x-", None)]
	#[case("class", None)]
	fn test_directive_name(#[case] attribute: &str, #[case] expected: Option<&str>) {
		assert_eq!(directive_name(attribute, "x-"), expected);
	}

	#[rstest]
	#[case("x-on:my-event", Some("my-event"))]
	#[case("x-slot", None)]
	#[case("x-prop:", None)]
	fn test_directive_argument(#[case] attribute: &str, #[case] expected: Option<&str>) {
		assert_eq!(directive_argument(attribute), expected);
	}

	#[rstest]
	#[case("user-name", "userName")]
	#[case("title", "title")]
	#[case("my-long-prop-name", "myLongPropName")]
	#[case("Title", "title")]
	fn test_text_to_property(#[case] text: &str, #[case] expected: &str) {
		assert_eq!(text_to_property(text), expected);
	}

	#[rstest]
	#[case("backgroundColor", "background-color")]
	#[case("color", "color")]
	#[case("font-size", "font-size")]
	fn test_camel_to_kebab(#[case] text: &str, #[case] expected: &str) {
		assert_eq!(camel_to_kebab(text), expected);
	}
}
