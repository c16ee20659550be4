//! Lenient markup parser and serializer.
//!
//! The parser accepts the template markup components are written in: nested
//! elements, quoted or bare attribute values, comments, void elements,
//! `<template>` content and raw text inside `<script>`/`<style>`. It never
//! fails; malformed input degrades to text.

use std::borrow::Cow;

use super::Node;

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements closed implicitly when a sibling of the same tag opens.
const SELF_NESTING_FORBIDDEN: &[&str] = &["li", "option", "p"];

/// Parses `markup` into a fragment.
///
/// # Example
///
/// ```ignore
/// let fragment = parse_fragment("<p>Hello ${name}</p>");
/// assert_eq!(fragment.child_count(), 1);
/// ```
pub fn parse_fragment(markup: &str) -> Node {
	let fragment = Node::fragment();
	Parser {
		source: markup,
		position: 0,
		stack: vec![fragment.clone()],
	}
	.run();
	fragment
}

struct Parser<'a> {
	source: &'a str,
	position: usize,
	stack: Vec<Node>,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.source[self.position..]
	}

	fn container(&self) -> Node {
		let top = self.stack.last().cloned().unwrap_or_else(Node::fragment);
		top.content().unwrap_or(top)
	}

	fn run(mut self) {
		while self.position < self.source.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				self.comment();
			} else if rest.starts_with("</") {
				self.end_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") {
				self.skip_past('>');
			} else if rest.starts_with('<')
				&& rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
			{
				self.start_tag();
			} else {
				self.text();
			}
		}
	}

	fn skip_past(&mut self, terminator: char) {
		match self.rest().find(terminator) {
			Some(index) => self.position += index + terminator.len_utf8(),
			None => self.position = self.source.len(),
		}
	}

	fn comment(&mut self) {
		let body = &self.rest()[4..];
		let (data, consumed) = match body.find("-->") {
			Some(end) => (&body[..end], 4 + end + 3),
			None => (body, self.rest().len()),
		};
		self.container().append_child(&Node::comment(data));
		self.position += consumed;
	}

	fn end_tag(&mut self) {
		let body = &self.rest()[2..];
		let end = body.find('>').unwrap_or(body.len());
		let tag = body[..end].trim().to_ascii_lowercase();
		self.position = (self.position + 2 + end + 1).min(self.source.len());
		if let Some(index) = self.stack.iter().rposition(|node| node.tag_name() == tag) {
			if index > 0 {
				self.stack.truncate(index);
			}
		}
	}

	fn text(&mut self) {
		let rest = self.rest();
		// A lone '<' that does not open markup is plain text
		let end = rest
			.char_indices()
			.skip(1)
			.find(|(index, c)| {
				*c == '<'
					&& rest[index + 1..]
						.starts_with(|next: char| next.is_ascii_alphabetic() || next == '/' || next == '!')
			})
			.map_or(rest.len(), |(index, _)| index);
		let text = decode_entities(&rest[..end]).into_owned();
		self.position += end;
		self.container().append_child(&Node::text(text));
	}

	fn start_tag(&mut self) {
		self.position += 1;
		let name_end = self
			.rest()
			.find(|c: char| c.is_whitespace() || c == '/' || c == '>')
			.unwrap_or(self.rest().len());
		let tag = self.rest()[..name_end].to_ascii_lowercase();
		self.position += name_end;

		let element = Node::element(&tag);
		let self_closing = self.attributes(&element);

		if SELF_NESTING_FORBIDDEN.contains(&tag.as_str())
			&& self.stack.last().is_some_and(|top| top.tag_name() == tag)
		{
			self.stack.pop();
		}
		self.container().append_child(&element);

		if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
			return;
		}
		if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
			self.raw_text(&element, &tag);
			return;
		}
		self.stack.push(element);
	}

	/// Parses attributes up to the end of the start tag. Returns `true` for `/>`.
	fn attributes(&mut self, element: &Node) -> bool {
		loop {
			let rest = self.rest();
			let trimmed = rest.trim_start();
			self.position += rest.len() - trimmed.len();
			if trimmed.is_empty() {
				return false;
			}
			if trimmed.starts_with("/>") {
				self.position += 2;
				return true;
			}
			if trimmed.starts_with('>') {
				self.position += 1;
				return false;
			}
			if trimmed.starts_with('/') {
				self.position += 1;
				continue;
			}

			let name_end = trimmed
				.find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
				.unwrap_or(trimmed.len())
				.max(1);
			let name = trimmed[..name_end].to_ascii_lowercase();
			self.position += name_end;

			let rest = self.rest();
			let after_name = rest.trim_start();
			let value = if let Some(after_equals) = after_name.strip_prefix('=') {
				let value_source = after_equals.trim_start();
				self.position += rest.len() - value_source.len();
				self.attribute_value(value_source)
			} else {
				String::new()
			};

			if !element.has_attribute(&name) {
				element.set_attribute(&name, value);
			}
		}
	}

	fn attribute_value(&mut self, source: &'a str) -> String {
		let (raw, consumed) = match source.chars().next() {
			Some(quote @ ('"' | '\'')) => {
				let body = &source[1..];
				match body.find(quote) {
					Some(end) => (&body[..end], end + 2),
					None => (body, source.len()),
				}
			}
			_ => {
				let end = source
					.find(|c: char| c.is_whitespace() || c == '>')
					.unwrap_or(source.len());
				(&source[..end], end)
			}
		};
		let value = decode_entities(raw).into_owned();
		self.position += consumed;
		value
	}

	fn raw_text(&mut self, element: &Node, tag: &str) {
		let rest = self.rest();
		let closing = format!("</{tag}");
		let end = rest.to_ascii_lowercase().find(&closing).unwrap_or(rest.len());
		let raw = &rest[..end];
		let text = if matches!(tag, "textarea" | "title") {
			decode_entities(raw).into_owned()
		} else {
			raw.to_string()
		};
		if !text.is_empty() {
			element.append_child(&Node::text(text));
		}
		self.position += end;
		if self.position < self.source.len() {
			self.skip_past('>');
		}
	}
}

/// Decodes the named and numeric character references used in templates.
fn decode_entities(text: &str) -> Cow<'_, str> {
	if !text.contains('&') {
		return Cow::Borrowed(text);
	}
	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(index) = rest.find('&') {
		decoded.push_str(&rest[..index]);
		rest = &rest[index..];
		let reference = rest
			.find(';')
			.filter(|end| *end <= 10)
			.and_then(|end| decode_reference(&rest[1..end]).map(|c| (c, end)));
		match reference {
			Some((c, end)) => {
				decoded.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				decoded.push('&');
				rest = &rest[1..];
			}
		}
	}
	decoded.push_str(rest);
	Cow::Owned(decoded)
}

fn decode_reference(reference: &str) -> Option<char> {
	match reference {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let number = reference.strip_prefix('#')?;
			let code = match number.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse::<u32>().ok()?,
			};
			char::from_u32(code)
		}
	}
}

/// Escapes text content (`attribute == false`) or a double-quoted attribute value.
fn escape(text: &str, attribute: bool) -> Cow<'_, str> {
	let needs_escape = |c: char| match c {
		'&' | '\u{a0}' => true,
		'<' | '>' => !attribute,
		'"' => attribute,
		_ => false,
	};
	if !text.contains(needs_escape) {
		return Cow::Borrowed(text);
	}
	let mut escaped = String::with_capacity(text.len() + 8);
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'\u{a0}' => escaped.push_str("&nbsp;"),
			'<' if !attribute => escaped.push_str("&lt;"),
			'>' if !attribute => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			_ => escaped.push(c),
		}
	}
	Cow::Owned(escaped)
}

/// Serializes `node` into `output`. `parent_tag` decides whether text is raw.
pub(super) fn serialize(node: &Node, parent_tag: &str, output: &mut String) {
	if node.is_element() {
		let tag = node.tag_name();
		output.push('<');
		output.push_str(tag);
		for name in node.attribute_names() {
			let value = node.get_attribute(&name).unwrap_or_default();
			output.push(' ');
			output.push_str(&name);
			output.push_str("=\"");
			output.push_str(&escape(&value, true));
			output.push('"');
		}
		output.push('>');
		if VOID_ELEMENTS.contains(&tag) {
			return;
		}
		let children = node.content().unwrap_or_else(|| node.clone()).children();
		for child in &children {
			serialize(child, tag, output);
		}
		output.push_str("</");
		output.push_str(tag);
		output.push('>');
	} else if node.is_text() {
		let data = node.data().unwrap_or_default();
		if matches!(parent_tag, "script" | "style") {
			output.push_str(&data);
		} else {
			output.push_str(&escape(&data, false));
		}
	} else if node.is_comment() {
		output.push_str("<!--");
		output.push_str(&node.data().unwrap_or_default());
		output.push_str("-->");
	} else {
		for child in node.children() {
			serialize(&child, parent_tag, output);
		}
	}
}
