//! Lenient markup reader and writer for [`VNode`] trees.
//!
//! This is not the HTML5 parsing algorithm. It handles what server-rendered sections contain in practice:
//! nested elements, quoted/unquoted/bare attributes, void elements, `<script>`/`<style>` raw text,
//! comments, doctypes and the common character references. Stray end tags are ignored and unclosed
//! elements are closed at the end of input.

use super::VNode;
use crate::error::Failure;

fn is_void_element(name: &str) -> bool {
	matches!(
		name,
		"area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "param" | "source" | "track" | "wbr"
	)
}

fn is_raw_text_element(name: &str) -> bool {
	matches!(name, "script" | "style")
}

fn is_tag_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
}

/// Appends the nodes parsed from `input` to `parent`.
pub(super) fn parse_into(parent: &VNode, input: &str) -> Result<(), Failure> {
	let mut open = vec![parent.clone()];
	let mut rest = input;

	while !rest.is_empty() {
		let top = open.last().cloned().unwrap_or_else(|| parent.clone());

		if let Some(comment) = rest.strip_prefix("<!--") {
			let end = comment.find("-->").ok_or_else(|| Failure::parse("unterminated comment"))?;
			rest = &comment[end + 3..];
		} else if rest.starts_with("<!") || rest.starts_with("<?") {
			let end = rest.find('>').ok_or_else(|| Failure::parse("unterminated declaration"))?;
			rest = &rest[end + 1..];
		} else if let Some(end_tag) = rest.strip_prefix("</") {
			let end = end_tag.find('>').ok_or_else(|| Failure::parse("unterminated end tag"))?;
			let name = end_tag[..end].trim().to_ascii_lowercase();
			// Never pop `parent` itself.
			if let Some(position) = open.iter().skip(1).rposition(|node| node.tag() == Some(name.as_str())) {
				open.truncate(position + 1);
			}
			rest = &end_tag[end + 1..];
		} else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
			let (element, self_closing, after) = parse_start_tag(&rest[1..])?;
			top.append(&element);
			rest = after;

			let name = element.tag().unwrap_or_default().to_owned();
			if is_raw_text_element(&name) {
				let close = format!("</{}", name);
				let end = find_ignore_ascii_case(rest, &close).unwrap_or(rest.len());
				if end > 0 {
					element.append(&VNode::text(&rest[..end]));
				}
				rest = &rest[end..];
				if let Some(gt) = rest.find('>') {
					rest = &rest[gt + 1..];
				}
			} else if !self_closing && !is_void_element(&name) {
				open.push(element);
			}
		} else {
			let first = rest.chars().next().map_or(1, char::len_utf8);
			let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
			top.append(&VNode::text(&decode_entities(&rest[..end])));
			rest = &rest[end..];
		}
	}

	Ok(())
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
	let needle = needle.as_bytes();
	haystack.as_bytes().windows(needle.len()).position(|window| window.eq_ignore_ascii_case(needle))
}

/// Parses `name attr=value …>` (the leading `<` already consumed).
fn parse_start_tag(input: &str) -> Result<(VNode, bool, &str), Failure> {
	let name_end = input.find(|c: char| !is_tag_name_char(c)).unwrap_or(input.len());
	let element = VNode::element(&input[..name_end].to_ascii_lowercase());
	let mut rest = &input[name_end..];

	loop {
		rest = rest.trim_start();
		if let Some(after) = rest.strip_prefix("/>") {
			return Ok((element, true, after));
		}
		if let Some(after) = rest.strip_prefix('>') {
			return Ok((element, false, after));
		}
		if let Some(after) = rest.strip_prefix('/') {
			rest = after;
			continue;
		}
		if rest.is_empty() {
			return Err(Failure::parse(format!("unterminated <{}> tag", element.tag().unwrap_or_default())));
		}

		let name_end = rest.find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/')).unwrap_or(rest.len());
		let name = rest[..name_end].to_ascii_lowercase();
		rest = rest[name_end..].trim_start();

		let value = if let Some(after) = rest.strip_prefix('=') {
			let after = after.trim_start();
			match after.chars().next() {
				Some(quote @ ('"' | '\'')) => {
					let body = &after[1..];
					let end = body.find(quote).ok_or_else(|| Failure::parse(format!("unterminated value of attribute {:?}", name)))?;
					rest = &body[end + 1..];
					decode_entities(&body[..end])
				}
				_ => {
					let end = after.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(after.len());
					rest = &after[end..];
					decode_entities(&after[..end])
				}
			}
		} else {
			String::new()
		};

		if !name.is_empty() && element.get_attribute(&name).is_none() {
			element.push_attribute(name, value);
		}
	}
}

pub(super) fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_owned();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];
		let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
			let entity = &rest[1..end];
			let c = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix("#x")
					.or_else(|| entity.strip_prefix("#X"))
					.and_then(|hex| u32::from_str_radix(hex, 16).ok())
					.or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
					.and_then(char::from_u32),
			}?;
			Some((c, end))
		});
		match decoded {
			Some((c, end)) => {
				out.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

pub(crate) fn escape_attribute(value: &str, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
}

pub(super) fn write_node(node: &VNode, out: &mut String) {
	match node.tag() {
		None if node.is_text() => {
			let raw = node.parent().and_then(|p| p.tag().map(is_raw_text_element)).unwrap_or(false);
			let text = node.text_data();
			if raw {
				out.push_str(&text);
			} else {
				escape_text(&text, out);
			}
		}
		None => {
			for child in node.children() {
				write_node(&child, out);
			}
		}
		Some(tag) => {
			out.push('<');
			out.push_str(tag);
			for (name, value) in node.attributes() {
				out.push(' ');
				out.push_str(&name);
				out.push_str("=\"");
				escape_attribute(&value, out);
				out.push('"');
			}
			out.push('>');
			if !is_void_element(tag) {
				for child in node.children() {
					write_node(&child, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}
}
