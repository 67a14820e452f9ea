//! The slice of the DOM the coordination layer touches.
//!
//! Implemented for [`web_sys::Element`] in [`crate::web`] and for the browser-free [`crate::vdom`].
//! Nodes are cheap, shared handles (like `web_sys::Element`), so every mutating method takes `&self`.

use crate::{error::Failure, selector::Selector};
use core::fmt;

/// Elements that can receive keyboard focus, unless disabled or hidden.
pub const FOCUSABLE: &str = "a[href], button, input, select, textarea, summary, [tabindex]";

pub trait DomNode: 'static + Clone + fmt::Debug {
	/// First matching descendant, in document order.
	fn query(&self, selector: &Selector) -> Option<Self>;
	fn query_all(&self, selector: &Selector) -> Vec<Self>;

	fn attribute(&self, name: &str) -> Option<String>;
	fn set_attribute(&self, name: &str, value: &str);
	fn remove_attribute(&self, name: &str);

	fn text_content(&self) -> String;
	fn set_text_content(&self, text: &str);

	/// The current form value of an `<input>`, `<select>` or `<textarea>`.
	fn value(&self) -> Option<String>;
	fn set_value(&self, value: &str);

	/// Checkedness of a checkbox or radio button.
	fn checked(&self) -> bool {
		self.attribute("checked").is_some()
	}

	/// Replaces this node's children with copies of `source`'s children. `self` keeps its own attributes.
	fn replace_children_from(&self, source: &Self);
	fn set_inner_html(&self, html: &str);

	/// Focusable descendants in tab order, excluding disabled elements and those inside a `[hidden]` subtree.
	fn focusable_descendants(&self) -> Vec<Self>;
	fn focus(&self);

	/// Whether this node is (still) part of its document.
	fn is_connected(&self) -> bool;
	fn is_same_node(&self, other: &Self) -> bool;
	/// Inclusive descendant check, like `Node.contains`.
	fn contains(&self, other: &Self) -> bool;

	fn has_class(&self, class: &str) -> bool {
		self.attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
	}

	fn add_class(&self, class: &str) {
		if !self.has_class(class) {
			let classes = self.attribute("class").unwrap_or_default();
			let classes = if classes.trim().is_empty() { class.to_owned() } else { format!("{} {}", classes.trim(), class) };
			self.set_attribute("class", &classes);
		}
	}

	fn remove_class(&self, class: &str) {
		if let Some(classes) = self.attribute("class") {
			let remaining = classes.split_whitespace().filter(|c| *c != class).collect::<Vec<_>>().join(" ");
			self.set_attribute("class", &remaining);
		}
	}

	fn toggle_class(&self, class: &str, on: bool) {
		if on {
			self.add_class(class);
		} else {
			self.remove_class(class);
		}
	}

	fn is_hidden(&self) -> bool {
		self.attribute("hidden").is_some()
	}

	fn set_hidden(&self, hidden: bool) {
		if hidden {
			self.set_attribute("hidden", "");
		} else {
			self.remove_attribute("hidden");
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
	Escape,
	Tab,
	Other(String),
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		match key {
			"Escape" | "Esc" => Key::Escape,
			"Tab" => Key::Tab,
			other => Key::Other(other.to_owned()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
	pub key: Key,
	pub shift: bool,
}

impl KeyPress {
	#[must_use]
	pub fn new(key: Key) -> Self {
		Self { key, shift: false }
	}

	#[must_use]
	pub fn shifted(key: Key) -> Self {
		Self { key, shift: true }
	}
}

/// Returns `true` iff the press was handled and the default action must be suppressed.
pub type KeyHandler = Box<dyn Fn(&KeyPress) -> bool>;

/// A registered document-level key listener. Removes itself when dropped.
#[must_use = "Dropping the `KeyListener` removes the listener immediately."]
pub struct KeyListener(Option<Box<dyn FnOnce()>>);

impl KeyListener {
	pub fn new(remove: impl 'static + FnOnce()) -> Self {
		Self(Some(Box::new(remove)))
	}
}

impl fmt::Debug for KeyListener {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("KeyListener").finish()
	}
}

impl Drop for KeyListener {
	fn drop(&mut self) {
		if let Some(remove) = self.0.take() {
			remove();
		}
	}
}

pub trait Document: 'static {
	type Node: DomNode;

	/// Parses a server-rendered HTML document or fragment into a detached tree and returns its root.
	///
	/// # Errors
	///
	/// [`Failure::Parse`] iff the markup can't be turned into a tree at all.
	fn parse_html(&self, html: &str) -> Result<Self::Node, Failure>;

	/// The focused element, or `<body>` if nothing is.
	fn active_element(&self) -> Option<Self::Node>;
	fn body(&self) -> Option<Self::Node>;

	fn listen_keys(&self, handler: KeyHandler) -> KeyListener;
}
