//! A small, browser-free document model.
//!
//! [`VDocument`] and [`VNode`] implement [`Document`] and [`DomNode`], which makes every component in this crate
//! usable (and testable) without a browser. Focus and key listeners are tracked per document; [`VDocument::press_key`]
//! dispatches a key press the way `keydown` listeners on `document` would see it.

mod markup;

pub(crate) use markup::{escape_attribute, escape_text};

use crate::{
	dom::{Document, DomNode, Key, KeyHandler, KeyListener, KeyPress},
	error::Failure,
	selector::Selector,
};
use core::{
	cell::{Cell, RefCell},
	fmt,
};
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Debug)]
enum Kind {
	Document,
	Fragment,
	Element(String),
	Text,
}

struct NodeData {
	kind: Kind,
	attributes: RefCell<Vec<(String, String)>>,
	text: RefCell<String>,
	children: RefCell<Vec<VNode>>,
	parent: RefCell<Weak<NodeData>>,
	/// Only used on [`Kind::Document`] roots.
	focused: RefCell<Option<VNode>>,
}

/// Shared handle to a node. Clones refer to the same node.
#[derive(Clone)]
pub struct VNode(Rc<NodeData>);

impl fmt::Debug for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			Kind::Element(tag) => {
				write!(f, "<{}", tag)?;
				if let Some(id) = self.get_attribute("id") {
					write!(f, " id={:?}", id)?;
				}
				if let Some(class) = self.get_attribute("class") {
					write!(f, " class={:?}", class)?;
				}
				f.write_str(">")
			}
			Kind::Text => write!(f, "#text({:?})", self.0.text.borrow()),
			kind => write!(f, "#{:?}", kind),
		}
	}
}

impl VNode {
	fn new(kind: Kind) -> Self {
		Self(Rc::new(NodeData {
			kind,
			attributes: RefCell::default(),
			text: RefCell::default(),
			children: RefCell::default(),
			parent: RefCell::default(),
			focused: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn element(tag: &str) -> Self {
		Self::new(Kind::Element(tag.to_ascii_lowercase()))
	}

	#[must_use]
	pub fn text(text: &str) -> Self {
		let node = Self::new(Kind::Text);
		*node.0.text.borrow_mut() = text.to_owned();
		node
	}

	/// A detached container, used as the root of parsed markup.
	#[must_use]
	pub fn fragment() -> Self {
		Self::new(Kind::Fragment)
	}

	/// Parses `html` into a new detached fragment.
	///
	/// # Errors
	///
	/// Iff the markup is unterminated.
	pub fn parse(html: &str) -> Result<Self, Failure> {
		let root = Self::fragment();
		markup::parse_into(&root, html)?;
		Ok(root)
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match &self.0.kind {
			Kind::Element(tag) => Some(tag),
			Kind::Document | Kind::Fragment | Kind::Text => None,
		}
	}

	#[must_use]
	pub fn is_text(&self) -> bool {
		matches!(self.0.kind, Kind::Text)
	}

	pub(crate) fn text_data(&self) -> String {
		self.0.text.borrow().clone()
	}

	#[must_use]
	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.0.attributes.borrow().iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	pub(crate) fn push_attribute(&self, name: String, value: String) {
		self.0.attributes.borrow_mut().push((name, value));
	}

	#[must_use]
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.0.attributes.borrow().clone()
	}

	#[must_use]
	pub fn children(&self) -> Vec<VNode> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn parent(&self) -> Option<VNode> {
		self.0.parent.borrow().upgrade().map(VNode)
	}

	/// Moves `child` (out of its current parent, if any) to the end of this node's children.
	pub fn append(&self, child: &VNode) {
		child.detach();
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child.clone());
	}

	/// Removes this node from its parent.
	pub fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.children.borrow_mut().retain(|c| !Rc::ptr_eq(&c.0, &self.0));
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}

	fn clear_children(&self) {
		let children = self.0.children.take();
		for child in &children {
			*child.0.parent.borrow_mut() = Weak::new();
		}
	}

	#[must_use]
	pub fn deep_clone(&self) -> VNode {
		let kind = match &self.0.kind {
			Kind::Document | Kind::Fragment => Kind::Fragment,
			Kind::Element(tag) => Kind::Element(tag.clone()),
			Kind::Text => Kind::Text,
		};
		let clone = VNode::new(kind);
		*clone.0.attributes.borrow_mut() = self.attributes();
		*clone.0.text.borrow_mut() = self.text_data();
		for child in self.children() {
			clone.append(&child.deep_clone());
		}
		clone
	}

	fn root(&self) -> VNode {
		let mut node = self.clone();
		while let Some(parent) = node.parent() {
			node = parent;
		}
		node
	}

	/// Descendants in document order, excluding `self`.
	#[must_use]
	pub fn descendants(&self) -> Vec<VNode> {
		fn walk(node: &VNode, out: &mut Vec<VNode>) {
			for child in node.0.children.borrow().iter() {
				out.push(child.clone());
				walk(child, out);
			}
		}
		let mut out = Vec::new();
		walk(self, &mut out);
		out
	}

	fn matches(&self, selector: &Selector) -> bool {
		match &self.0.kind {
			Kind::Element(tag) => {
				let attributes = self.0.attributes.borrow();
				selector.matches(tag, |name| attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str()))
			}
			Kind::Document | Kind::Fragment | Kind::Text => false,
		}
	}

	fn is_focusable(&self) -> bool {
		let Some(tag) = self.tag() else {
			return false;
		};
		if self.get_attribute("disabled").is_some() {
			return false;
		}
		match self.get_attribute("tabindex") {
			Some(index) if index.trim().starts_with('-') => return false,
			Some(_) => return true,
			None => (),
		}
		match tag {
			"a" => self.get_attribute("href").is_some(),
			"input" => self.get_attribute("type").as_deref() != Some("hidden"),
			"button" | "select" | "textarea" | "summary" => true,
			_ => false,
		}
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut out = String::new();
		markup::write_node(self, &mut out);
		out
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		for child in self.children() {
			markup::write_node(&child, &mut out);
		}
		out
	}
}

impl DomNode for VNode {
	fn query(&self, selector: &Selector) -> Option<Self> {
		self.descendants().into_iter().find(|node| node.matches(selector))
	}

	fn query_all(&self, selector: &Selector) -> Vec<Self> {
		self.descendants().into_iter().filter(|node| node.matches(selector)).collect()
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.get_attribute(name)
	}

	fn set_attribute(&self, name: &str, value: &str) {
		let mut attributes = self.0.attributes.borrow_mut();
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => value.clone_into(existing),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	fn remove_attribute(&self, name: &str) {
		self.0.attributes.borrow_mut().retain(|(n, _)| n != name);
	}

	fn text_content(&self) -> String {
		if self.is_text() {
			return self.text_data();
		}
		self.descendants().iter().filter(|node| node.is_text()).map(VNode::text_data).collect()
	}

	fn set_text_content(&self, text: &str) {
		if self.is_text() {
			text.clone_into(&mut self.0.text.borrow_mut());
			return;
		}
		self.clear_children();
		if !text.is_empty() {
			self.append(&VNode::text(text));
		}
	}

	fn value(&self) -> Option<String> {
		if self.tag() == Some("select") {
			let options: Vec<VNode> = self.descendants().into_iter().filter(|node| node.tag() == Some("option")).collect();
			let selected = options.iter().find(|option| option.get_attribute("selected").is_some()).or_else(|| options.first())?;
			return Some(selected.get_attribute("value").unwrap_or_else(|| selected.text_content()));
		}
		self.get_attribute("value")
	}

	fn set_value(&self, value: &str) {
		if self.tag() == Some("select") {
			for option in self.descendants().into_iter().filter(|node| node.tag() == Some("option")) {
				if option.get_attribute("value").as_deref() == Some(value) {
					option.set_attribute("selected", "");
				} else {
					option.remove_attribute("selected");
				}
			}
			return;
		}
		self.set_attribute("value", value);
	}

	fn replace_children_from(&self, source: &Self) {
		self.clear_children();
		for child in source.children() {
			self.append(&child.deep_clone());
		}
	}

	fn set_inner_html(&self, html: &str) {
		match VNode::parse(html) {
			Ok(parsed) => self.replace_children_from(&parsed),
			Err(error) => {
				// Mirrors the browser, which never rejects markup: fall back to text.
				trace!(%error, "Unparsable markup assigned as text.");
				self.set_text_content(html);
			}
		}
	}

	fn focusable_descendants(&self) -> Vec<Self> {
		fn walk(node: &VNode, out: &mut Vec<VNode>) {
			for child in node.0.children.borrow().iter() {
				if child.get_attribute("hidden").is_some() {
					continue;
				}
				if child.is_focusable() {
					out.push(child.clone());
				}
				walk(child, out);
			}
		}
		let mut out = Vec::new();
		walk(self, &mut out);
		out
	}

	fn focus(&self) {
		let root = self.root();
		if matches!(root.0.kind, Kind::Document) {
			*root.0.focused.borrow_mut() = Some(self.clone());
		}
	}

	fn is_connected(&self) -> bool {
		matches!(self.root().0.kind, Kind::Document)
	}

	fn is_same_node(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn contains(&self, other: &Self) -> bool {
		let mut node = Some(other.clone());
		while let Some(current) = node {
			if current.is_same_node(self) {
				return true;
			}
			node = current.parent();
		}
		false
	}
}

type SharedKeyHandler = Rc<dyn Fn(&KeyPress) -> bool>;

/// An in-memory document: a root holding `<body>`.
pub struct VDocument {
	root: VNode,
	body: VNode,
	listeners: Rc<RefCell<Vec<(u64, SharedKeyHandler)>>>,
	next_listener: Cell<u64>,
}

impl fmt::Debug for VDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VDocument")
			.field("body", &self.body)
			.field("key_listeners", &self.key_listener_count())
			.finish_non_exhaustive()
	}
}

impl Default for VDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl VDocument {
	#[must_use]
	pub fn new() -> Self {
		let root = VNode::new(Kind::Document);
		let body = VNode::element("body");
		root.append(&body);
		Self {
			root,
			body,
			listeners: Rc::default(),
			next_listener: Cell::new(0),
		}
	}

	/// A document whose `<body>` contains `body_html`.
	///
	/// # Errors
	///
	/// Iff the markup is unterminated.
	pub fn from_body(body_html: &str) -> Result<Self, Failure> {
		let document = Self::new();
		markup::parse_into(&document.body, body_html)?;
		Ok(document)
	}

	#[must_use]
	pub fn body_node(&self) -> VNode {
		self.body.clone()
	}

	/// First element in the document matching `selector`.
	///
	/// # Panics
	///
	/// Iff `selector` is invalid.
	#[must_use]
	pub fn select(&self, selector: &str) -> Option<VNode> {
		let selector = Selector::parse(selector).unwrap_or_else(|error| panic!("invalid selector {:?}: {}", selector, error));
		self.body.query(&selector)
	}

	#[must_use]
	pub fn key_listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Dispatches `press` to all key listeners. Unhandled Tab presses move focus in document order, like a browser would.
	///
	/// Returns whether a listener handled the press.
	pub fn press_key(&self, press: &KeyPress) -> bool {
		let handlers: Vec<SharedKeyHandler> = self.listeners.borrow().iter().map(|(_, handler)| Rc::clone(handler)).collect();
		let mut handled = false;
		for handler in handlers {
			handled |= handler(press);
		}

		if !handled && press.key == Key::Tab {
			let focusable = self.body.focusable_descendants();
			let current = self.active_element().and_then(|active| focusable.iter().position(|f| f.is_same_node(&active)));
			let next = match (current, press.shift) {
				(Some(i), false) => focusable.get(i + 1),
				(Some(i), true) => i.checked_sub(1).and_then(|i| focusable.get(i)),
				(None, false) => focusable.first(),
				(None, true) => focusable.last(),
			};
			match next {
				Some(next) => next.focus(),
				None => self.body.focus(),
			}
		}
		handled
	}
}

impl Document for VDocument {
	type Node = VNode;

	fn parse_html(&self, html: &str) -> Result<VNode, Failure> {
		VNode::parse(html)
	}

	fn active_element(&self) -> Option<VNode> {
		let focused = self.root.0.focused.borrow().clone();
		match focused {
			Some(node) if node.is_connected() => Some(node),
			_ => Some(self.body.clone()),
		}
	}

	fn body(&self) -> Option<VNode> {
		Some(self.body.clone())
	}

	fn listen_keys(&self, handler: KeyHandler) -> KeyListener {
		let id = self.next_listener.get() + 1;
		self.next_listener.set(id);
		self.listeners.borrow_mut().push((id, Rc::from(handler)));
		let listeners = Rc::downgrade(&self.listeners);
		KeyListener::new(move || {
			if let Some(listeners) = listeners.upgrade() {
				listeners.borrow_mut().retain(|(existing, _)| *existing != id);
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn focus_tracks_connectivity() {
		let document = VDocument::from_body("<button id=a>A</button><div id=box><button id=b>B</button></div>").unwrap();
		let b = document.select("#b").unwrap();
		b.focus();
		assert!(document.active_element().unwrap().is_same_node(&b));

		document.select("#box").unwrap().detach();
		assert!(!b.is_connected());
		assert!(document.active_element().unwrap().is_same_node(&document.body_node()));
	}

	#[test]
	fn focusable_descendants_skip_hidden_and_disabled() {
		let document = VDocument::from_body(
			r#"<div id=panel>
				<a>no href</a><a href="/x">x</a>
				<button disabled>off</button>
				<div hidden><button>hidden</button></div>
				<input type="hidden"><input name="q">
				<span tabindex="0">span</span><span tabindex="-1">skip</span>
			</div>"#,
		)
		.unwrap();
		let panel = document.select("#panel").unwrap();
		let tags: Vec<String> = panel.focusable_descendants().iter().map(|n| n.tag().unwrap_or_default().to_owned()).collect();
		assert_eq!(tags, ["a", "input", "span"]);
	}

	#[test]
	fn replace_children_copies_and_keeps_own_attributes() {
		let document = VDocument::from_body(r#"<div id=live class="is-open"><p>old</p></div>"#).unwrap();
		let incoming = VNode::parse(r#"<div id=live><p>new</p><p>more</p></div>"#).unwrap();
		let live = document.select("#live").unwrap();
		live.replace_children_from(&incoming.children()[0]);
		assert_eq!(live.outer_html(), r#"<div id="live" class="is-open"><p>new</p><p>more</p></div>"#);
		// The source tree is untouched.
		assert_eq!(incoming.children()[0].children().len(), 2);
	}

	#[test]
	fn unhandled_tab_moves_in_document_order() {
		let document = VDocument::from_body("<button id=a>A</button><button id=b>B</button>").unwrap();
		document.press_key(&KeyPress::new(Key::Tab));
		assert_eq!(document.active_element().unwrap().get_attribute("id").as_deref(), Some("a"));
		document.press_key(&KeyPress::new(Key::Tab));
		assert_eq!(document.active_element().unwrap().get_attribute("id").as_deref(), Some("b"));
		document.press_key(&KeyPress::shifted(Key::Tab));
		assert_eq!(document.active_element().unwrap().get_attribute("id").as_deref(), Some("a"));
	}

	#[test]
	fn key_listeners_unregister_on_drop() {
		let document = VDocument::new();
		let listener = document.listen_keys(Box::new(|press: &KeyPress| press.key == Key::Escape));
		assert_eq!(document.key_listener_count(), 1);
		assert!(document.press_key(&KeyPress::new(Key::Escape)));
		drop(listener);
		assert_eq!(document.key_listener_count(), 0);
		assert!(!document.press_key(&KeyPress::new(Key::Escape)));
	}
}
