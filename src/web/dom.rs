//! [`DomNode`] for [`web_sys::Element`] and [`Document`] for the page's document.

use crate::{
	dom::{Document, DomNode, Key, KeyHandler, KeyListener, KeyPress, FOCUSABLE},
	error::Failure,
	selector::Selector,
};
use core::fmt;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{DomParser, Element, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, KeyboardEvent, Node, SupportedType};

// Inherent methods of `Element` and `Node` share names with `DomNode`'s, so they're called by path throughout.
impl DomNode for Element {
	fn query(&self, selector: &Selector) -> Option<Self> {
		match Element::query_selector(self, selector.as_str()) {
			Ok(found) => found,
			Err(error) => {
				error!("`querySelector({})` threw: {:?}", selector, error);
				None
			}
		}
	}

	fn query_all(&self, selector: &Selector) -> Vec<Self> {
		match Element::query_selector_all(self, selector.as_str()) {
			Ok(list) => (0..list.length()).filter_map(|i| list.item(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect(),
			Err(error) => {
				error!("`querySelectorAll({})` threw: {:?}", selector, error);
				Vec::new()
			}
		}
	}

	fn attribute(&self, name: &str) -> Option<String> {
		Element::get_attribute(self, name)
	}

	fn set_attribute(&self, name: &str, value: &str) {
		if let Err(error) = Element::set_attribute(self, name, value) {
			error!("Failed to set attribute {:?}: {:?}", name, error);
		}
	}

	fn remove_attribute(&self, name: &str) {
		if let Err(error) = Element::remove_attribute(self, name) {
			error!("Failed to remove attribute {:?}: {:?}", name, error);
		}
	}

	fn text_content(&self) -> String {
		Node::text_content(self).unwrap_or_default()
	}

	fn set_text_content(&self, text: &str) {
		Node::set_text_content(self, Some(text));
	}

	fn value(&self) -> Option<String> {
		if let Some(input) = self.dyn_ref::<HtmlInputElement>() {
			Some(input.value())
		} else if let Some(select) = self.dyn_ref::<HtmlSelectElement>() {
			Some(select.value())
		} else {
			self.dyn_ref::<HtmlTextAreaElement>().map(HtmlTextAreaElement::value)
		}
	}

	fn set_value(&self, value: &str) {
		if let Some(input) = self.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = self.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(text_area) = self.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value);
		} else {
			trace!("`set_value` on an element without a value.");
		}
	}

	fn checked(&self) -> bool {
		self.dyn_ref::<HtmlInputElement>().map_or(false, HtmlInputElement::checked)
	}

	fn replace_children_from(&self, source: &Self) {
		Element::set_inner_html(self, &source.inner_html());
	}

	fn set_inner_html(&self, html: &str) {
		Element::set_inner_html(self, html);
	}

	fn focusable_descendants(&self) -> Vec<Self> {
		let candidates = match Element::query_selector_all(self, FOCUSABLE) {
			Ok(list) => list,
			Err(error) => {
				error!("`querySelectorAll` for focusables threw: {:?}", error);
				return Vec::new();
			}
		};
		(0..candidates.length())
			.filter_map(|i| candidates.item(i))
			.filter_map(|node| node.dyn_into::<Element>().ok())
			.filter(|element| !element.has_attribute("disabled"))
			.filter(|element| element.get_attribute("tabindex").map_or(true, |index| !index.trim().starts_with('-')))
			.filter(|element| !matches!(element.dyn_ref::<HtmlInputElement>(), Some(input) if input.type_() == "hidden"))
			.filter(|element| !matches!(element.closest("[hidden]"), Ok(Some(_))))
			.collect()
	}

	fn focus(&self) {
		match self.dyn_ref::<HtmlElement>() {
			Some(element) => {
				if let Err(error) = element.focus() {
					error!("Failed to focus: {:?}", error);
				}
			}
			None => trace!("Not an `HtmlElement`; can't focus it."),
		}
	}

	fn is_connected(&self) -> bool {
		Node::is_connected(self)
	}

	fn is_same_node(&self, other: &Self) -> bool {
		let other: &Node = other;
		Node::is_same_node(self, Some(other))
	}

	fn contains(&self, other: &Self) -> bool {
		let other: &Node = other;
		Node::contains(self, Some(other))
	}

	fn has_class(&self, class: &str) -> bool {
		self.class_list().contains(class)
	}

	fn add_class(&self, class: &str) {
		if let Err(error) = self.class_list().add_1(class) {
			error!("Failed to add class {:?}: {:?}", class, error);
		}
	}

	fn remove_class(&self, class: &str) {
		if let Err(error) = self.class_list().remove_1(class) {
			error!("Failed to remove class {:?}: {:?}", class, error);
		}
	}
}

/// The page's [`web_sys::Document`].
pub struct WebDocument {
	document: web_sys::Document,
	parser: DomParser,
}

impl fmt::Debug for WebDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDocument").finish_non_exhaustive()
	}
}

impl WebDocument {
	/// # Errors
	///
	/// Iff the browser has no `DOMParser`.
	pub fn new(document: web_sys::Document) -> Result<Self, wasm_bindgen::JsValue> {
		Ok(Self { document, parser: DomParser::new()? })
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

impl Document for WebDocument {
	type Node = Element;

	fn parse_html(&self, html: &str) -> Result<Element, Failure> {
		let parsed = self.parser.parse_from_string(html, SupportedType::TextHtml).map_err(|error| Failure::Parse(format!("{:?}", error)))?;
		parsed.document_element().ok_or_else(|| Failure::Parse("parsed document is empty".into()))
	}

	fn active_element(&self) -> Option<Element> {
		self.document.active_element().or_else(|| self.body())
	}

	fn body(&self) -> Option<Element> {
		self.document.body().map(Into::into)
	}

	fn listen_keys(&self, handler: KeyHandler) -> KeyListener {
		let closure = Closure::wrap(Box::new(move |event: KeyboardEvent| {
			let press = KeyPress { key: Key::from(event.key().as_str()), shift: event.shift_key() };
			if handler(&press) {
				event.prevent_default();
			}
		}) as Box<dyn Fn(KeyboardEvent)>);

		let target: web_sys::EventTarget = self.document.clone().into();
		if let Err(error) = target.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref()) {
			error!("Failed to add keydown listener: {:?}", error);
		}

		KeyListener::new(move || {
			if let Err(error) = target.remove_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref()) {
				error!("Failed to remove keydown listener: {:?}", error);
			}
			// Removal usually happens from inside the listener itself (Escape closing an overlay),
			// and a `Closure` mustn't be dropped while it runs.
			wasm_bindgen_futures::spawn_local(async move {
				drop(closure);
			});
		})
	}
}
