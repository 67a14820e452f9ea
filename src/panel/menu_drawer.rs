//! Mobile navigation.

use crate::{
	dom::{Document, DomNode, Key, KeyPress},
	focus::focus_first,
	overlay::{Overlay, OverlayOptions, Panel},
	page::Page,
};
use core::{cell::RefCell, fmt};
use std::rc::Rc;
use tracing::trace;

const SUBMENU_OPEN_CLASS: &str = "submenu-open";

struct Inner<D: Document> {
	overlay: Overlay<D>,
	/// Open submenu and the element that opened it.
	submenu: RefCell<Option<(D::Node, D::Node)>>,
}

/// A drawer with one level of submenus. Escape closes an open submenu before it closes the drawer.
pub struct MenuDrawer<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for MenuDrawer<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for MenuDrawer<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MenuDrawer")
			.field("overlay", &self.0.overlay)
			.field("submenu", &self.0.submenu.borrow().as_ref().map(|(submenu, _)| submenu.clone()))
			.finish()
	}
}

impl<D: Document> MenuDrawer<D> {
	pub fn attach(page: &Page<D>, root: D::Node) -> Self {
		Self::with_overlay(Overlay::new(Rc::clone(&page.document), page.bus.clone(), root, OverlayOptions::new("menu-drawer").open_class("menu-opening")))
	}

	fn with_overlay(overlay: Overlay<D>) -> Self {
		let drawer = Self(Rc::new(Inner { overlay, submenu: RefCell::default() }));
		let weak = Rc::downgrade(&drawer.0);
		drawer.0.overlay.set_key_hook(move |press: &KeyPress| {
			let drawer = weak.upgrade().map(MenuDrawer)?;
			(press.key == Key::Escape && drawer.close_submenu()).then_some(true)
		});
		drawer
	}

	#[must_use]
	pub fn overlay(&self) -> &Overlay<D> {
		&self.0.overlay
	}

	/// Opens `submenu`, remembering `trigger` to return focus to. Closes any other open submenu first.
	pub fn open_submenu(&self, submenu: D::Node, trigger: D::Node) {
		self.close_submenu();
		submenu.add_class(SUBMENU_OPEN_CLASS);
		trigger.set_attribute("aria-expanded", "true");
		focus_first(&submenu);
		trace!("Submenu opened.");
		*self.0.submenu.borrow_mut() = Some((submenu, trigger));
	}

	/// Returns whether a submenu was open.
	pub fn close_submenu(&self) -> bool {
		let Some((submenu, trigger)) = self.0.submenu.borrow_mut().take() else {
			return false;
		};
		submenu.remove_class(SUBMENU_OPEN_CLASS);
		trigger.set_attribute("aria-expanded", "false");
		if trigger.is_connected() {
			trigger.focus();
		}
		trace!("Submenu closed.");
		true
	}

	#[must_use]
	pub fn has_open_submenu(&self) -> bool {
		self.0.submenu.borrow().is_some()
	}
}

impl<D: Document> Panel for MenuDrawer<D> {
	fn open(&self) {
		self.0.overlay.open();
	}

	fn close(&self) {
		self.close_submenu();
		self.0.overlay.close();
	}

	fn is_open(&self) -> bool {
		self.0.overlay.is_open()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		bus::EventBus,
		vdom::{VDocument, VNode},
	};

	// Only the overlay is needed here, so this skips `Page`.
	fn drawer(document: &Rc<VDocument>) -> MenuDrawer<VDocument> {
		MenuDrawer::with_overlay(Overlay::new(Rc::clone(document), EventBus::new(), document.select("#menu").unwrap(), OverlayOptions::new("menu-drawer").open_class("menu-opening")))
	}

	fn id(node: Option<VNode>) -> Option<String> {
		node.and_then(|n| n.get_attribute("id"))
	}

	#[test]
	fn escape_unwinds_submenu_then_drawer() {
		let document = Rc::new(
			VDocument::from_body(
				r#"<button id="hamburger">Menu</button>
				<div id="menu">
					<button id="shop" aria-expanded="false">Shop</button>
					<div id="shop-submenu"><a id="shirts" href="/collections/shirts">Shirts</a></div>
				</div>"#,
			)
			.unwrap(),
		);
		let drawer = drawer(&document);
		document.select("#hamburger").unwrap().focus();
		drawer.open();
		assert!(document.select("#menu").unwrap().has_class("menu-opening"));

		drawer.open_submenu(document.select("#shop-submenu").unwrap(), document.select("#shop").unwrap());
		assert_eq!(id(document.active_element()).as_deref(), Some("shirts"));
		assert_eq!(document.select("#shop").unwrap().get_attribute("aria-expanded").as_deref(), Some("true"));

		document.press_key(&KeyPress::new(Key::Escape));
		assert!(drawer.is_open());
		assert!(!drawer.has_open_submenu());
		assert_eq!(id(document.active_element()).as_deref(), Some("shop"));

		document.press_key(&KeyPress::new(Key::Escape));
		assert!(!drawer.is_open());
		assert_eq!(id(document.active_element()).as_deref(), Some("hamburger"));
	}
}
