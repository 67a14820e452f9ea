//! The slide-out cart.
//!
//! Opens when an item is added. While open it follows `cart.updated`, preferring bundled fragments; while closed it only
//! marks itself stale and refreshes once on the next open.

use crate::{
	bus::SubscriptionSet,
	dom::{Document, DomNode},
	event::{CartItemAdded, CartUpdated, DomainEvent, EventKind},
	focus::focus_first,
	model::Sections,
	overlay::{Overlay, OverlayOptions, Panel},
	page::Page,
	region::{Refresh, SectionView},
	selector::{selector, selectors},
};
use core::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, warn};

pub const SECTION_ID: &str = "cart-drawer";

struct Inner<D: Document> {
	page: Page<D>,
	overlay: Overlay<D>,
	section: SectionView<D>,
	subscriptions: SubscriptionSet,
}

pub struct CartDrawer<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for CartDrawer<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for CartDrawer<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CartDrawer").field("overlay", &self.0.overlay).field("section", &self.0.section).finish_non_exhaustive()
	}
}

impl<D: Document> CartDrawer<D> {
	/// Binds to the `<cart-drawer>` element `root`.
	pub fn attach(page: &Page<D>, root: D::Node) -> Self {
		let overlay = Overlay::new(Rc::clone(&page.document), page.bus.clone(), root.clone(), OverlayOptions::new(SECTION_ID));
		let section = SectionView::with_optional(
			Rc::clone(&page.document),
			page.fragments.clone(),
			root,
			SECTION_ID,
			selectors(&[".drawer__contents"]),
			selectors(&[".drawer__footer"]),
		);
		let drawer = Self(Rc::new(Inner {
			page: page.clone(),
			overlay,
			section,
			subscriptions: SubscriptionSet::new(),
		}));

		let weak = Rc::downgrade(&drawer.0);
		drawer.0.overlay.set_refresh_hook({
			let weak = Weak::clone(&weak);
			move || {
				if let Some(drawer) = weak.upgrade() {
					CartDrawer(drawer).sync(&Sections::new(), false);
				}
			}
		});

		let subscriptions = &drawer.0.subscriptions;
		subscriptions.push(page.bus.subscribe(EventKind::CartItemAdded, {
			let weak = Weak::clone(&weak);
			move |event| {
				if let (Some(drawer), DomainEvent::CartItemAdded(CartItemAdded { sections, .. })) = (weak.upgrade(), event) {
					CartDrawer(drawer).sync(sections, true);
				}
			}
		}));
		subscriptions.push(page.bus.subscribe(EventKind::CartUpdated, move |event| {
			if let (Some(drawer), DomainEvent::CartUpdated(CartUpdated { sections, .. })) = (weak.upgrade(), event) {
				CartDrawer(drawer).on_cart_updated(sections);
			}
		}));

		drawer
	}

	#[must_use]
	pub fn overlay(&self) -> &Overlay<D> {
		&self.0.overlay
	}

	#[must_use]
	pub fn section(&self) -> &SectionView<D> {
		&self.0.section
	}

	fn on_cart_updated(&self, sections: &Sections) {
		if self.0.overlay.is_open() {
			self.sync(sections, false);
		} else {
			// Don't touch a closed drawer. It catches up on open.
			self.0.overlay.mark_stale();
		}
	}

	/// Brings the contents up to date from `sections` or a fetch, then opens the drawer if `open_after`.
	#[instrument(skip(self, sections))]
	fn sync(&self, sections: &Sections, open_after: bool) {
		let endpoint = match self.0.page.cart_url() {
			Ok(endpoint) => endpoint,
			Err(error) => {
				warn!(%error, "Can't refresh the cart drawer.");
				return;
			}
		};
		let pending = self.0.section.apply_bundle_or_refresh(sections, endpoint);
		let weak = Rc::downgrade(&self.0);
		self.0.page.spawn(async move {
			let outcome = pending.await;
			let Some(drawer) = weak.upgrade().map(CartDrawer) else {
				return;
			};
			drawer.settle(&outcome);
			if open_after && !matches!(outcome, Refresh::Detached) {
				drawer.open();
			}
		});
	}

	fn settle(&self, outcome: &Refresh<D::Node>) {
		if !outcome.is_applied() {
			return;
		}
		let root = self.0.overlay.root();
		self.0.overlay.mark_fresh();
		root.toggle_class("is-empty", root.query(&selector(".cart-item")).is_none());

		// The merge may have replaced the focused element.
		if self.0.overlay.is_open() {
			let inside = self.0.page.document.active_element().map_or(false, |active| !active.is_same_node(root) && root.contains(&active));
			if !inside {
				debug!("Focus was lost in the merge; moving it back into the drawer.");
				focus_first(root);
			}
		}
	}
}

impl<D: Document> Panel for CartDrawer<D> {
	fn open(&self) {
		self.0.overlay.open();
	}

	fn close(&self) {
		self.0.overlay.close();
	}

	fn is_open(&self) -> bool {
		self.0.overlay.is_open()
	}
}
