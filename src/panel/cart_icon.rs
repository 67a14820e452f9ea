//! The header cart link and its item count bubble.

use crate::{
	bus::SubscriptionSet,
	dom::Document,
	event::EventKind,
	model::Sections,
	page::Page,
	region::SectionView,
	selector::Selector,
};
use core::fmt;
use std::rc::Rc;
use tracing::warn;

pub const SECTION_ID: &str = "cart-icon-bubble";

struct Inner<D: Document> {
	page: Page<D>,
	section: SectionView<D>,
	subscriptions: SubscriptionSet,
}

/// Keeps `#cart-icon-bubble` in step with the cart. Not an overlay.
pub struct CartIcon<D: Document>(Rc<Inner<D>>);

impl<D: Document> fmt::Debug for CartIcon<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CartIcon").field("section", &self.0.section).finish_non_exhaustive()
	}
}

impl<D: Document> CartIcon<D> {
	/// `container` is the element holding `#cart-icon-bubble`, usually the header.
	pub fn attach(page: &Page<D>, container: D::Node) -> Self {
		let section = SectionView::new(Rc::clone(&page.document), page.fragments.clone(), container, SECTION_ID, vec![Selector::id(SECTION_ID)]);
		let icon = Self(Rc::new(Inner {
			page: page.clone(),
			section,
			subscriptions: SubscriptionSet::new(),
		}));
		for kind in [EventKind::CartUpdated, EventKind::CartItemAdded] {
			let weak = Rc::downgrade(&icon.0);
			icon.0.subscriptions.push(page.bus.subscribe(kind, move |event| {
				if let (Some(icon), Some(sections)) = (weak.upgrade(), event.sections()) {
					CartIcon(icon).refresh(sections);
				}
			}));
		}
		icon
	}

	#[must_use]
	pub fn section(&self) -> &SectionView<D> {
		&self.0.section
	}

	fn refresh(&self, sections: &Sections) {
		let endpoint = match self.0.page.cart_url() {
			Ok(endpoint) => endpoint,
			Err(error) => {
				warn!(%error, "Can't refresh the cart icon.");
				return;
			}
		};
		let pending = self.0.section.apply_bundle_or_refresh(sections, endpoint);
		self.0.page.spawn(async move {
			// Failures keep the last known count.
			pending.await;
		});
	}
}
