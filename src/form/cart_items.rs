//! Line items on the cart page and in the drawer.
//!
//! Quantity edits are debounced per line and committed through `/cart/change.js` with the cart sections bundled.
//! Only the response to the latest commit is applied and published; an older one arriving late would show a cart
//! that no longer exists.

use crate::{
	bus::SubscriptionSet,
	debounce::CommandQueue,
	dom::{Document, DomNode},
	error::Failure,
	event::{CartItemRemoved, CartUpdated, DomainEvent, EventKind},
	model::Sections,
	page::Page,
	panel::{cart_drawer, cart_icon},
	region::SectionView,
	selector::{selector, Selector},
	sync::TokenCounter,
};
use core::fmt;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

const LOADING_CLASS: &str = "loading";

struct Inner<D: Document> {
	page: Page<D>,
	section: SectionView<D>,
	/// Sections bundled with each change: our own, then the drawer's and the icon's.
	sections: Vec<String>,
	queue: CommandQueue,
	tokens: TokenCounter,
	source: String,
	subscriptions: SubscriptionSet,
}

/// A `<cart-items>` element rendered as section `section_id`.
pub struct CartItems<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for CartItems<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for CartItems<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CartItems").field("source", &self.0.source).field("section", &self.0.section).finish_non_exhaustive()
	}
}

impl<D: Document> CartItems<D> {
	/// `regions` are the parts of `root` replaced when the section is re-rendered.
	///
	/// Follows cart changes published by other components; its own are applied directly.
	pub fn attach(page: &Page<D>, root: D::Node, section_id: &str, regions: Vec<Selector>) -> Self {
		let mut sections = vec![section_id.to_owned()];
		for id in [cart_drawer::SECTION_ID, cart_icon::SECTION_ID] {
			if !sections.iter().any(|s| s == id) {
				sections.push(id.to_owned());
			}
		}
		let items = Self(Rc::new(Inner {
			page: page.clone(),
			section: SectionView::new(Rc::clone(&page.document), page.fragments.clone(), root, section_id, regions),
			sections,
			queue: CommandQueue::new(Rc::clone(&page.scheduler)),
			tokens: TokenCounter::new(),
			source: format!("cart-items-{}", section_id),
			subscriptions: SubscriptionSet::new(),
		}));

		for kind in [EventKind::CartUpdated, EventKind::CartItemAdded] {
			let weak = Rc::downgrade(&items.0);
			items.0.subscriptions.push(page.bus.subscribe(kind, move |event| {
				let Some(items) = weak.upgrade().map(CartItems) else { return };
				if event.source() == Some(items.0.source.as_str()) {
					return;
				}
				if let Some(sections) = event.sections() {
					items.follow(sections);
				}
			}));
		}
		items
	}

	#[must_use]
	pub fn section(&self) -> &SectionView<D> {
		&self.0.section
	}

	/// Id this component publishes under.
	#[must_use]
	pub fn source(&self) -> &str {
		&self.0.source
	}

	#[must_use]
	pub fn is_pending(&self, line: u32) -> bool {
		self.0.queue.is_pending(&line_key(line))
	}

	/// Commits `quantity` for the 1-based `line` once edits have settled.
	#[instrument(skip(self))]
	pub fn set_quantity(&self, line: u32, quantity: u32) {
		let weak = Rc::downgrade(&self.0);
		self.0.queue.schedule(&line_key(line), self.0.page.config.timings.quantity_debounce(), move || {
			if let Some(items) = weak.upgrade().map(CartItems) {
				items.commit(line, quantity);
			}
		});
	}

	/// Removes `line` right away, dropping any edit still pending for it.
	pub fn remove(&self, line: u32) {
		self.0.queue.cancel(&line_key(line));
		self.commit(line, 0);
	}

	#[instrument(skip(self))]
	fn commit(&self, line: u32, quantity: u32) {
		let token = self.0.tokens.issue();
		self.set_loading(line, true);
		self.hide_error(line);

		let weak = Rc::downgrade(&self.0);
		let cart = self.0.page.cart.clone();
		let sections_url = self.0.page.sections_url();
		let requested = self.0.sections.clone();
		self.0.page.spawn(async move {
			let requested: Vec<&str> = requested.iter().map(String::as_str).collect();
			let outcome = cart.change(line, quantity, &requested, Some(&sections_url)).await;
			let Some(items) = weak.upgrade().map(CartItems) else {
				return;
			};
			items.set_loading(line, false);
			if !items.0.tokens.is_current(token) {
				trace!(?token, "Discarding superseded cart change.");
				return;
			}

			let changed = match outcome {
				Ok(changed) => changed,
				Err(failure) => {
					debug!(%failure, "Quantity change failed.");
					items.show_error(line, &failure);
					return;
				}
			};

			let endpoint = match items.0.page.cart_url() {
				Ok(endpoint) => endpoint,
				Err(error) => {
					warn!(%error, "Can't refresh cart items.");
					return;
				}
			};
			// A failed refresh keeps the old markup; the events below still carry the new cart.
			let _ = items.0.section.apply_bundle_or_refresh(&changed.sections, endpoint).await;

			let resulting = line.checked_sub(1).and_then(|index| changed.cart.items.get(index as usize)).map_or(0, |item| item.quantity);
			if quantity > 0 && resulting < quantity {
				debug!(requested = quantity, resulting, "Backend capped the quantity.");
				items.show_message(line, &items.0.page.config.strings.quantity_error);
			}

			let bus = &items.0.page.bus;
			let source = items.0.source.clone();
			if quantity == 0 {
				bus.publish(&DomainEvent::CartItemRemoved(CartItemRemoved {
					source: source.clone(),
					line,
					cart: changed.cart.clone(),
					sections: changed.sections.clone(),
				}));
			}
			bus.publish(&DomainEvent::CartUpdated(CartUpdated {
				source,
				cart: changed.cart,
				sections: changed.sections,
			}));
		});
	}

	fn follow(&self, sections: &Sections) {
		let endpoint = match self.0.page.cart_url() {
			Ok(endpoint) => endpoint,
			Err(error) => {
				warn!(%error, "Can't refresh cart items.");
				return;
			}
		};
		let pending = self.0.section.apply_bundle_or_refresh(sections, endpoint);
		self.0.page.spawn(async move {
			pending.await;
		});
	}

	fn line_element(&self, prefix: &str, line: u32) -> Option<D::Node> {
		self.0.section.live().query(&Selector::id(&format!("{}-{}", prefix, line)))
	}

	fn set_loading(&self, line: u32, loading: bool) {
		if let Some(item) = self.line_element("CartItem", line) {
			item.toggle_class(LOADING_CLASS, loading);
		}
	}

	fn show_error(&self, line: u32, failure: &Failure) {
		self.show_message(line, failure.user_message().unwrap_or(&self.0.page.config.strings.cart_error));
	}

	fn show_message(&self, line: u32, message: &str) {
		let Some(region) = self.line_element("Line-item-error", line) else {
			warn!(line, "No error region for this line.");
			return;
		};
		let text = region.query(&selector(".cart-item__error-text")).unwrap_or_else(|| region.clone());
		text.set_text_content(message);
		region.set_hidden(false);
	}

	fn hide_error(&self, line: u32) {
		if let Some(region) = self.line_element("Line-item-error", line) {
			region.set_hidden(true);
		}
	}
}

fn line_key(line: u32) -> String {
	format!("line-{}", line)
}
