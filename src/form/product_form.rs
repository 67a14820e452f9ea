//! Add to cart.
//!
//! The form asks for the cart drawer and icon sections to be rendered with the add, so that neither has to fetch
//! after `cart.item-added`. Errors are shown in the form's own alert region; nothing is published for them.

use crate::{
	commerce::AddItem,
	dom::{Document, DomNode},
	error::Failure,
	event::{CartItemAdded, DomainEvent},
	model::LineItem,
	page::Page,
	panel::{cart_drawer, cart_icon},
	selector::selector,
};
use core::{cell::Cell, fmt};
use futures::{future::LocalBoxFuture, FutureExt};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// Sections bundled with every add.
pub const SECTIONS: &[&str] = &[cart_drawer::SECTION_ID, cart_icon::SECTION_ID];

const LOADING_CLASS: &str = "loading";

/// Outcome of [`ProductForm::add`].
#[derive(Debug)]
pub enum Submission {
	Added(Vec<LineItem>),
	/// An earlier submission is still in flight. Nothing was sent.
	Busy,
	Failed(Failure),
}

struct Inner<D: Document> {
	page: Page<D>,
	root: D::Node,
	source: String,
	busy: Cell<bool>,
}

/// A `<product-form>` wrapping the add-to-cart `<form>`.
pub struct ProductForm<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for ProductForm<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for ProductForm<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProductForm").field("source", &self.0.source).field("busy", &self.0.busy.get()).finish_non_exhaustive()
	}
}

impl<D: Document> ProductForm<D> {
	/// Events this form publishes name the root's `id` (or `"product-form"`) as their source.
	pub fn attach(page: &Page<D>, root: D::Node) -> Self {
		let source = root.attribute("id").filter(|id| !id.is_empty()).unwrap_or_else(|| "product-form".to_owned());
		Self(Rc::new(Inner {
			page: page.clone(),
			root,
			source,
			busy: Cell::new(false),
		}))
	}

	#[must_use]
	pub fn root(&self) -> &D::Node {
		&self.0.root
	}

	#[must_use]
	pub fn is_busy(&self) -> bool {
		self.0.busy.get()
	}

	/// Fire-and-forget [`ProductForm::add`], for the `submit` listener.
	pub fn submit(&self) {
		let pending = self.add();
		self.0.page.spawn(async move {
			pending.await;
		});
	}

	/// Adds the selected variant in the entered quantity, then publishes `cart.item-added`.
	///
	/// The event goes out even if the form was detached in the meantime: the cart changed either way.
	#[must_use]
	#[instrument(skip(self), fields(source = %self.0.source))]
	pub fn add(&self) -> LocalBoxFuture<'static, Submission> {
		if self.0.busy.replace(true) {
			debug!("Already submitting.");
			return futures::future::ready(Submission::Busy).boxed_local();
		}

		let item = match self.item() {
			Ok(item) => item,
			Err(failure) => {
				warn!(%failure, "Product form has no usable variant id.");
				self.0.busy.set(false);
				self.show_error(&failure);
				return futures::future::ready(Submission::Failed(failure)).boxed_local();
			}
		};

		self.set_loading(true);
		self.hide_error();
		let weak = Rc::downgrade(&self.0);
		let cart = self.0.page.cart.clone();
		let bus = self.0.page.bus.clone();
		let source = self.0.source.clone();
		let sections_url = self.0.page.sections_url();
		async move {
			let outcome = cart.add(&[item], SECTIONS, Some(&sections_url)).await;
			let form = weak.upgrade().map(ProductForm);
			if let Some(form) = &form {
				form.0.busy.set(false);
				form.set_loading(false);
			}
			match outcome {
				Ok(added) => {
					bus.publish(&DomainEvent::CartItemAdded(CartItemAdded {
						source,
						items: added.items.clone(),
						sections: added.sections,
					}));
					Submission::Added(added.items)
				}
				Err(failure) => {
					debug!(%failure, "Add to cart failed.");
					if let Some(form) = &form {
						form.show_error(&failure);
					}
					Submission::Failed(failure)
				}
			}
		}
		.boxed_local()
	}

	fn item(&self) -> Result<AddItem, Failure> {
		let field = |name: &str| self.0.root.query(&selector(&format!("[name={}]", name))).and_then(|field| field.value());
		let id = field("id")
			.and_then(|id| id.trim().parse::<u64>().ok())
			.ok_or_else(|| Failure::Parse("no variant id in product form".into()))?;
		let quantity = field("quantity").and_then(|quantity| quantity.trim().parse::<u32>().ok()).filter(|&q| q > 0).unwrap_or(1);
		Ok(AddItem { id, quantity })
	}

	fn set_loading(&self, loading: bool) {
		if let Some(button) = self.0.root.query(&selector("[type=submit]")) {
			button.toggle_class(LOADING_CLASS, loading);
			if loading {
				button.set_attribute("aria-disabled", "true");
			} else {
				button.remove_attribute("aria-disabled");
			}
		}
	}

	/// The alert region and the element its message goes into.
	fn error_region(&self) -> Option<(D::Node, D::Node)> {
		let region = self.0.root.query(&selector("[role=alert]"))?;
		let message = region.query(&selector(".product-form__error-message")).unwrap_or_else(|| region.clone());
		Some((region, message))
	}

	fn show_error(&self, failure: &Failure) {
		let text = failure.user_message().unwrap_or(&self.0.page.config.strings.cart_error);
		match self.error_region() {
			Some((region, message)) => {
				message.set_text_content(text);
				region.set_hidden(false);
			}
			None => warn!("Product form has no alert region to show the error in."),
		}
	}

	fn hide_error(&self) {
		if let Some((region, _)) = self.error_region() {
			region.set_hidden(true);
		}
	}
}
