//! Quick add from product cards.

use crate::{
	dom::{Document, DomNode},
	form::product_form::{ProductForm, Submission},
	page::Page,
};
use core::fmt;
use futures::{future::LocalBoxFuture, FutureExt};
use std::rc::Rc;
use tracing::{debug, warn};
use url::Url;

/// A card's add button. Unlike a [`ProductForm`] on the product page, a failure here sends the shopper to the
/// product page, where they can see why.
pub struct QuickAdd<D: Document> {
	form: ProductForm<D>,
	page: Page<D>,
	product_url: Option<Url>,
}

impl<D: Document> Clone for QuickAdd<D> {
	fn clone(&self) -> Self {
		Self {
			form: self.form.clone(),
			page: self.page.clone(),
			product_url: self.product_url.clone(),
		}
	}
}

impl<D: Document> fmt::Debug for QuickAdd<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QuickAdd").field("form", &self.form).field("product_url", &self.product_url.as_ref().map(Url::as_str)).finish_non_exhaustive()
	}
}

impl<D: Document> QuickAdd<D> {
	/// `root` is the card's form. Its `data-product-url` is where to go on failure.
	pub fn attach(page: &Page<D>, root: D::Node) -> Self {
		let product_url = root.attribute("data-product-url").and_then(|href| match page.resolve(&href) {
			Ok(url) => Some(url),
			Err(error) => {
				warn!(%error, "Quick add has an invalid product URL.");
				None
			}
		});
		Self {
			form: ProductForm::attach(page, root),
			page: page.clone(),
			product_url,
		}
	}

	#[must_use]
	pub fn form(&self) -> &ProductForm<D> {
		&self.form
	}

	pub fn submit(&self) {
		let pending = self.add();
		self.page.spawn(async move {
			pending.await;
		});
	}

	/// [`ProductForm::add`], navigating to the product page if it fails.
	#[must_use]
	pub fn add(&self) -> LocalBoxFuture<'static, Submission> {
		let pending = self.form.add();
		let navigator = Rc::clone(&self.page.navigator);
		let product_url = self.product_url.clone();
		async move {
			let submission = pending.await;
			if let Submission::Failed(failure) = &submission {
				match &product_url {
					Some(url) => {
						debug!(%failure, url = url.as_str(), "Quick add failed; opening the product page instead.");
						navigator.navigate(url);
					}
					None => debug!(%failure, "Quick add failed and there's no product page to fall back to."),
				}
			}
			submission
		}
		.boxed_local()
	}
}
