//! Variant selection on the product page.
//!
//! Picking options resolves a variant locally from the JSON the theme embeds, updates the form right away, then
//! refreshes the price, inventory and buy button regions from the server. Only the latest selection's response is
//! applied.

use crate::{
	dom::{Document, DomNode},
	error::Failure,
	event::{DomainEvent, VariantChanged},
	model::Variant,
	page::Page,
	region::{Refresh, SectionView},
	selector::{selector, Selector},
};
use core::{cell::RefCell, fmt};
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};
use url::Url;

const ADD_LABEL_ATTRIBUTE: &str = "data-add-label";

struct Inner<D: Document> {
	page: Page<D>,
	picker: D::Node,
	variants: Vec<Variant>,
	current: RefCell<Option<Variant>>,
	section: SectionView<D>,
	product_url: Url,
	source: String,
}

/// A `<variant-selects>` element and the product section it drives.
pub struct VariantPicker<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for VariantPicker<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for VariantPicker<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VariantPicker")
			.field("variants", &self.0.variants.len())
			.field("current", &self.0.current.borrow().as_ref().map(|variant| variant.id))
			.field("section", &self.0.section)
			.finish_non_exhaustive()
	}
}

impl<D: Document> VariantPicker<D> {
	/// `picker` holds the option fields and a `<script type="application/json">` listing the variants.
	/// `section` is the live element of the product section `section_id`.
	///
	/// # Errors
	///
	/// [`Failure::Parse`] iff the variant list is missing or malformed.
	pub fn attach(page: &Page<D>, picker: D::Node, section: D::Node, section_id: &str) -> Result<Self, Failure> {
		let json = picker.query(&selector("script[type=application/json]")).ok_or_else(|| Failure::Parse("no variant data".into()))?;
		let variants: Vec<Variant> = serde_json::from_str(&json.text_content()).map_err(Failure::parse)?;
		trace!(variants = variants.len(), "Variant data read.");

		let product_url = match picker.attribute("data-url").map(|href| page.resolve(&href)) {
			Some(Ok(url)) => url,
			Some(Err(error)) => {
				warn!(%error, "Invalid product URL; using the current page.");
				page.history.current()
			}
			None => page.history.current(),
		};

		let region = |prefix: &str| Selector::id(&format!("{}-{}", prefix, section_id));
		let view = SectionView::with_optional(
			Rc::clone(&page.document),
			page.fragments.clone(),
			section,
			section_id,
			vec![region("price"), region("ProductSubmitButton")],
			vec![region("Inventory"), region("Sku")],
		);

		let picker = Self(Rc::new(Inner {
			page: page.clone(),
			source: picker.attribute("id").filter(|id| !id.is_empty()).unwrap_or_else(|| format!("variant-selects-{}", section_id)),
			picker,
			variants,
			current: RefCell::default(),
			section: view,
			product_url,
		}));
		let initial = picker.resolve();
		*picker.0.current.borrow_mut() = initial;
		Ok(picker)
	}

	#[must_use]
	pub fn current(&self) -> Option<Variant> {
		self.0.current.borrow().clone()
	}

	#[must_use]
	pub fn section(&self) -> &SectionView<D> {
		&self.0.section
	}

	/// Option values in field order. Radio groups contribute their checked button.
	#[must_use]
	pub fn selected_options(&self) -> Vec<String> {
		let mut names: Vec<String> = Vec::new();
		let mut values: Vec<Option<String>> = Vec::new();
		for field in self.0.picker.query_all(&selector("[name]")) {
			let Some(name) = field.attribute("name") else { continue };
			let index = names.iter().position(|n| *n == name).unwrap_or_else(|| {
				names.push(name);
				values.push(None);
				values.len() - 1
			});
			let is_radio = field.attribute("type").as_deref() == Some("radio");
			if !is_radio || field.checked() {
				values[index] = field.value();
			}
		}
		values.into_iter().flatten().collect()
	}

	fn resolve(&self) -> Option<Variant> {
		let options = self.selected_options();
		self.0.variants.iter().find(|variant| variant.options == options).cloned()
	}

	/// Reacts to an option field's `change`.
	#[instrument(skip(self), fields(source = %self.0.source))]
	pub fn change(&self) {
		let variant = self.resolve();
		*self.0.current.borrow_mut() = variant.clone();

		let Some(variant) = variant else {
			debug!("No variant for this option combination.");
			// Whatever is still loading belongs to an earlier selection.
			self.0.section.invalidate();
			self.set_available(false);
			self.publish(None, None);
			return;
		};

		trace!(variant = variant.id, available = variant.available, "Variant selected.");
		self.set_id(variant.id);
		self.set_available(variant.available);
		self.0.page.history.replace(&with_variant(&self.0.page.history.current(), variant.id));

		let pending = self.0.section.refresh(with_variant(&self.0.product_url, variant.id));
		let weak = Rc::downgrade(&self.0);
		self.0.page.spawn(async move {
			let html = match pending.await {
				Refresh::Applied { html, .. } => Some(html),
				// The price shown is now the old variant's, but the form itself is right.
				Refresh::Failed(_) => None,
				Refresh::Superseded | Refresh::Detached => return,
			};
			if let Some(picker) = weak.upgrade().map(VariantPicker) {
				picker.publish(Some(variant), html);
			}
		});
	}

	fn publish(&self, variant: Option<Variant>, html: Option<String>) {
		self.0.page.bus.publish(&DomainEvent::VariantChanged(VariantChanged {
			source: self.0.source.clone(),
			section_id: self.0.section.section_id().to_owned(),
			variant,
			html,
		}));
	}

	fn set_id(&self, id: u64) {
		for input in self.0.section.live().query_all(&selector("input[name=id]")) {
			input.set_value(&id.to_string());
		}
	}

	fn set_available(&self, available: bool) {
		let Some(button) = self.0.section.live().query(&selector("button[name=add]")) else {
			return;
		};
		if available {
			button.remove_attribute("disabled");
			if let Some(label) = button.attribute(ADD_LABEL_ATTRIBUTE) {
				button.set_text_content(&label);
			}
		} else {
			if button.attribute(ADD_LABEL_ATTRIBUTE).is_none() {
				button.set_attribute(ADD_LABEL_ATTRIBUTE, button.text_content().trim());
			}
			button.set_attribute("disabled", "");
			button.set_text_content(&self.0.page.config.strings.unavailable);
		}
	}
}

/// `url` with its `variant` parameter set to `id`.
fn with_variant(url: &Url, id: u64) -> Url {
	let mut url = url.clone();
	let pairs: Vec<(String, String)> = url.query_pairs().filter(|(key, _)| key != "variant").map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
	url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("variant", &id.to_string());
	url
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn variant_parameter_is_replaced() {
		let url = Url::parse("https://shop.example/products/tee?variant=1&view=quick").unwrap();
		assert_eq!(with_variant(&url, 2).as_str(), "https://shop.example/products/tee?view=quick&variant=2");
	}
}
