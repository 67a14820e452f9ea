//! Collection filtering and sorting.
//!
//! Filter changes are debounced, sort changes and active-filter pill removals apply right away. Every render goes
//! through the same path: cached or fetched section markup, merged into the results regions, then a history entry
//! if the canonical URL changed. Back/forward navigation re-renders from the cache without pushing.

use crate::{
	debounce::CommandQueue,
	dom::{Document, DomNode},
	history::{canonical, push_if_changed},
	overlay::{Overlay, OverlayOptions, Panel},
	page::Page,
	region::{Refresh, SectionView},
	selector::{selector, selectors},
};
use core::{cell::RefCell, fmt};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};
use url::Url;

/// Regions replaced on every render.
pub const RESULT_REGIONS: &[&str] = &["#ProductGridContainer", "#ProductCount", "#ProductCountDesktop", ".active-facets"];

const LOADING_CLASS: &str = "loading";
const SUBMIT_KEY: &str = "filters";

struct Inner<D: Document> {
	page: Page<D>,
	overlay: Overlay<D>,
	section: SectionView<D>,
	queue: CommandQueue,
	/// Canonical URL → section markup.
	cache: RefCell<HashMap<String, String>>,
}

/// The filter drawer together with the results it controls.
pub struct FacetFilters<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for FacetFilters<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for FacetFilters<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FacetFilters")
			.field("overlay", &self.0.overlay)
			.field("section", &self.0.section)
			.field("cached", &self.0.cache.borrow().len())
			.finish_non_exhaustive()
	}
}

impl<D: Document> FacetFilters<D> {
	/// `drawer` is the filter drawer (an overlay on small screens), `results` the section element containing
	/// [`RESULT_REGIONS`], rendered server-side as `section_id`.
	pub fn attach(page: &Page<D>, drawer: D::Node, results: D::Node, section_id: &str) -> Self {
		let overlay = Overlay::new(Rc::clone(&page.document), page.bus.clone(), drawer, OverlayOptions::new("facet-filters").open_class("menu-opening"));
		let section = SectionView::new(Rc::clone(&page.document), page.fragments.clone(), results, section_id, selectors(RESULT_REGIONS));
		Self(Rc::new(Inner {
			page: page.clone(),
			overlay,
			section,
			queue: CommandQueue::new(Rc::clone(&page.scheduler)),
			cache: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn overlay(&self) -> &Overlay<D> {
		&self.0.overlay
	}

	/// Schedules a render with the filter form's `query` once input has settled.
	#[instrument(skip(self, query), fields(fields = query.len()))]
	pub fn submit_filters(&self, query: Vec<(String, String)>) {
		let weak = Rc::downgrade(&self.0);
		self.0.queue.schedule(SUBMIT_KEY, self.0.page.config.timings.filter_debounce(), move || {
			if let Some(facets) = weak.upgrade().map(FacetFilters) {
				// The form replaces every filter. The sort order survives unless the form has its own.
				let sorted = query.iter().any(|(key, _)| key == "sort_by");
				let url = facets.url_with(|pairs| pairs.retain(|(key, _)| key == "sort_by" && !sorted), query);
				facets.render(url, true);
			}
		});
	}

	/// Applies a new sort order immediately, keeping the active filters.
	pub fn change_sort(&self, sort_by: &str) {
		self.0.queue.cancel(SUBMIT_KEY);
		let url = self.url_with(|pairs| pairs.retain(|(key, _)| key != "sort_by" && key != "page"), vec![("sort_by".to_owned(), sort_by.to_owned())]);
		self.render(url, true);
	}

	/// Follows an active-filter pill's link (which points at the URL without that filter).
	///
	/// # Errors
	///
	/// Iff `href` isn't a valid URL reference.
	pub fn remove_filter(&self, href: &str) -> Result<(), url::ParseError> {
		self.0.queue.cancel(SUBMIT_KEY);
		let url = self.0.page.history.current().join(href)?;
		self.render(url, true);
		Ok(())
	}

	/// Re-renders for a URL the user navigated to with back/forward.
	pub fn restore(&self, url: Url) {
		self.0.queue.cancel(SUBMIT_KEY);
		self.render(url, false);
	}

	/// The current URL with `keep` applied to its query and `extra` appended. Pagination always resets.
	fn url_with(&self, keep: impl FnOnce(&mut Vec<(String, String)>), extra: Vec<(String, String)>) -> Url {
		let mut url = self.0.page.history.current();
		let mut pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).filter(|(k, _)| k != "page").collect();
		keep(&mut pairs);
		pairs.extend(extra);
		url.set_fragment(None);
		if pairs.is_empty() {
			url.set_query(None);
		} else {
			url.query_pairs_mut().clear().extend_pairs(pairs);
		}
		url
	}

	#[instrument(skip(self), fields(path = url.path()))]
	fn render(&self, url: Url, push: bool) {
		let key = canonical(&url).to_string();
		let cached = self.0.cache.borrow().get(&key).cloned();
		if let Some(html) = cached {
			trace!("Rendering from cache.");
			// Anything still in flight is older than this.
			self.0.section.invalidate();
			self.set_loading(false);
			match self.0.section.apply_html(&html) {
				Ok(_) => self.rendered(&url, push),
				Err(failure) => warn!(%failure, "Cached filter results didn't parse."),
			}
			return;
		}

		self.set_loading(true);
		let pending = self.0.section.refresh(url.clone());
		let weak = Rc::downgrade(&self.0);
		self.0.page.spawn(async move {
			let outcome = pending.await;
			let Some(facets) = weak.upgrade().map(FacetFilters) else {
				return;
			};
			match outcome {
				Refresh::Applied { html, .. } => {
					facets.0.cache.borrow_mut().insert(key, html);
					facets.set_loading(false);
					facets.rendered(&url, push);
				}
				// The newer render owns the loading state.
				Refresh::Superseded | Refresh::Detached => (),
				Refresh::Failed(failure) => {
					debug!(%failure, "Filtering failed; keeping the current results.");
					facets.set_loading(false);
				}
			}
		});
	}

	fn rendered(&self, url: &Url, push: bool) {
		if push {
			push_if_changed(&*self.0.page.history, url);
		}
		self.0.overlay.close();
	}

	fn set_loading(&self, loading: bool) {
		if let Some(grid) = self.0.section.live().query(&selector("#ProductGridContainer")) {
			grid.toggle_class(LOADING_CLASS, loading);
		}
	}
}

/// Name/value pairs a filter form would submit: named fields, checkboxes and radios only if checked,
/// empty values dropped.
pub fn form_query<N: DomNode>(form: &N) -> Vec<(String, String)> {
	form.query_all(&selector("[name]"))
		.into_iter()
		.filter(|field| field.attribute("disabled").is_none())
		.filter(|field| !matches!(field.attribute("type").as_deref(), Some("checkbox" | "radio")) || field.checked())
		.filter_map(|field| Some((field.attribute("name")?, field.value().unwrap_or_default())))
		.filter(|(_, value)| !value.is_empty())
		.collect()
}

impl<D: Document> Panel for FacetFilters<D> {
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vdom::VNode;

	#[test]
	fn form_query_follows_form_submission_rules() {
		let form = VNode::parse(
			r#"<form>
				<input type="checkbox" name="filter.p.vendor" value="Acme" checked>
				<input type="checkbox" name="filter.p.vendor" value="Globex">
				<input type="number" name="filter.v.price.gte" value="">
				<input name="filter.v.price.lte" value="50">
				<input name="disabled" value="x" disabled>
				<select name="sort_by"><option value="manual">Featured</option><option value="price-ascending" selected>Price</option></select>
				<button type="submit">Apply</button>
			</form>"#,
		)
		.unwrap();
		assert_eq!(
			form_query(&form),
			[
				("filter.p.vendor".to_owned(), "Acme".to_owned()),
				("filter.v.price.lte".to_owned(), "50".to_owned()),
				("sort_by".to_owned(), "price-ascending".to_owned()),
			]
		);
	}
}
