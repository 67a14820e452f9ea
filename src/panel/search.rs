//! Predictive search.
//!
//! Keystrokes are debounced. Terms shorter than the configured minimum clear the results and supersede whatever is
//! still in flight, so a slow response for "sh" can't reappear after the field was emptied.

use crate::{
	debounce::CommandQueue,
	dom::{Document, DomNode},
	model::{PredictiveResults, SearchHit},
	overlay::{Overlay, OverlayOptions, Panel},
	page::Page,
	sync::TokenCounter,
	vdom::{escape_attribute, escape_text},
};
use core::{cell::RefCell, fmt, fmt::Write as _};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace};

const QUERY_KEY: &str = "query";
const LOADING_CLASS: &str = "loading";

struct Inner<D: Document> {
	page: Page<D>,
	overlay: Overlay<D>,
	results: D::Node,
	queue: CommandQueue,
	tokens: TokenCounter,
	cache: RefCell<HashMap<String, Rc<PredictiveResults>>>,
}

/// The search field's results dropdown.
pub struct PredictiveSearch<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for PredictiveSearch<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for PredictiveSearch<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PredictiveSearch")
			.field("overlay", &self.0.overlay)
			.field("pending", &self.0.queue.is_pending(QUERY_KEY))
			.field("cached", &self.0.cache.borrow().len())
			.finish_non_exhaustive()
	}
}

impl<D: Document> PredictiveSearch<D> {
	/// `root` is the `<predictive-search>` element, `results` the container results are rendered into.
	pub fn attach(page: &Page<D>, root: D::Node, results: D::Node) -> Self {
		// Focus stays in the search field while results come and go.
		let options = OverlayOptions::new("predictive-search").open_class("results-open").body_class(None).focus_on_open(false);
		Self(Rc::new(Inner {
			page: page.clone(),
			overlay: Overlay::new(Rc::clone(&page.document), page.bus.clone(), root, options),
			results,
			queue: CommandQueue::new(Rc::clone(&page.scheduler)),
			tokens: TokenCounter::new(),
			cache: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn overlay(&self) -> &Overlay<D> {
		&self.0.overlay
	}

	/// Reacts to the search field's current value.
	#[instrument(skip(self, raw), fields(len = raw.len()))]
	pub fn input(&self, raw: &str) {
		let term = raw.trim();
		#[cfg(feature = "dangerous-logging")]
		trace!(term, "Search input.");

		if term.chars().count() < self.0.page.config.search.min_query_length {
			self.clear();
			return;
		}

		let cached = self.0.cache.borrow().get(term).cloned();
		if let Some(results) = cached {
			trace!("Cache hit.");
			self.0.queue.cancel(QUERY_KEY);
			self.0.tokens.invalidate();
			self.set_loading(false);
			self.show(&results);
			return;
		}

		let weak = Rc::downgrade(&self.0);
		let term = term.to_owned();
		self.0.queue.schedule(QUERY_KEY, self.0.page.config.timings.search_debounce(), move || {
			if let Some(search) = weak.upgrade().map(PredictiveSearch) {
				search.query(term);
			}
		});
	}

	/// Empties and closes the results, and drops any response still in flight.
	pub fn clear(&self) {
		self.0.queue.cancel(QUERY_KEY);
		self.0.tokens.invalidate();
		self.set_loading(false);
		self.0.results.set_inner_html("");
		self.0.overlay.close();
	}

	fn query(&self, term: String) {
		let token = self.0.tokens.issue();
		self.set_loading(true);
		let weak = Rc::downgrade(&self.0);
		let cart = self.0.page.cart.clone();
		let config = Rc::clone(&self.0.page.config);
		self.0.page.spawn(async move {
			let outcome = cart.predictive_search(&term, &config.search).await;
			let Some(search) = weak.upgrade().map(PredictiveSearch) else {
				return;
			};
			if !search.0.tokens.is_current(token) {
				trace!(?token, "Discarding superseded search results.");
				return;
			}
			search.set_loading(false);
			match outcome {
				Ok(results) => {
					let results = Rc::new(results);
					search.0.cache.borrow_mut().insert(term, Rc::clone(&results));
					search.show(&results);
				}
				// Keep whatever is shown.
				Err(failure) => debug!(%failure, "Predictive search failed."),
			}
		});
	}

	fn show(&self, results: &PredictiveResults) {
		self.0.results.set_inner_html(&render(results, &self.0.page.config.strings.no_results));
		self.0.overlay.open();
	}

	fn set_loading(&self, loading: bool) {
		self.0.overlay.root().toggle_class(LOADING_CLASS, loading);
	}
}

impl<D: Document> Panel for PredictiveSearch<D> {
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

/// Result markup. Titles and URLs come from the catalogue and are escaped.
#[must_use]
pub fn render(results: &PredictiveResults, no_results: &str) -> String {
	let mut html = String::new();
	if results.is_empty() {
		html.push_str(r#"<p class="predictive-search__empty" role="status">"#);
		escape_text(no_results, &mut html);
		html.push_str("</p>");
		return html;
	}

	for (group, hits) in results.groups().filter(|(_, hits)| !hits.is_empty()) {
		let _ = write!(html, r#"<div class="predictive-search__group" data-group="{}"><ul class="predictive-search__results-list" role="listbox">"#, group);
		for SearchHit { title, url } in hits {
			html.push_str(r#"<li class="predictive-search__list-item" role="option"><a class="predictive-search__item" href=""#);
			escape_attribute(url, &mut html);
			html.push_str(r#"">"#);
			escape_text(title, &mut html);
			html.push_str("</a></li>");
		}
		html.push_str("</ul></div>");
	}
	html
}
