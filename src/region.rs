//! A server-rendered section bound to its live element.

use crate::{
	dom::{Document, DomNode},
	error::Failure,
	merge::{merge_regions, toggle_presence, MergeReport},
	model::Sections,
	selector::Selector,
	sync::{FragmentClient, TokenCounter},
};
use core::fmt;
use futures::{future::LocalBoxFuture, FutureExt};
use std::rc::Rc;
use tracing::{debug, instrument, trace};
use url::Url;

/// Outcome of [`SectionView::refresh`].
#[derive(Debug)]
pub enum Refresh<N> {
	/// The fetched section was merged. `html` is the whole response, for callers that pass it on.
	Applied { report: MergeReport<N>, html: String },
	/// A newer fetch (or a bundled fragment) superseded this one. Nothing was changed.
	Superseded,
	/// The fetch failed. Nothing was changed.
	Failed(Failure),
	/// The view was dropped before the response arrived.
	Detached,
}

impl<N> Refresh<N> {
	#[must_use]
	pub fn is_applied(&self) -> bool {
		matches!(self, Refresh::Applied { .. })
	}
}

struct Inner<D: Document> {
	document: Rc<D>,
	live: D::Node,
	section_id: String,
	regions: Vec<Selector>,
	/// Regions the server omits in some states. These are hidden while absent.
	optional: Vec<Selector>,
	client: FragmentClient,
	tokens: TokenCounter,
}

/// One named section: which live element it lives in, and which of its regions are replaced on refresh.
///
/// Cheap to clone; clones share the request counter, so a refresh through one clone supersedes those through others.
pub struct SectionView<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for SectionView<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for SectionView<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SectionView")
			.field("section_id", &self.0.section_id)
			.field("live", &self.0.live)
			.field("regions", &self.0.regions)
			.field("optional", &self.0.optional)
			.finish_non_exhaustive()
	}
}

impl<D: Document> SectionView<D> {
	pub fn new(document: Rc<D>, client: FragmentClient, live: D::Node, section_id: impl Into<String>, regions: Vec<Selector>) -> Self {
		Self::with_optional(document, client, live, section_id, regions, Vec::new())
	}

	/// Like [`SectionView::new`], but also replaces the `optional` regions and hides each of them while the server doesn't render it.
	pub fn with_optional(document: Rc<D>, client: FragmentClient, live: D::Node, section_id: impl Into<String>, mut regions: Vec<Selector>, optional: Vec<Selector>) -> Self {
		regions.extend(optional.iter().cloned());
		Self(Rc::new(Inner {
			document,
			live,
			section_id: section_id.into(),
			regions,
			optional,
			client,
			tokens: TokenCounter::new(),
		}))
	}

	#[must_use]
	pub fn section_id(&self) -> &str {
		&self.0.section_id
	}

	#[must_use]
	pub fn live(&self) -> &D::Node {
		&self.0.live
	}

	/// Supersedes any refresh still in flight.
	pub fn invalidate(&self) {
		self.0.tokens.invalidate();
	}

	/// Merges the regions of a rendered section into the live element.
	///
	/// # Errors
	///
	/// [`Failure::Parse`] iff `html` can't be parsed. The live element is unchanged in that case.
	#[instrument(skip(self, html), fields(section_id = %self.0.section_id, len = html.len()))]
	pub fn apply_html(&self, html: &str) -> Result<MergeReport<D::Node>, Failure> {
		#[cfg(feature = "dangerous-logging")]
		trace!(html, "Applying section markup.");

		let incoming = self.0.document.parse_html(html)?;
		let report = merge_regions(&self.0.live, &incoming, &self.0.regions);
		toggle_presence(&self.0.live, &incoming, &self.0.optional);
		debug!(replaced = report.replaced.len(), "Section applied.");
		Ok(report)
	}

	/// Applies this section's bundled fragment, if `sections` has one.
	///
	/// Returns [`None`] iff it doesn't, in which case the caller should fall back to [`SectionView::refresh`].
	pub fn apply_bundle(&self, sections: &Sections) -> Option<Result<MergeReport<D::Node>, Failure>> {
		let html = sections.get(&self.0.section_id)?;
		// Bundled fragments come from a newer request than any fetch still in flight.
		self.invalidate();
		Some(self.apply_html(html))
	}

	/// Applies this section's bundled fragment if `sections` has one, and falls back to fetching it from `endpoint` otherwise.
	#[must_use]
	pub fn apply_bundle_or_refresh(&self, sections: &Sections, endpoint: Url) -> LocalBoxFuture<'static, Refresh<D::Node>> {
		match sections.get(&self.0.section_id) {
			Some(html) => {
				let html = html.to_owned();
				let outcome = match self.apply_bundle(sections) {
					Some(Ok(report)) => Refresh::Applied { report, html },
					Some(Err(failure)) => Refresh::Failed(failure),
					None => Refresh::Superseded,
				};
				futures::future::ready(outcome).boxed_local()
			}
			None => self.refresh(endpoint),
		}
	}

	/// Fetches this section from `endpoint` and applies it, unless a newer refresh or bundle got there first.
	///
	/// The returned future holds only a weak reference to the view.
	#[must_use]
	pub fn refresh(&self, endpoint: Url) -> LocalBoxFuture<'static, Refresh<D::Node>> {
		let token = self.0.tokens.issue();
		let client = self.0.client.clone();
		let section_id = self.0.section_id.clone();
		let weak = Rc::downgrade(&self.0);
		trace!(section_id = %section_id, ?token, "Refreshing section.");

		async move {
			let fetched = client.fetch_section(endpoint, &section_id).await;
			let Some(inner) = weak.upgrade() else {
				return Refresh::Detached;
			};
			if !inner.tokens.is_current(token) {
				debug!(section_id = %section_id, ?token, "Discarding superseded response.");
				return Refresh::Superseded;
			}
			match fetched.and_then(|html| SectionView(inner).apply_html(&html).map(|report| (report, html))) {
				Ok((report, html)) => Refresh::Applied { report, html },
				Err(failure) => {
					debug!(section_id = %section_id, %failure, "Section refresh failed; keeping what's shown.");
					Refresh::Failed(failure)
				}
			}
		}
		.boxed_local()
	}
}
