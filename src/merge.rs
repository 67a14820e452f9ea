//! Region-wise merging of server-rendered fragments into the live document.
//!
//! # Listeners and merges
//!
//! A merge replaces the *children* of each matched live region, never the region element itself.
//! Consequently:
//!
//! - Listeners delegated at a component root, or at a region element, survive every merge.
//!   This is how [`crate::web::mount`] wires components and is the recommended setup.
//! - Listeners bound directly to descendants of a region are gone after the merge, along with the descendants.
//!   Re-attach them from [`MergeReport::replaced`].
//! - Transient state on elements *outside* the listed regions (open/closed classes, scroll position, focus)
//!   is left alone.

use crate::{dom::DomNode, selector::Selector};
use tracing::{instrument, trace, warn};

/// What [`merge_regions`] did.
#[derive(Debug, Clone)]
pub struct MergeReport<N> {
	/// Live region elements whose children were replaced, in selector order.
	pub replaced: Vec<N>,
	/// Selectors with no match in the incoming fragment. The live regions were left untouched.
	pub absent_incoming: Vec<Selector>,
	/// Selectors with no match in the live tree.
	pub absent_live: Vec<Selector>,
}

impl<N> Default for MergeReport<N> {
	fn default() -> Self {
		Self {
			replaced: Vec::new(),
			absent_incoming: Vec::new(),
			absent_live: Vec::new(),
		}
	}
}

impl<N> MergeReport<N> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.replaced.is_empty()
	}
}

/// For each selector matched in both trees, replaces the live element's children with copies of the incoming element's children.
///
/// Regions absent from `incoming` are left as they are, which supports sections that simply don't render
/// a region in some states (for example a cart footer while the cart is empty); see [`toggle_presence`].
#[instrument(skip(live_root, incoming_root))]
pub fn merge_regions<N: DomNode>(live_root: &N, incoming_root: &N, selectors: &[Selector]) -> MergeReport<N> {
	let mut report = MergeReport::default();
	for selector in selectors {
		let live = match live_root.query(selector) {
			Some(live) => live,
			None => {
				warn!(%selector, "Region missing from the live document.");
				report.absent_live.push(selector.clone());
				continue;
			}
		};
		let incoming = match incoming_root.query(selector) {
			Some(incoming) => incoming,
			None => {
				trace!(%selector, "Region not rendered by the server; leaving it as is.");
				report.absent_incoming.push(selector.clone());
				continue;
			}
		};

		live.replace_children_from(&incoming);
		trace!(%selector, "Region replaced.");
		report.replaced.push(live);
	}
	report
}

/// Hides each live element matching one of `selectors` iff the incoming fragment doesn't contain a match, and unhides it otherwise.
#[instrument(skip(live_root, incoming_root))]
pub fn toggle_presence<N: DomNode>(live_root: &N, incoming_root: &N, selectors: &[Selector]) {
	for selector in selectors {
		let present = incoming_root.query(selector).is_some();
		for live in live_root.query_all(selector) {
			live.set_hidden(!present);
		}
	}
}
