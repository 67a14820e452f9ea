//! Shapes consumed from the commerce backend.
//!
//! Only the fields the coordination layer reads are modelled. Everything else the backend sends is ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cart line as returned by `/cart/add.js` and `/cart/change.js`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
	pub key: Option<String>,
	pub id: Option<u64>,
	pub variant_id: Option<u64>,
	pub quantity: u32,
	pub title: Option<String>,
	pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartState {
	pub item_count: u32,
	pub items: Vec<LineItem>,
	pub total_price: Option<u64>,
}

/// Bundled, pre-rendered sections keyed by section id.
///
/// The backend answers `null` for sections it couldn't render; those entries are dropped on deserialization
/// so that consumers fall back to fetching them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Option<String>>")]
pub struct Sections(BTreeMap<String, String>);

impl From<BTreeMap<String, Option<String>>> for Sections {
	fn from(raw: BTreeMap<String, Option<String>>) -> Self {
		Self(raw.into_iter().filter_map(|(id, html)| Some((id, html?))).collect())
	}
}

impl Sections {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, section_id: &str) -> Option<&str> {
		self.0.get(section_id).map(String::as_str)
	}

	pub fn insert(&mut self, section_id: impl Into<String>, html: impl Into<String>) {
		self.0.insert(section_id.into(), html.into());
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Sections {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
	pub id: u64,
	pub options: Vec<String>,
	pub available: bool,
	pub price: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
	pub title: String,
	pub url: String,
}

/// Predictive search results, grouped by resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictiveResults {
	pub products: Vec<SearchHit>,
	pub collections: Vec<SearchHit>,
	pub articles: Vec<SearchHit>,
	pub pages: Vec<SearchHit>,
}

impl PredictiveResults {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.groups().all(|(_, hits)| hits.is_empty())
	}

	/// Non-empty and empty groups in display order.
	pub fn groups(&self) -> impl Iterator<Item = (&'static str, &[SearchHit])> {
		[
			("products", self.products.as_slice()),
			("collections", self.collections.as_slice()),
			("articles", self.articles.as_slice()),
			("pages", self.pages.as_slice()),
		]
		.into_iter()
	}
}
