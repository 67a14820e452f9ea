//! Page configuration, usually embedded by the theme as
//! `<script type="application/json" id="storefront-config">`.

use crate::error::ConfigError;
use core::time::Duration;
use serde::Deserialize;
use url::Url;

/// Id of the `<script type="application/json">` element [`crate::web`] reads the configuration from.
pub const CONFIG_ELEMENT_ID: &str = "storefront-config";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
	pub routes: Routes,
	pub timings: Timings,
	pub search: SearchConfig,
	pub strings: Strings,
}

/// Endpoint paths, resolved against the current page URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Routes {
	pub cart_url: String,
	pub cart_add_url: String,
	pub cart_change_url: String,
	pub predictive_search_url: String,
}

impl Default for Routes {
	fn default() -> Self {
		Self {
			cart_url: "/cart".into(),
			cart_add_url: "/cart/add.js".into(),
			cart_change_url: "/cart/change.js".into(),
			predictive_search_url: "/search/suggest.json".into(),
		}
	}
}

impl Routes {
	/// Resolves `route` against `base`.
	///
	/// # Errors
	///
	/// Iff `route` isn't a valid relative or absolute URL.
	pub fn resolve(base: &Url, route: &str) -> Result<Url, ConfigError> {
		base.join(route).map_err(|source| ConfigError::Route { route: route.to_owned(), source })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
	pub quantity_debounce_ms: u64,
	pub search_debounce_ms: u64,
	pub filter_debounce_ms: u64,
	pub newsletter_delay_ms: u64,
}

impl Default for Timings {
	fn default() -> Self {
		Self {
			quantity_debounce_ms: 300,
			search_debounce_ms: 300,
			filter_debounce_ms: 500,
			newsletter_delay_ms: 5000,
		}
	}
}

impl Timings {
	#[must_use]
	pub fn quantity_debounce(&self) -> Duration {
		Duration::from_millis(self.quantity_debounce_ms)
	}

	#[must_use]
	pub fn search_debounce(&self) -> Duration {
		Duration::from_millis(self.search_debounce_ms)
	}

	#[must_use]
	pub fn filter_debounce(&self) -> Duration {
		Duration::from_millis(self.filter_debounce_ms)
	}

	#[must_use]
	pub fn newsletter_delay(&self) -> Duration {
		Duration::from_millis(self.newsletter_delay_ms)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
	/// Trimmed queries shorter than this (in `char`s) clear the results instead of issuing a request.
	pub min_query_length: usize,
	pub limit: u32,
	pub resources: Vec<String>,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			min_query_length: 2,
			limit: 4,
			resources: vec!["product".into(), "collection".into(), "article".into(), "page".into()],
		}
	}
}

/// Fallback messages. Translation happens server-side, so themes override these from their locale files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Strings {
	pub cart_error: String,
	pub quantity_error: String,
	pub unavailable: String,
	pub no_results: String,
}

impl Default for Strings {
	fn default() -> Self {
		Self {
			cart_error: "There was an error while updating your cart. Please try again.".into(),
			quantity_error: "You can't add more of this item to your cart.".into(),
			unavailable: "Unavailable".into(),
			no_results: "No results found.".into(),
		}
	}
}

impl Config {
	/// Parses a (possibly partial) JSON configuration. Missing fields keep their defaults.
	///
	/// # Errors
	///
	/// Iff `json` isn't a JSON object of the expected shape.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		Ok(serde_json::from_str(json)?)
	}
}
