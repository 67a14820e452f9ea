//! The mutating cart endpoints and predictive search.
//!
//! These speak JSON. Callers opt into bundled sections by naming them; the backend then renders them
//! in the same round trip and returns them under `sections`.

use crate::{
	config::{Routes, SearchConfig},
	error::{ConfigError, Failure},
	model::{CartState, LineItem, PredictiveResults, Sections},
	sync::{description_of, Request, Response, Transport},
};
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};
use url::Url;

/// One line to add: a variant id and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddItem {
	pub id: u64,
	pub quantity: u32,
}

/// Successful `add` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Added {
	pub items: Vec<LineItem>,
	pub sections: Sections,
}

/// Successful `change` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changed {
	pub cart: CartState,
	pub sections: Sections,
}

#[derive(Serialize)]
struct AddBody<'a> {
	items: &'a [AddItem],
	#[serde(skip_serializing_if = "no_sections")]
	sections: &'a [&'a str],
	#[serde(skip_serializing_if = "Option::is_none")]
	sections_url: Option<&'a str>,
}

#[derive(Serialize)]
struct ChangeBody<'a> {
	line: u32,
	quantity: u32,
	#[serde(skip_serializing_if = "no_sections")]
	sections: &'a [&'a str],
	#[serde(skip_serializing_if = "Option::is_none")]
	sections_url: Option<&'a str>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_sections(sections: &&[&str]) -> bool {
	sections.is_empty()
}

#[derive(Deserialize)]
struct SuggestBody {
	resources: SuggestResources,
}

#[derive(Deserialize)]
struct SuggestResources {
	results: PredictiveResults,
}

/// Client for the commerce backend's cart and search endpoints.
#[derive(Clone)]
pub struct CartApi {
	transport: Rc<dyn Transport>,
	add_url: Url,
	change_url: Url,
	search_url: Url,
}

impl fmt::Debug for CartApi {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CartApi")
			.field("add_url", &self.add_url.as_str())
			.field("change_url", &self.change_url.as_str())
			.field("search_url", &self.search_url.as_str())
			.finish_non_exhaustive()
	}
}

impl CartApi {
	/// Resolves `routes` against `base` (usually the page URL).
	///
	/// # Errors
	///
	/// Iff one of the routes isn't a valid URL reference.
	pub fn new(transport: Rc<dyn Transport>, base: &Url, routes: &Routes) -> Result<Self, ConfigError> {
		Ok(Self {
			transport,
			add_url: Routes::resolve(base, &routes.cart_add_url)?,
			change_url: Routes::resolve(base, &routes.cart_change_url)?,
			search_url: Routes::resolve(base, &routes.predictive_search_url)?,
		})
	}

	/// Adds `items` to the cart, asking for `sections` to be rendered in the same round trip
	/// (in the context of `sections_url`, the page path, if given).
	///
	/// # Errors
	///
	/// [`Failure::Validation`] if the backend refused with an explanation (for example insufficient stock),
	/// otherwise see [`Failure`].
	#[instrument(skip(self, sections_url), fields(items = items.len()))]
	pub async fn add(&self, items: &[AddItem], sections: &[&str], sections_url: Option<&str>) -> Result<Added, Failure> {
		let body = serde_json::to_string(&AddBody { items, sections, sections_url }).map_err(Failure::parse)?;
		let (mut value, sections) = self.post(self.add_url.clone(), body).await?;

		let items = match value.get_mut("items").map(Value::take) {
			Some(items) => serde_json::from_value(items).map_err(Failure::parse)?,
			// Single-item adds answer with the line itself.
			None => vec![serde_json::from_value(value).map_err(Failure::parse)?],
		};
		debug!(lines = items.len(), sections = sections.ids().count(), "Added to cart.");
		Ok(Added { items, sections })
	}

	/// Sets the quantity of the 1-based `line`. A quantity of 0 removes it.
	///
	/// # Errors
	///
	/// See [`CartApi::add`].
	#[instrument(skip(self, sections_url))]
	pub async fn change(&self, line: u32, quantity: u32, sections: &[&str], sections_url: Option<&str>) -> Result<Changed, Failure> {
		let body = serde_json::to_string(&ChangeBody { line, quantity, sections, sections_url }).map_err(Failure::parse)?;
		let (value, sections) = self.post(self.change_url.clone(), body).await?;
		let cart: CartState = serde_json::from_value(value).map_err(Failure::parse)?;
		debug!(item_count = cart.item_count, sections = sections.ids().count(), "Cart changed.");
		Ok(Changed { cart, sections })
	}

	/// Queries predictive search for `term`, which must already be trimmed.
	///
	/// # Errors
	///
	/// [`Failure::Network`], [`Failure::Http`] or [`Failure::Parse`].
	#[instrument(skip(self, term, config), fields(term_len = term.chars().count()))]
	pub async fn predictive_search(&self, term: &str, config: &SearchConfig) -> Result<PredictiveResults, Failure> {
		#[cfg(feature = "dangerous-logging")]
		trace!(term, "Predictive search.");

		let mut url = self.search_url.clone();
		url.query_pairs_mut()
			.append_pair("q", term)
			.append_pair("resources[type]", &config.resources.join(","))
			.append_pair("resources[limit]", &config.limit.to_string());

		let response = self.transport.send(Request::get(url, "application/json")).await?;
		if !response.is_success() {
			debug!(status = response.status, "Predictive search failed.");
			return Err(Failure::Http {
				status: response.status,
				description: description_of(&response.body),
			});
		}
		let body: SuggestBody = serde_json::from_str(&response.body).map_err(Failure::parse)?;
		Ok(body.resources.results)
	}

	async fn post(&self, url: Url, body: String) -> Result<(Value, Sections), Failure> {
		#[cfg(feature = "dangerous-logging")]
		trace!(%body, "Posting.");

		let response = self.transport.send(Request::post_json(url, body)).await?;
		let mut value = classify(&response)?;
		let sections = match value.as_object_mut().and_then(|object| object.remove("sections")) {
			Some(Value::Null) | None => Sections::new(),
			Some(sections) => serde_json::from_value(sections).map_err(Failure::parse)?,
		};
		trace!(status = response.status, "Response accepted.");
		Ok((value, sections))
	}
}

/// Turns a response into its JSON body, or the [`Failure`] it describes.
///
/// Some errors arrive with a success status and a `status` field in the body; those count as failures too.
fn classify(response: &Response) -> Result<Value, Failure> {
	if !response.is_success() {
		let status = response.status;
		return Err(match description_of(&response.body) {
			Some(message) if (400..500).contains(&status) => Failure::Validation { status, message },
			description => Failure::Http { status, description },
		});
	}

	let value: Value = serde_json::from_str(&response.body).map_err(Failure::parse)?;
	if let Some(status) = embedded_status(&value) {
		let message = description_of(&response.body);
		warn!(status, "Backend reported an error with a success status.");
		return Err(match message {
			Some(message) => Failure::Validation { status, message },
			None => Failure::Http { status, description: None },
		});
	}
	Ok(value)
}

fn embedded_status(value: &Value) -> Option<u16> {
	let status = value.get("status")?;
	let status = match status {
		Value::Number(number) => number.as_u64().and_then(|n| u16::try_from(n).ok()),
		Value::String(string) => string.parse().ok(),
		_ => None,
	}?;
	(status >= 400).then_some(status)
}
