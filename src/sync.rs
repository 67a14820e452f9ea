//! Fetching server-rendered fragments, and telling fresh responses from stale ones.
//!
//! The [`FragmentClient`] is stateless. Ordering is the caller's business: every consumer that may have more than one
//! request in flight owns a [`TokenCounter`], issues a token *before* sending, and applies a response only if its token
//! is still current when the response arrives. Nothing is aborted; stale responses are simply dropped.

use crate::{error::Failure, model::Sections};
use core::{cell::Cell, fmt};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use tracing::{debug, instrument, trace};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub method: Method,
	pub url: Url,
	/// JSON body for [`Method::Post`].
	pub body: Option<String>,
	pub accept: &'static str,
}

impl Request {
	#[must_use]
	pub fn get(url: Url, accept: &'static str) -> Self {
		Self { method: Method::Get, url, body: None, accept }
	}

	#[must_use]
	pub fn post_json(url: Url, body: String) -> Self {
		Self {
			method: Method::Post,
			url,
			body: Some(body),
			accept: "application/json",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub status: u16,
	pub body: String,
}

impl Response {
	#[must_use]
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into() }
	}

	#[must_use]
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport-level failure: the request didn't produce an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<TransportError> for Failure {
	fn from(error: TransportError) -> Self {
		Failure::Network(error.0)
	}
}

/// Sends HTTP requests on the page's event loop.
pub trait Transport {
	fn send(&self, request: Request) -> LocalBoxFuture<'static, Result<Response, TransportError>>;
}

/// What a fragment endpoint answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentResponse {
	/// A rendered HTML document, regions to be extracted by the caller.
	Html(String),
	/// A JSON body, with its bundled `sections` map (if any) split out.
	Json { value: serde_json::Value, sections: Sections },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
	Html,
	Json,
}

#[derive(Clone)]
pub struct FragmentClient {
	transport: Rc<dyn Transport>,
}

impl fmt::Debug for FragmentClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FragmentClient").finish_non_exhaustive()
	}
}

impl FragmentClient {
	pub fn new(transport: Rc<dyn Transport>) -> Self {
		Self { transport }
	}

	#[must_use]
	pub fn transport(&self) -> &Rc<dyn Transport> {
		&self.transport
	}

	/// Fetches `endpoint` (which already carries every query parameter it needs).
	///
	/// # Errors
	///
	/// - [`Failure::Network`] if no response arrived,
	/// - [`Failure::Http`] for a non-success status,
	/// - [`Failure::Parse`] if a JSON body was expected but didn't parse.
	#[instrument(skip(self), fields(endpoint = %endpoint))]
	pub async fn fetch_fragment(&self, endpoint: Url, expect: Expect) -> Result<FragmentResponse, Failure> {
		let accept = match expect {
			Expect::Html => "text/html",
			Expect::Json => "application/json",
		};
		let response = self.transport.send(Request::get(endpoint, accept)).await?;
		if !response.is_success() {
			debug!(status = response.status, "Fragment request failed.");
			return Err(Failure::Http {
				status: response.status,
				description: description_of(&response.body),
			});
		}
		trace!(len = response.body.len(), "Fragment received.");

		match expect {
			Expect::Html => Ok(FragmentResponse::Html(response.body)),
			Expect::Json => {
				let mut value: serde_json::Value = serde_json::from_str(&response.body).map_err(Failure::parse)?;
				let sections = match value.as_object_mut().and_then(|object| object.remove("sections")) {
					Some(sections) => serde_json::from_value(sections).map_err(Failure::parse)?,
					None => Sections::new(),
				};
				Ok(FragmentResponse::Json { value, sections })
			}
		}
	}

	/// Fetches one section's rendered HTML, adding `section_id` to `endpoint` unless it's already there.
	///
	/// # Errors
	///
	/// See [`FragmentClient::fetch_fragment`].
	pub async fn fetch_section(&self, mut endpoint: Url, section_id: &str) -> Result<String, Failure> {
		if !endpoint.query_pairs().any(|(key, _)| key == "section_id") {
			endpoint.query_pairs_mut().append_pair("section_id", section_id);
		}
		match self.fetch_fragment(endpoint, Expect::Html).await? {
			FragmentResponse::Html(html) => Ok(html),
			FragmentResponse::Json { .. } => Err(Failure::parse("expected HTML")),
		}
	}

	/// Fetches and deserializes a JSON body.
	///
	/// # Errors
	///
	/// See [`FragmentClient::fetch_fragment`]; [`Failure::Parse`] also if the body doesn't match `T`.
	pub async fn fetch_json<T: DeserializeOwned>(&self, endpoint: Url) -> Result<T, Failure> {
		match self.fetch_fragment(endpoint, Expect::Json).await? {
			FragmentResponse::Json { value, .. } => serde_json::from_value(value).map_err(Failure::parse),
			FragmentResponse::Html(_) => Err(Failure::parse("expected JSON")),
		}
	}
}

/// The `description` (or `message`) field of a JSON error body, if there is one.
pub(crate) fn description_of(body: &str) -> Option<String> {
	let value: serde_json::Value = serde_json::from_str(body).ok()?;
	["description", "message"]
		.into_iter()
		.find_map(|key| value.get(key).and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned))
}

/// Identifies one request issued by one consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Per-consumer monotonic request counter.
///
/// `next` only ever grows; `current` is the token whose response may still be applied.
#[derive(Debug, Default)]
pub struct TokenCounter {
	next: Cell<u64>,
	current: Cell<u64>,
}

impl TokenCounter {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a new token, superseding all previously issued ones.
	pub fn issue(&self) -> RequestToken {
		let token = self.next.get() + 1;
		self.next.set(token);
		self.current.set(token);
		RequestToken(token)
	}

	#[must_use]
	pub fn is_current(&self, token: RequestToken) -> bool {
		self.current.get() == token.0
	}

	/// Supersedes everything in flight without issuing a request.
	pub fn invalidate(&self) {
		self.issue();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn later_tokens_supersede_earlier_ones() {
		let tokens = TokenCounter::new();
		let first = tokens.issue();
		assert!(tokens.is_current(first));
		let second = tokens.issue();
		assert!(!tokens.is_current(first));
		assert!(tokens.is_current(second));
		assert!(second > first);

		tokens.invalidate();
		assert!(!tokens.is_current(second));
	}

	#[test]
	fn descriptions_are_read_from_error_bodies() {
		assert_eq!(description_of(r#"{"status": 422, "description": "Only 2 available"}"#).as_deref(), Some("Only 2 available"));
		assert_eq!(description_of(r#"{"message": "Cart Error"}"#).as_deref(), Some("Cart Error"));
		assert_eq!(description_of(r#"{"description": ""}"#), None);
		assert_eq!(description_of("<html>"), None);
	}
}
