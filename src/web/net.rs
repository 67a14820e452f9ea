//! [`Transport`] over `window.fetch`.

use crate::sync::{Method, Request, Response, Transport, TransportError};
use core::fmt;
use futures::{future::LocalBoxFuture, FutureExt};
use tracing::{debug, instrument};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{RequestInit, Window};

/// Same-origin `fetch` with the page's credentials.
pub struct FetchTransport {
	window: Window,
}

impl fmt::Debug for FetchTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FetchTransport").finish_non_exhaustive()
	}
}

impl FetchTransport {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl Transport for FetchTransport {
	fn send(&self, request: Request) -> LocalBoxFuture<'static, Result<Response, TransportError>> {
		fetch(self.window.clone(), request).boxed_local()
	}
}

fn js_error(error: &JsValue) -> TransportError {
	let message = match error.dyn_ref::<js_sys::Error>() {
		Some(error) => String::from(error.message()),
		None => error.as_string().unwrap_or_else(|| format!("{:?}", error)),
	};
	TransportError(message)
}

#[instrument(skip(window, request), fields(method = ?request.method, path = request.url.path()))]
async fn fetch(window: Window, request: Request) -> Result<Response, TransportError> {
	let init = RequestInit::new();
	init.set_method(match request.method {
		Method::Get => "GET",
		Method::Post => "POST",
	});
	if let Some(body) = &request.body {
		init.set_body(&JsValue::from_str(body));
	}

	let js_request = web_sys::Request::new_with_str_and_init(request.url.as_str(), &init).map_err(|error| js_error(&error))?;
	let headers = js_request.headers();
	headers.set("Accept", request.accept).map_err(|error| js_error(&error))?;
	if request.body.is_some() {
		headers.set("Content-Type", "application/json").map_err(|error| js_error(&error))?;
	}

	let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&js_request))
		.await
		.map_err(|error| js_error(&error))?
		.dyn_into()
		.map_err(|error| js_error(&error))?;
	let status = response.status();
	let text = response.text().map_err(|error| js_error(&error))?;
	let body = JsFuture::from(text).await.map_err(|error| js_error(&error))?.as_string().unwrap_or_default();
	debug!(status, len = body.len(), "Fetched.");
	Ok(Response { status, body })
}
