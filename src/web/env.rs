//! Session history, navigation and storage backed by `window`.

use crate::{
	history::{History, Navigator},
	storage::KeyValueStore,
};
use core::{cell::RefCell, fmt};
use tracing::{error, warn};
use url::Url;
use wasm_bindgen::JsValue;
use web_sys::{Storage, Window};

pub struct WebHistory {
	window: Window,
	/// Last URL that parsed.
	last: RefCell<Url>,
}

impl fmt::Debug for WebHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebHistory").finish_non_exhaustive()
	}
}

impl WebHistory {
	/// # Errors
	///
	/// Iff the page's own URL doesn't parse.
	pub fn new(window: Window) -> Result<Self, url::ParseError> {
		let last = Url::parse(&window.location().href().unwrap_or_default())?;
		Ok(Self { window, last: RefCell::new(last) })
	}

	fn history(&self) -> Option<web_sys::History> {
		match self.window.history() {
			Ok(history) => Some(history),
			Err(error) => {
				error!("No `window.history`: {:?}", error);
				None
			}
		}
	}
}

impl History for WebHistory {
	fn current(&self) -> Url {
		match self.window.location().href().map(|href| Url::parse(&href)) {
			Ok(Ok(url)) => {
				*self.last.borrow_mut() = url.clone();
				url
			}
			_ => {
				warn!("Can't read the current URL; using the last known one.");
				self.last.borrow().clone()
			}
		}
	}

	fn push(&self, url: &Url) {
		if let Some(history) = self.history() {
			if let Err(error) = history.push_state_with_url(&JsValue::NULL, "", Some(url.as_str())) {
				error!("`pushState` failed: {:?}", error);
			}
		}
	}

	fn replace(&self, url: &Url) {
		if let Some(history) = self.history() {
			if let Err(error) = history.replace_state_with_url(&JsValue::NULL, "", Some(url.as_str())) {
				error!("`replaceState` failed: {:?}", error);
			}
		}
	}
}

pub struct WebNavigator {
	window: Window,
}

impl fmt::Debug for WebNavigator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebNavigator").finish_non_exhaustive()
	}
}

impl WebNavigator {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl Navigator for WebNavigator {
	fn navigate(&self, url: &Url) {
		if let Err(error) = self.window.location().set_href(url.as_str()) {
			error!("Navigation failed: {:?}", error);
		}
	}
}

/// `sessionStorage` or `localStorage`. Unavailable storage (private browsing, blocked cookies) reads as empty.
pub struct WebStorage(Option<Storage>);

impl fmt::Debug for WebStorage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("WebStorage").field(&self.0.is_some()).finish()
	}
}

impl WebStorage {
	#[must_use]
	pub fn session(window: &Window) -> Self {
		Self(window.session_storage().ok().flatten())
	}

	#[must_use]
	pub fn local(window: &Window) -> Self {
		Self(window.local_storage().ok().flatten())
	}
}

impl KeyValueStore for WebStorage {
	fn get(&self, key: &str) -> Option<String> {
		self.0.as_ref()?.get_item(key).ok().flatten()
	}

	fn set(&self, key: &str, value: &str) {
		if let Some(storage) = &self.0 {
			if let Err(error) = storage.set_item(key, value) {
				warn!("Storage write failed: {:?}", error);
			}
		}
	}

	fn remove(&self, key: &str) {
		if let Some(storage) = &self.0 {
			if let Err(error) = storage.remove_item(key) {
				warn!("Storage removal failed: {:?}", error);
			}
		}
	}
}
