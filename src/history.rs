//! URL state and full-page navigation.

use core::cell::{Cell, RefCell};
use tracing::{debug, trace};
use url::Url;

/// The session history of the page.
pub trait History {
	fn current(&self) -> Url;
	fn push(&self, url: &Url);
	fn replace(&self, url: &Url);
}

/// Leaves the page for `url`.
pub trait Navigator {
	fn navigate(&self, url: &Url);
}

/// `url` without its fragment and without query pairs that have an empty value.
///
/// Filter forms submit every field, including unset ones; those don't change what the page shows.
#[must_use]
pub fn canonical(url: &Url) -> Url {
	let mut canonical = url.clone();
	canonical.set_fragment(None);
	let pairs: Vec<(String, String)> = url.query_pairs().filter(|(_, value)| !value.is_empty()).map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
	if pairs.is_empty() {
		canonical.set_query(None);
	} else {
		canonical.query_pairs_mut().clear().extend_pairs(pairs);
	}
	canonical
}

/// Pushes the canonical form of `url` iff it differs from the canonical form of the current URL.
///
/// Returns whether an entry was pushed.
pub fn push_if_changed(history: &dyn History, url: &Url) -> bool {
	let next = canonical(url);
	if canonical(&history.current()) == next {
		trace!("URL unchanged; not pushing.");
		return false;
	}
	history.push(&next);
	debug!(path = next.path(), "History entry pushed.");
	true
}

/// In-memory [`History`] with a cursor, like the browser's.
#[derive(Debug)]
pub struct MemoryHistory {
	entries: RefCell<Vec<Url>>,
	cursor: Cell<usize>,
}

impl MemoryHistory {
	#[must_use]
	pub fn new(initial: Url) -> Self {
		Self {
			entries: RefCell::new(vec![initial]),
			cursor: Cell::new(0),
		}
	}

	/// Number of entries in the stack, including ones ahead of the cursor.
	#[must_use]
	pub fn entry_count(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Moves back one entry, returning the URL now current (like a `popstate` would report it).
	pub fn back(&self) -> Option<Url> {
		let cursor = self.cursor.get().checked_sub(1)?;
		self.cursor.set(cursor);
		Some(self.current())
	}

	pub fn forward(&self) -> Option<Url> {
		let cursor = self.cursor.get() + 1;
		let url = self.entries.borrow().get(cursor).cloned()?;
		self.cursor.set(cursor);
		Some(url)
	}
}

impl History for MemoryHistory {
	fn current(&self) -> Url {
		self.entries.borrow()[self.cursor.get()].clone()
	}

	fn push(&self, url: &Url) {
		let mut entries = self.entries.borrow_mut();
		entries.truncate(self.cursor.get() + 1);
		entries.push(url.clone());
		self.cursor.set(entries.len() - 1);
	}

	fn replace(&self, url: &Url) {
		self.entries.borrow_mut()[self.cursor.get()] = url.clone();
	}
}

/// Records navigations instead of performing them.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
	visited: RefCell<Vec<Url>>,
}

impl MemoryNavigator {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn visited(&self) -> Vec<Url> {
		self.visited.borrow().clone()
	}
}

impl Navigator for MemoryNavigator {
	fn navigate(&self, url: &Url) {
		self.visited.borrow_mut().push(url.clone());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).unwrap()
	}

	#[test]
	fn canonical_drops_empty_values_and_fragments() {
		assert_eq!(
			canonical(&url("https://shop.example/collections/all?filter.p.vendor=&sort_by=price-ascending#top")).as_str(),
			"https://shop.example/collections/all?sort_by=price-ascending"
		);
		assert_eq!(canonical(&url("https://shop.example/collections/all?filter.v.price.gte=")).as_str(), "https://shop.example/collections/all");
	}

	#[test]
	fn pushes_only_real_changes() {
		let history = MemoryHistory::new(url("https://shop.example/collections/all?sort_by=manual"));
		assert!(!push_if_changed(&history, &url("https://shop.example/collections/all?sort_by=manual&filter.p.vendor=")));
		assert_eq!(history.entry_count(), 1);

		assert!(push_if_changed(&history, &url("https://shop.example/collections/all?sort_by=price-ascending")));
		assert_eq!(history.entry_count(), 2);
		assert_eq!(history.back().unwrap().query(), Some("sort_by=manual"));
		assert_eq!(history.forward().unwrap().query(), Some("sort_by=price-ascending"));
	}

	#[test]
	fn push_after_back_drops_the_forward_entries() {
		let history = MemoryHistory::new(url("https://shop.example/a"));
		history.push(&url("https://shop.example/b"));
		history.back();
		history.push(&url("https://shop.example/c"));
		assert_eq!(history.entry_count(), 2);
		assert!(history.forward().is_none());
		assert_eq!(history.current().path(), "/c");
	}
}
