//! Session/local key-value storage.

use core::cell::RefCell;
use hashbrown::HashMap;

/// A `Storage`-like string store. Writes may silently fail (quota, private browsing), as in the browser.
pub trait KeyValueStore {
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: &str);
	fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore(RefCell<HashMap<String, String>>);

impl MemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.0.borrow().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) {
		self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
	}

	fn remove(&self, key: &str) {
		self.0.borrow_mut().remove(key);
	}
}
