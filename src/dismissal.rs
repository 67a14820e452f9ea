//! One-shot dismissal flags for announcement bars and popups.
//!
//! A flag is keyed by the element's explicit id if it has one, and by a hash of its content otherwise, so that new
//! content shows up again even for users who dismissed the previous one.
//!
//! # Collisions
//!
//! The content hash is the 32-bit `String.hashCode` of JavaScript-land tradition (over UTF-16 code units).
//! It's weak: unrelated texts can share a hash, in which case dismissing one also dismisses the other.
//! Give elements an explicit id where that matters.

use crate::{
	dom::DomNode,
	overlay::Panel,
	storage::KeyValueStore,
};
use core::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// 32-bit polynomial hash of `text`'s UTF-16 code units, `h = 31 * h + unit` with wrapping.
#[must_use]
pub fn content_hash(text: &str) -> i32 {
	text.encode_utf16().fold(0_i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissalKey {
	Explicit(String),
	Content(i32),
}

impl DismissalKey {
	/// `explicit` if given and non-empty, the hash of `content` otherwise.
	#[must_use]
	pub fn new(explicit: Option<&str>, content: &str) -> Self {
		match explicit.map(str::trim).filter(|id| !id.is_empty()) {
			Some(id) => DismissalKey::Explicit(id.to_owned()),
			None => DismissalKey::Content(content_hash(content.trim())),
		}
	}
}

impl fmt::Display for DismissalKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DismissalKey::Explicit(id) => f.write_str(id),
			DismissalKey::Content(hash) => write!(f, "{}", hash),
		}
	}
}

/// A persisted "don't show this again".
pub struct Dismissal {
	store: Rc<dyn KeyValueStore>,
	storage_key: String,
}

impl fmt::Debug for Dismissal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dismissal").field("storage_key", &self.storage_key).finish_non_exhaustive()
	}
}

impl Dismissal {
	pub fn new(store: Rc<dyn KeyValueStore>, prefix: &str, key: &DismissalKey) -> Self {
		Self {
			store,
			storage_key: format!("{}-dismissed-{}", prefix, key),
		}
	}

	#[must_use]
	pub fn storage_key(&self) -> &str {
		&self.storage_key
	}

	#[must_use]
	pub fn is_dismissed(&self) -> bool {
		self.store.get(&self.storage_key).is_some()
	}

	pub fn dismiss(&self) {
		trace!(key = %self.storage_key, "Dismissed.");
		self.store.set(&self.storage_key, "true");
	}

	pub fn reset(&self) {
		self.store.remove(&self.storage_key);
	}
}

/// An announcement bar that stays hidden once dismissed.
#[derive(Debug)]
pub struct DismissibleBanner<N> {
	root: N,
	dismissal: Dismissal,
}

impl<N: DomNode> DismissibleBanner<N> {
	/// Keys the dismissal by the root's `data-dismissal-id`, or by its text.
	/// Hides the banner right away if it was dismissed before.
	pub fn attach(root: N, store: Rc<dyn KeyValueStore>) -> Self {
		let key = DismissalKey::new(root.attribute("data-dismissal-id").as_deref(), &root.text_content());
		let dismissal = Dismissal::new(store, "announcement", &key);
		let banner = Self { root, dismissal };
		if banner.dismissal.is_dismissed() {
			debug!(key = %banner.dismissal.storage_key, "Announcement dismissed before; hiding it.");
			banner.root.set_hidden(true);
		}
		banner
	}

	pub fn dismiss(&self) {
		self.dismissal.dismiss();
		self.root.set_hidden(true);
	}

	#[must_use]
	pub fn dismissal(&self) -> &Dismissal {
		&self.dismissal
	}
}

impl<N: DomNode> Panel for DismissibleBanner<N> {
	fn open(&self) {
		if !self.dismissal.is_dismissed() {
			self.root.set_hidden(false);
		}
	}

	fn close(&self) {
		self.dismiss();
	}

	fn is_open(&self) -> bool {
		!self.root.is_hidden()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{storage::MemoryStore, vdom::VDocument};

	#[test]
	fn hash_matches_the_usual_string_hash() {
		assert_eq!(content_hash(""), 0);
		assert_eq!(content_hash("a"), 97);
		assert_eq!(content_hash("hello"), 99_162_322);
		// Wraps around instead of overflowing.
		assert_eq!(content_hash("Free shipping on all orders over €50!"), content_hash("Free shipping on all orders over €50!"));
		assert_ne!(content_hash("Sale"), content_hash("Sales"));
	}

	#[test]
	fn hash_collisions_share_a_flag() {
		// "Aa" and "BB" hash alike; dismissing one dismisses the other.
		assert_eq!(content_hash("Aa"), content_hash("BB"));
		let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
		Dismissal::new(Rc::clone(&store), "announcement", &DismissalKey::new(None, "Aa")).dismiss();
		assert!(Dismissal::new(store, "announcement", &DismissalKey::new(None, "BB")).is_dismissed());
	}

	#[test]
	fn banner_stays_hidden_until_its_content_changes() {
		let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
		let first = VDocument::from_body("<div id=bar>Free shipping this week</div>").unwrap();
		let banner = DismissibleBanner::attach(first.select("#bar").unwrap(), Rc::clone(&store));
		assert!(banner.is_open());
		banner.close();
		assert!(first.select("#bar").unwrap().is_hidden());

		let reload = VDocument::from_body("<div id=bar>Free shipping this week</div>").unwrap();
		let banner = DismissibleBanner::attach(reload.select("#bar").unwrap(), Rc::clone(&store));
		assert!(!banner.is_open());

		let changed = VDocument::from_body("<div id=bar>Summer sale</div>").unwrap();
		let banner = DismissibleBanner::attach(changed.select("#bar").unwrap(), store);
		assert!(banner.is_open());
	}

	#[test]
	fn explicit_ids_win_over_content() {
		assert_eq!(DismissalKey::new(Some(" promo-7 "), "anything"), DismissalKey::Explicit("promo-7".into()));
		assert_eq!(DismissalKey::new(Some(""), "a"), DismissalKey::Content(97));
	}
}
