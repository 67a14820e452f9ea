//! Focus containment for open overlays.

use crate::dom::{Document, DomNode};
use tracing::trace;

/// Where Tab has to send focus to stay inside a container with `count` focusable elements,
/// given the position of the currently focused one (if it's inside at all).
///
/// Returns [`None`] iff the browser's default traversal already stays inside.
#[must_use]
pub fn wrap_index(count: usize, current: Option<usize>, backwards: bool) -> Option<usize> {
	let last = count.checked_sub(1)?;
	match (current, backwards) {
		(None, false) => Some(0),
		(None, true) => Some(last),
		(Some(i), false) if i >= last => Some(0),
		(Some(0), true) => Some(last),
		(Some(_), _) => None,
	}
}

/// Focuses the first focusable descendant of `container`. Returns whether there was one.
pub fn focus_first<N: DomNode>(container: &N) -> bool {
	match container.focusable_descendants().first() {
		Some(first) => {
			first.focus();
			true
		}
		None => {
			trace!("Nothing to focus.");
			false
		}
	}
}

/// Handles a Tab press inside `container`. Returns whether the default action must be suppressed.
pub fn trap_tab<N: DomNode>(container: &N, active: Option<&N>, backwards: bool) -> bool {
	let focusable = container.focusable_descendants();
	if focusable.is_empty() {
		// Nowhere to go, but focus mustn't leave either.
		return true;
	}
	let current = active.and_then(|active| focusable.iter().position(|f| f.is_same_node(active)));
	match wrap_index(focusable.len(), current, backwards) {
		Some(target) => {
			focusable[target].focus();
			true
		}
		None => false,
	}
}

/// What to restore when an overlay closes.
#[derive(Debug)]
pub struct FocusTrap<N> {
	pub previously_focused: Option<N>,
	pub container: N,
}

impl<N: DomNode> FocusTrap<N> {
	/// Remembers what's focused in `document` right now.
	pub fn capture<D: Document<Node = N>>(document: &D, container: N) -> Self {
		Self {
			previously_focused: document.active_element(),
			container,
		}
	}

	/// Gives focus back, unless the element it came from is gone.
	pub fn restore(self) {
		match self.previously_focused {
			Some(previous) if previous.is_connected() => previous.focus(),
			Some(_) => trace!("Previously focused element is gone; leaving focus alone."),
			None => (),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		dom::{Key, KeyPress},
		vdom::VDocument,
	};

	#[test]
	fn wraps_only_at_the_edges() {
		assert_eq!(wrap_index(0, None, false), None);
		assert_eq!(wrap_index(3, Some(2), false), Some(0));
		assert_eq!(wrap_index(3, Some(0), true), Some(2));
		assert_eq!(wrap_index(3, Some(1), false), None);
		assert_eq!(wrap_index(3, Some(1), true), None);
		assert_eq!(wrap_index(3, None, true), Some(2));
		assert_eq!(wrap_index(1, Some(0), false), Some(0));
	}

	#[test]
	fn tab_cycles_inside_the_container() {
		let document = VDocument::from_body("<button id=outside>o</button><div id=panel><a href=/a id=a>a</a><button id=b>b</button></div>").unwrap();
		let panel = document.select("#panel").unwrap();
		let b = document.select("#b").unwrap();
		b.focus();

		assert!(trap_tab(&panel, document.active_element().as_ref(), false));
		assert_eq!(document.active_element().unwrap().get_attribute("id").as_deref(), Some("a"));

		assert!(trap_tab(&panel, document.active_element().as_ref(), true));
		assert!(document.active_element().unwrap().is_same_node(&b));

		// In the middle, the default traversal is left alone.
		document.select("#a").unwrap().focus();
		assert!(!trap_tab(&panel, document.active_element().as_ref(), false));
		document.press_key(&KeyPress::new(Key::Tab));
		assert!(document.active_element().unwrap().is_same_node(&b));
	}

	#[test]
	fn restore_skips_detached_elements() {
		let document = VDocument::from_body("<div id=box><button id=trigger>t</button></div><div id=panel><button>x</button></div>").unwrap();
		let trigger = document.select("#trigger").unwrap();
		trigger.focus();
		let trap = FocusTrap::capture(&document, document.select("#panel").unwrap());
		focus_first(&trap.container);
		document.select("#box").unwrap().detach();

		let focused = document.active_element();
		trap.restore();
		assert_eq!(document.active_element().map(|n| n.outer_html()), focused.map(|n| n.outer_html()));
	}
}
