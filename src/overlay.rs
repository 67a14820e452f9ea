//! The lifecycle every panel-like component shares.
//!
//! [`Overlay`] is composed into panels rather than inherited from: a panel owns one, forwards [`Panel`] to it and hooks
//! its own behavior in through [`Overlay::set_refresh_hook`] and [`Overlay::set_key_hook`].
//!
//! ```text
//! closed --open()--> open --close()--> closed
//! closed --mark_stale()--> closed (stale)
//! open/closed --refresh success (mark_fresh)--> same state, not stale
//! ```

use crate::{
	bus::EventBus,
	dom::{Document, DomNode, Key, KeyListener, KeyPress},
	event::{DomainEvent, OverlayChanged},
	focus::{focus_first, trap_tab, FocusTrap},
};
use core::{cell::RefCell, fmt};
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace};

/// `{open, close}` plus state, implemented by every panel.
pub trait Panel {
	fn open(&self);
	fn close(&self);
	fn is_open(&self) -> bool;

	fn toggle(&self) {
		if self.is_open() {
			self.close();
		} else {
			self.open();
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayOptions {
	/// Published in `overlay.opened` and `overlay.closed`.
	pub id: String,
	/// Class set on the overlay root while open.
	pub open_class: String,
	/// Class set on `<body>` while open, usually to lock scrolling.
	pub body_class: Option<String>,
	/// Whether opening moves focus to the first focusable descendant.
	pub focus_on_open: bool,
}

impl OverlayOptions {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			open_class: "active".into(),
			body_class: Some("overflow-hidden".into()),
			focus_on_open: true,
		}
	}

	#[must_use]
	pub fn open_class(self, open_class: impl Into<String>) -> Self {
		Self { open_class: open_class.into(), ..self }
	}

	#[must_use]
	pub fn body_class(self, body_class: Option<String>) -> Self {
		Self { body_class, ..self }
	}

	#[must_use]
	pub fn focus_on_open(self, focus_on_open: bool) -> Self {
		Self { focus_on_open, ..self }
	}
}

/// Key presses the panel wants to see before the overlay does.
///
/// Returns [`Some`] with the "suppress default" flag iff the press was consumed.
pub type KeyHook = Rc<dyn Fn(&KeyPress) -> Option<bool>>;

struct State<N> {
	open: bool,
	stale: bool,
	trap: Option<FocusTrap<N>>,
	keys: Option<KeyListener>,
}

struct Inner<D: Document> {
	document: Rc<D>,
	bus: EventBus,
	root: D::Node,
	options: OverlayOptions,
	state: RefCell<State<D::Node>>,
	refresh: RefCell<Option<Rc<dyn Fn()>>>,
	key_hook: RefCell<Option<KeyHook>>,
}

/// Open/close, focus containment, Escape-to-close and return-focus-to-trigger for one overlay root.
///
/// Cheap to clone. Dropping the last clone removes the key listener.
pub struct Overlay<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for Overlay<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for Overlay<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.0.state.borrow();
		f.debug_struct("Overlay")
			.field("id", &self.0.options.id)
			.field("open", &state.open)
			.field("stale", &state.stale)
			.field("listening", &state.keys.is_some())
			.finish_non_exhaustive()
	}
}

impl<D: Document> Overlay<D> {
	pub fn new(document: Rc<D>, bus: EventBus, root: D::Node, options: OverlayOptions) -> Self {
		Self(Rc::new(Inner {
			document,
			bus,
			root,
			options,
			state: RefCell::new(State {
				open: false,
				stale: false,
				trap: None,
				keys: None,
			}),
			refresh: RefCell::default(),
			key_hook: RefCell::default(),
		}))
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.0.options.id
	}

	#[must_use]
	pub fn root(&self) -> &D::Node {
		&self.0.root
	}

	#[must_use]
	pub fn document(&self) -> &Rc<D> {
		&self.0.document
	}

	/// Called when the overlay opens while stale. It should call [`Overlay::mark_fresh`] once the refresh succeeded.
	pub fn set_refresh_hook(&self, hook: impl 'static + Fn()) {
		*self.0.refresh.borrow_mut() = Some(Rc::new(hook));
	}

	pub fn set_key_hook(&self, hook: impl 'static + Fn(&KeyPress) -> Option<bool>) {
		*self.0.key_hook.borrow_mut() = Some(Rc::new(hook));
	}

	#[must_use]
	pub fn is_stale(&self) -> bool {
		self.0.state.borrow().stale
	}

	/// Records that the content is out of date, to be refreshed on the next [`Panel::open`].
	pub fn mark_stale(&self) {
		trace!(id = %self.0.options.id, "Marked stale.");
		self.0.state.borrow_mut().stale = true;
	}

	pub fn mark_fresh(&self) {
		self.0.state.borrow_mut().stale = false;
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakOverlay<D> {
		WeakOverlay(Rc::downgrade(&self.0))
	}

	/// Escape closes, Tab stays inside. Returns whether the default action must be suppressed.
	pub fn handle_key(&self, press: &KeyPress) -> bool {
		if !self.is_open() {
			return false;
		}
		let hook = self.0.key_hook.borrow().clone();
		if let Some(handled) = hook.and_then(|hook| hook(press)) {
			return handled;
		}
		match press.key {
			Key::Escape => {
				self.close();
				true
			}
			Key::Tab => trap_tab(&self.0.root, self.0.document.active_element().as_ref(), press.shift),
			Key::Other(_) => false,
		}
	}
}

impl<D: Document> Panel for Overlay<D> {
	#[instrument(skip(self), fields(id = %self.0.options.id))]
	fn open(&self) {
		let inner = &self.0;
		let stale = {
			let mut state = inner.state.borrow_mut();
			if state.open {
				trace!("Already open.");
				return;
			}
			state.open = true;
			state.trap = Some(FocusTrap::capture(&*inner.document, inner.root.clone()));
			let weak = self.downgrade();
			state.keys = Some(inner.document.listen_keys(Box::new(move |press: &KeyPress| weak.upgrade().map_or(false, |overlay| overlay.handle_key(press)))));
			state.stale
		};

		inner.root.add_class(&inner.options.open_class);
		if let (Some(class), Some(body)) = (&inner.options.body_class, inner.document.body()) {
			body.add_class(class);
		}
		if inner.options.focus_on_open {
			focus_first(&inner.root);
		}
		debug!(stale, "Opened.");

		inner.bus.publish(&DomainEvent::OverlayOpened(OverlayChanged { overlay_id: inner.options.id.clone() }));

		if stale {
			let refresh = inner.refresh.borrow().clone();
			if let Some(refresh) = refresh {
				refresh();
			}
		}
	}

	#[instrument(skip(self), fields(id = %self.0.options.id))]
	fn close(&self) {
		let inner = &self.0;
		let (trap, keys) = {
			let mut state = inner.state.borrow_mut();
			if !state.open {
				trace!("Already closed.");
				return;
			}
			state.open = false;
			(state.trap.take(), state.keys.take())
		};
		drop(keys);

		inner.root.remove_class(&inner.options.open_class);
		if let (Some(class), Some(body)) = (&inner.options.body_class, inner.document.body()) {
			body.remove_class(class);
		}
		if let Some(trap) = trap {
			trap.restore();
		}
		debug!("Closed.");

		inner.bus.publish(&DomainEvent::OverlayClosed(OverlayChanged { overlay_id: inner.options.id.clone() }));
	}

	fn is_open(&self) -> bool {
		self.0.state.borrow().open
	}
}

/// Non-owning [`Overlay`] handle for closures.
pub struct WeakOverlay<D: Document>(Weak<Inner<D>>);

impl<D: Document> Clone for WeakOverlay<D> {
	fn clone(&self) -> Self {
		Self(Weak::clone(&self.0))
	}
}

impl<D: Document> WeakOverlay<D> {
	#[must_use]
	pub fn upgrade(&self) -> Option<Overlay<D>> {
		self.0.upgrade().map(Overlay)
	}
}
