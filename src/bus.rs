//! Page-scoped, synchronous publish/subscribe.
//!
//! There is exactly one [`EventBus`] per page. It's constructed together with the [`Page`](`crate::page::Page`)
//! and handed to components by reference (it's a cheap [`Rc`] handle), so no component reaches for a global.
//!
//! # Delivery
//!
//! [`EventBus::publish`] calls every handler subscribed to the event's kind, in subscription order, before it returns.
//! The handler list is snapshotted first: handlers may subscribe, unsubscribe or publish from inside a handler,
//! which affects the *next* publication only.
//!
//! A panicking handler is logged and skipped; the remaining handlers still receive the event.

use crate::event::{DomainEvent, EventKind};
use core::{cell::RefCell, fmt};
use hashbrown::HashMap;
use std::{
	panic::{catch_unwind, AssertUnwindSafe},
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, trace_span};

type Handler = Rc<dyn Fn(&DomainEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
	next_id: u64,
	handlers: HashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
}

/// Result of one [`EventBus::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
	pub delivered: usize,
	pub failed: usize,
}

#[derive(Clone, Default)]
pub struct EventBus {
	registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let registry = self.registry.borrow();
		f.debug_struct("EventBus")
			.field("handlers", &registry.handlers.iter().map(|(kind, handlers)| (kind.as_str(), handlers.len())).collect::<Vec<_>>())
			.finish()
	}
}

impl EventBus {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for `kind`.
	///
	/// The subscription lasts as long as the returned [`Subscription`]; drop it (or call [`EventBus::unsubscribe`]) on teardown.
	#[must_use = "Dropping the `Subscription` unsubscribes immediately."]
	pub fn subscribe(&self, kind: EventKind, handler: impl 'static + Fn(&DomainEvent)) -> Subscription {
		let mut registry = self.registry.borrow_mut();
		registry.next_id += 1;
		let id = SubscriptionId(registry.next_id);
		registry.handlers.entry(kind).or_default().push((id, Rc::new(handler)));
		trace!(%kind, ?id, "Subscribed.");
		Subscription {
			registry: Rc::downgrade(&self.registry),
			kind,
			id,
		}
	}

	/// Removes a handler by id. Returns whether it was still registered.
	pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
		remove(&self.registry, kind, id)
	}

	#[instrument(skip(self, event), fields(kind = %event.kind()))]
	pub fn publish(&self, event: &DomainEvent) -> Delivery {
		let handlers: Vec<(SubscriptionId, Handler)> = self.registry.borrow().handlers.get(&event.kind()).cloned().unwrap_or_default();

		let mut delivery = Delivery::default();
		for (id, handler) in handlers {
			let span = trace_span!("Delivering", ?id);
			let _enter = span.enter();
			match catch_unwind(AssertUnwindSafe(|| handler(event))) {
				Ok(()) => delivery.delivered += 1,
				Err(panic) => {
					delivery.failed += 1;
					let message = panic
						.downcast_ref::<&str>()
						.map(|s| (*s).to_owned())
						.or_else(|| panic.downcast_ref::<String>().cloned())
						.unwrap_or_default();
					error!(?id, message, "Event handler panicked; continuing with the remaining handlers.");
				}
			}
		}
		trace!(delivered = delivery.delivered, failed = delivery.failed, "Published.");
		delivery
	}

	#[must_use]
	pub fn handler_count(&self, kind: EventKind) -> usize {
		self.registry.borrow().handlers.get(&kind).map_or(0, Vec::len)
	}
}

fn remove(registry: &RefCell<Registry>, kind: EventKind, id: SubscriptionId) -> bool {
	let mut registry = registry.borrow_mut();
	let Some(handlers) = registry.handlers.get_mut(&kind) else {
		return false;
	};
	let before = handlers.len();
	handlers.retain(|(existing, _)| *existing != id);
	let removed = handlers.len() != before;
	if handlers.is_empty() {
		registry.handlers.remove(&kind);
	}
	removed
}

/// Keeps a handler registered. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
	registry: Weak<RefCell<Registry>>,
	kind: EventKind,
	id: SubscriptionId,
}

impl Subscription {
	#[must_use]
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	#[must_use]
	pub fn kind(&self) -> EventKind {
		self.kind
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			if remove(&registry, self.kind, self.id) {
				trace!(kind = %self.kind, id = ?self.id, "Unsubscribed.");
			}
		}
	}
}

/// All subscriptions of one component, released together on detach.
#[derive(Debug, Default)]
pub struct SubscriptionSet(RefCell<Vec<Subscription>>);

impl SubscriptionSet {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, subscription: Subscription) {
		self.0.borrow_mut().push(subscription);
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		// Dropped outside of the borrow, as `Drop` re-enters the registry.
		let subscriptions = self.0.take();
		drop(subscriptions);
	}
}
