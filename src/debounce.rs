//! Trailing-edge debouncing, keyed.
//!
//! At most one task is pending per key. Scheduling again under the same key cancels the pending task and restarts the
//! delay, so a burst of calls runs only the last one. Tasks under different keys are independent and run in the order
//! their delays expire.

use crate::runtime::{Scheduler, TimerId};
use core::{
	cell::{Cell, RefCell},
	fmt,
	time::Duration,
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

type Pending = RefCell<HashMap<String, (u64, TimerId)>>;

pub struct CommandQueue {
	scheduler: Rc<dyn Scheduler>,
	pending: Rc<Pending>,
	generation: Cell<u64>,
}

impl fmt::Debug for CommandQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CommandQueue").field("pending", &self.pending.borrow().keys().collect::<Vec<_>>()).finish_non_exhaustive()
	}
}

impl CommandQueue {
	pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
		Self {
			scheduler,
			pending: Rc::default(),
			generation: Cell::new(0),
		}
	}

	/// Runs `task` after `delay`, unless it's replaced or cancelled first.
	#[instrument(skip(self, task))]
	pub fn schedule(&self, key: &str, delay: Duration, task: impl 'static + FnOnce()) {
		self.cancel(key);

		let generation = self.generation.get() + 1;
		self.generation.set(generation);
		let pending = Rc::downgrade(&self.pending);
		let owned_key = key.to_owned();
		let id = self.scheduler.set_timeout(
			delay,
			Box::new(move || {
				if !take_if_current(&pending, &owned_key, generation) {
					trace!(key = %owned_key, "Stale debounce timer ignored.");
					return;
				}
				trace!(key = %owned_key, "Running debounced task.");
				task();
			}),
		);
		self.pending.borrow_mut().insert(key.to_owned(), (generation, id));
	}

	/// Cancels the task pending under `key`. Returns whether there was one.
	pub fn cancel(&self, key: &str) -> bool {
		let removed = self.pending.borrow_mut().remove(key);
		match removed {
			Some((_, id)) => {
				self.scheduler.clear_timeout(id);
				trace!(key, "Debounced task cancelled.");
				true
			}
			None => false,
		}
	}

	pub fn cancel_all(&self) {
		let drained: Vec<_> = self.pending.borrow_mut().drain().collect();
		for (_, (_, id)) in drained {
			self.scheduler.clear_timeout(id);
		}
	}

	#[must_use]
	pub fn is_pending(&self, key: &str) -> bool {
		self.pending.borrow().contains_key(key)
	}
}

impl Drop for CommandQueue {
	fn drop(&mut self) {
		self.cancel_all();
	}
}

/// Removes `key`'s entry iff it still belongs to `generation`.
fn take_if_current(pending: &Weak<Pending>, key: &str, generation: u64) -> bool {
	let Some(pending) = pending.upgrade() else {
		return false;
	};
	let mut pending = pending.borrow_mut();
	match pending.get(key) {
		Some(&(current, _)) if current == generation => {
			pending.remove(key);
			true
		}
		_ => false,
	}
}
