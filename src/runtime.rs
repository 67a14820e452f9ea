//! Event-loop seams: running `!Send` futures and single-shot timers.

use core::{
	cell::{Cell, RefCell},
	fmt,
	time::Duration,
};
use futures::{executor::LocalSpawner, future::LocalBoxFuture, task::LocalSpawnExt};
use std::collections::BTreeMap;
use tracing::{error, trace};

/// Runs futures to completion on the page's (single) event loop.
pub trait Spawner {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}

impl Spawner for LocalSpawner {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		if let Err(error) = self.spawn_local(future) {
			error!(%error, "Failed to spawn a task: the executor is shut down.");
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Single-shot timers. A timer callback runs at most once, and never after it was cleared.
pub trait Scheduler {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;
	fn clear_timeout(&self, id: TimerId);
}

/// A [`Scheduler`] driven by a virtual clock: nothing fires until [`ManualScheduler::advance`] is called.
///
/// Timers fire in deadline order, ties in scheduling order.
#[derive(Default)]
pub struct ManualScheduler {
	now: Cell<Duration>,
	next_id: Cell<u64>,
	timers: RefCell<BTreeMap<(Duration, TimerId), Box<dyn FnOnce()>>>,
}

impl fmt::Debug for ManualScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManualScheduler").field("now", &self.now.get()).field("pending", &self.pending()).finish()
	}
}

impl ManualScheduler {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn now(&self) -> Duration {
		self.now.get()
	}

	#[must_use]
	pub fn pending(&self) -> usize {
		self.timers.borrow().len()
	}

	/// Moves the clock forward by `by`, firing every timer that comes due on the way.
	///
	/// Timers scheduled by firing callbacks also fire if they come due within the same window.
	pub fn advance(&self, by: Duration) {
		let target = self.now.get() + by;
		loop {
			let due = {
				let mut timers = self.timers.borrow_mut();
				match timers.keys().next().copied() {
					Some(key) if key.0 <= target => timers.remove(&key).map(|callback| (key, callback)),
					_ => None,
				}
			};
			let Some(((deadline, id), callback)) = due else {
				break;
			};
			self.now.set(deadline);
			trace!(?id, ?deadline, "Timer fired.");
			callback();
		}
		self.now.set(target);
	}
}

impl Scheduler for ManualScheduler {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
		let id = TimerId(self.next_id.get() + 1);
		self.next_id.set(id.0);
		self.timers.borrow_mut().insert((self.now.get() + delay, id), callback);
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		self.timers.borrow_mut().retain(|&(_, existing), _| existing != id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::rc::Rc;

	#[test]
	fn fires_in_deadline_order_not_scheduling_order() {
		let scheduler = ManualScheduler::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		for (name, ms) in [("slow", 300), ("fast", 100), ("tie", 100)] {
			let log = Rc::clone(&log);
			scheduler.set_timeout(Duration::from_millis(ms), Box::new(move || log.borrow_mut().push(name)));
		}

		scheduler.advance(Duration::from_millis(99));
		assert!(log.borrow().is_empty());
		scheduler.advance(Duration::from_millis(201));
		assert_eq!(*log.borrow(), ["fast", "tie", "slow"]);
		assert_eq!(scheduler.now(), Duration::from_millis(300));
	}

	#[test]
	fn cleared_timers_never_fire() {
		let scheduler = ManualScheduler::new();
		let fired = Rc::new(Cell::new(false));
		let id = scheduler.set_timeout(Duration::from_millis(10), {
			let fired = Rc::clone(&fired);
			Box::new(move || fired.set(true))
		});
		scheduler.clear_timeout(id);
		scheduler.advance(Duration::from_secs(1));
		assert!(!fired.get());
		assert_eq!(scheduler.pending(), 0);
	}

	#[test]
	fn callbacks_may_schedule_more_timers() {
		let scheduler = Rc::new(ManualScheduler::new());
		let fired = Rc::new(Cell::new(0));
		{
			let inner = Rc::clone(&scheduler);
			let fired = Rc::clone(&fired);
			scheduler.set_timeout(
				Duration::from_millis(10),
				Box::new(move || {
					fired.set(fired.get() + 1);
					let fired = Rc::clone(&fired);
					inner.set_timeout(Duration::from_millis(10), Box::new(move || fired.set(fired.get() + 1)));
				}),
			);
		}
		scheduler.advance(Duration::from_millis(20));
		assert_eq!(fired.get(), 2);
	}
}
