//! [`Spawner`] and [`Scheduler`] on the browser's event loop.

use crate::runtime::{Scheduler, Spawner, TimerId};
use core::{cell::Cell, cell::RefCell, fmt, time::Duration};
use futures::future::LocalBoxFuture;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::Window;

/// Runs futures via [`wasm_bindgen_futures::spawn_local`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSpawner;

impl Spawner for WebSpawner {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		wasm_bindgen_futures::spawn_local(future);
	}
}

struct Inner {
	window: Window,
	next_id: Cell<u64>,
	/// Pending timers: the browser's handle and the closure it calls, which has to stay alive until then.
	active: RefCell<HashMap<TimerId, (i32, Closure<dyn FnMut()>)>>,
}

/// `setTimeout`/`clearTimeout`.
#[derive(Clone)]
pub struct WebTimers(Rc<Inner>);

impl fmt::Debug for WebTimers {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebTimers").field("active", &self.0.active.borrow().len()).finish_non_exhaustive()
	}
}

impl WebTimers {
	#[must_use]
	pub fn new(window: Window) -> Self {
		Self(Rc::new(Inner {
			window,
			next_id: Cell::new(0),
			active: RefCell::default(),
		}))
	}
}

impl Scheduler for WebTimers {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
		let id = TimerId(self.0.next_id.get() + 1);
		self.0.next_id.set(id.0);

		let weak = Rc::downgrade(&self.0);
		let mut callback = Some(callback);
		let closure = Closure::wrap(Box::new(move || {
			if let Some(inner) = weak.upgrade() {
				if let Some(entry) = inner.active.borrow_mut().remove(&id) {
					// This closure is still running.
					wasm_bindgen_futures::spawn_local(async move {
						drop(entry);
					});
				}
			}
			if let Some(callback) = callback.take() {
				callback();
			}
		}) as Box<dyn FnMut()>);

		let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
		match self.0.window.set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis) {
			Ok(handle) => {
				trace!(?id, millis, "Timer set.");
				self.0.active.borrow_mut().insert(id, (handle, closure));
			}
			Err(error) => error!("`setTimeout` failed: {:?}", error),
		}
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		let removed = self.0.active.borrow_mut().remove(&id);
		if let Some((handle, closure)) = removed {
			self.0.window.clear_timeout_with_handle(handle);
			drop(closure);
			trace!(?id, "Timer cleared.");
		}
	}
}
