//! The newsletter popup: shows once after a delay, never again after it's been closed.

use crate::{
	bus::Subscription,
	debounce::CommandQueue,
	dismissal::{Dismissal, DismissalKey},
	dom::{Document, DomNode},
	event::{DomainEvent, EventKind, OverlayChanged},
	overlay::{Overlay, OverlayOptions, Panel},
	page::Page,
};
use core::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

pub const OVERLAY_ID: &str = "newsletter-popup";

const SHOW_KEY: &str = "show";

struct Inner<D: Document> {
	overlay: Overlay<D>,
	dismissal: Dismissal,
	queue: CommandQueue,
	_closed: Option<Subscription>,
}

pub struct NewsletterPopup<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for NewsletterPopup<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> fmt::Debug for NewsletterPopup<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NewsletterPopup")
			.field("overlay", &self.0.overlay)
			.field("dismissal", &self.0.dismissal)
			.field("scheduled", &self.0.queue.is_pending(SHOW_KEY))
			.finish()
	}
}

impl<D: Document> NewsletterPopup<D> {
	/// Schedules the popup unless it was dismissed in an earlier visit.
	pub fn attach(page: &Page<D>, root: D::Node) -> Self {
		let key = DismissalKey::new(root.attribute("data-dismissal-id").as_deref(), &root.text_content());
		let dismissal = Dismissal::new(Rc::clone(&page.local), "newsletter", &key);
		let overlay = Overlay::new(Rc::clone(&page.document), page.bus.clone(), root, OverlayOptions::new(OVERLAY_ID));
		let queue = CommandQueue::new(Rc::clone(&page.scheduler));

		if dismissal.is_dismissed() {
			debug!(key = %dismissal.storage_key(), "Newsletter popup dismissed before.");
			return Self(Rc::new(Inner { overlay, dismissal, queue, _closed: None }));
		}

		Self(Rc::new_cyclic(|weak: &Weak<Inner<D>>| {
			let closed = page.bus.subscribe(EventKind::OverlayClosed, {
				let weak = weak.clone();
				move |event| {
					if let (Some(popup), DomainEvent::OverlayClosed(OverlayChanged { overlay_id })) = (weak.upgrade(), event) {
						if overlay_id == OVERLAY_ID {
							popup.dismissal.dismiss();
						}
					}
				}
			});
			let weak = weak.clone();
			queue.schedule(SHOW_KEY, page.config.timings.newsletter_delay(), move || {
				if let Some(popup) = weak.upgrade() {
					if !popup.dismissal.is_dismissed() {
						popup.overlay.open();
					}
				}
			});
			Inner { overlay, dismissal, queue, _closed: Some(closed) }
		}))
	}

	#[must_use]
	pub fn overlay(&self) -> &Overlay<D> {
		&self.0.overlay
	}

	#[must_use]
	pub fn dismissal(&self) -> &Dismissal {
		&self.0.dismissal
	}

	#[must_use]
	pub fn is_scheduled(&self) -> bool {
		self.0.queue.is_pending(SHOW_KEY)
	}
}

impl<D: Document> Panel for NewsletterPopup<D> {
	fn open(&self) {
		self.0.queue.cancel(SHOW_KEY);
		self.0.overlay.open();
	}

	fn close(&self) {
		self.0.queue.cancel(SHOW_KEY);
		self.0.overlay.close();
	}

	fn is_open(&self) -> bool {
		self.0.overlay.is_open()
	}
}
