//! Domain events: the public contract between independently attached components.

use crate::model::{CartState, LineItem, Sections, Variant};
use core::{fmt, str::FromStr};

/// The closed set of event kinds a [`crate::bus::EventBus`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
	CartUpdated,
	CartItemAdded,
	CartItemRemoved,
	VariantChanged,
	OverlayOpened,
	OverlayClosed,
}

impl EventKind {
	pub const ALL: [EventKind; 6] = [
		EventKind::CartUpdated,
		EventKind::CartItemAdded,
		EventKind::CartItemRemoved,
		EventKind::VariantChanged,
		EventKind::OverlayOpened,
		EventKind::OverlayClosed,
	];

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			EventKind::CartUpdated => "cart.updated",
			EventKind::CartItemAdded => "cart.item-added",
			EventKind::CartItemRemoved => "cart.item-removed",
			EventKind::VariantChanged => "variant.changed",
			EventKind::OverlayOpened => "overlay.opened",
			EventKind::OverlayClosed => "overlay.closed",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
	type Err = UnknownEventKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventKind::ALL.into_iter().find(|kind| kind.as_str() == s).ok_or_else(|| UnknownEventKind(s.to_owned()))
	}
}

/// The cart changed server-side. `sections` holds whatever bundled fragments the emitter opted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpdated {
	/// Id of the emitting component, so it can skip its own echo.
	pub source: String,
	pub cart: CartState,
	pub sections: Sections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemAdded {
	pub source: String,
	pub items: Vec<LineItem>,
	pub sections: Sections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemRemoved {
	pub source: String,
	/// 1-based line index the removal was requested for.
	pub line: u32,
	pub cart: CartState,
	pub sections: Sections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantChanged {
	pub source: String,
	pub section_id: String,
	/// [`None`] if the selected option combination doesn't exist.
	pub variant: Option<Variant>,
	/// The freshly rendered section, if the emitter already fetched it.
	pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayChanged {
	pub overlay_id: String,
}

/// An immutable, published state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
	CartUpdated(CartUpdated),
	CartItemAdded(CartItemAdded),
	CartItemRemoved(CartItemRemoved),
	VariantChanged(VariantChanged),
	OverlayOpened(OverlayChanged),
	OverlayClosed(OverlayChanged),
}

impl DomainEvent {
	#[must_use]
	pub fn kind(&self) -> EventKind {
		match self {
			DomainEvent::CartUpdated(_) => EventKind::CartUpdated,
			DomainEvent::CartItemAdded(_) => EventKind::CartItemAdded,
			DomainEvent::CartItemRemoved(_) => EventKind::CartItemRemoved,
			DomainEvent::VariantChanged(_) => EventKind::VariantChanged,
			DomainEvent::OverlayOpened(_) => EventKind::OverlayOpened,
			DomainEvent::OverlayClosed(_) => EventKind::OverlayClosed,
		}
	}

	/// Bundled fragments carried by cart events.
	#[must_use]
	pub fn sections(&self) -> Option<&Sections> {
		match self {
			DomainEvent::CartUpdated(CartUpdated { sections, .. })
			| DomainEvent::CartItemAdded(CartItemAdded { sections, .. })
			| DomainEvent::CartItemRemoved(CartItemRemoved { sections, .. }) => Some(sections),
			DomainEvent::VariantChanged(_) | DomainEvent::OverlayOpened(_) | DomainEvent::OverlayClosed(_) => None,
		}
	}

	#[must_use]
	pub fn source(&self) -> Option<&str> {
		match self {
			DomainEvent::CartUpdated(CartUpdated { source, .. })
			| DomainEvent::CartItemAdded(CartItemAdded { source, .. })
			| DomainEvent::CartItemRemoved(CartItemRemoved { source, .. })
			| DomainEvent::VariantChanged(VariantChanged { source, .. }) => Some(source),
			DomainEvent::OverlayOpened(_) | DomainEvent::OverlayClosed(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_names_round_trip() {
		for kind in EventKind::ALL {
			assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
		}
		assert_eq!("cart.emptied".parse::<EventKind>(), Err(UnknownEventKind("cart.emptied".into())));
	}

	#[test]
	fn overlay_events_carry_no_sections() {
		let event = DomainEvent::OverlayOpened(OverlayChanged { overlay_id: "menu-drawer".into() });
		assert_eq!(event.kind(), EventKind::OverlayOpened);
		assert!(event.sections().is_none());
		assert!(event.source().is_none());
	}
}
