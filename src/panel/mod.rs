//! Overlay panels and the header widgets that follow the cart.
//!
//! Each panel composes an [`Overlay`](crate::overlay::Overlay) with whatever sync and debouncing it needs.

pub mod cart_drawer;
pub mod cart_icon;
pub mod facets;
pub mod menu_drawer;
pub mod newsletter;
pub mod search;

pub use cart_drawer::CartDrawer;
pub use cart_icon::CartIcon;
pub use facets::FacetFilters;
pub use menu_drawer::MenuDrawer;
pub use newsletter::NewsletterPopup;
pub use search::PredictiveSearch;
