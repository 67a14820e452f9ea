//! Browser implementations of every seam, and [`mount`] to attach the standard components to a themed page.

mod dom;
mod env;
mod mount;
mod net;
mod timers;

pub use dom::WebDocument;
pub use env::{WebHistory, WebNavigator, WebStorage};
pub use mount::{mount, read_config, MountError, Storefront};
pub use net::FetchTransport;
pub use timers::{WebSpawner, WebTimers};
