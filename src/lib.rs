#![doc(html_root_url = "https://docs.rs/storefront-dom/0.0.3")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod bus;
pub mod commerce;
pub mod config;
pub mod debounce;
pub mod dismissal;
pub mod dom;
pub mod error;
pub mod event;
pub mod focus;
pub mod form;
pub mod history;
pub mod merge;
pub mod model;
pub mod overlay;
pub mod page;
pub mod panel;
pub mod region;
pub mod runtime;
pub mod selector;
pub mod storage;
pub mod sync;
pub mod vdom;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bus::EventBus;
pub use error::Failure;
pub use event::{DomainEvent, EventKind};
pub use page::{Page, Seams};
