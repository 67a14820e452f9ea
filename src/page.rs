//! Page-lifetime singletons.

use crate::{
	bus::EventBus,
	commerce::CartApi,
	config::{Config, Routes},
	dom::Document,
	error::ConfigError,
	history::{History, Navigator},
	runtime::{Scheduler, Spawner},
	storage::KeyValueStore,
	sync::{FragmentClient, Transport},
};
use core::fmt;
use futures::Future;
use std::rc::Rc;
use url::Url;

/// The environment a [`Page`] runs in.
pub struct Seams<D> {
	pub document: Rc<D>,
	pub transport: Rc<dyn Transport>,
	pub spawner: Rc<dyn Spawner>,
	pub scheduler: Rc<dyn Scheduler>,
	pub history: Rc<dyn History>,
	pub navigator: Rc<dyn Navigator>,
	pub session: Rc<dyn KeyValueStore>,
	pub local: Rc<dyn KeyValueStore>,
}

/// Everything components share for the lifetime of the page. Constructed once and handed to each component.
///
/// Cloning is cheap and yields handles to the same singletons.
pub struct Page<D: Document> {
	pub document: Rc<D>,
	pub bus: EventBus,
	pub fragments: FragmentClient,
	pub cart: CartApi,
	pub spawner: Rc<dyn Spawner>,
	pub scheduler: Rc<dyn Scheduler>,
	pub history: Rc<dyn History>,
	pub navigator: Rc<dyn Navigator>,
	pub session: Rc<dyn KeyValueStore>,
	pub local: Rc<dyn KeyValueStore>,
	pub config: Rc<Config>,
}

impl<D: Document> Clone for Page<D> {
	fn clone(&self) -> Self {
		Self {
			document: Rc::clone(&self.document),
			bus: self.bus.clone(),
			fragments: self.fragments.clone(),
			cart: self.cart.clone(),
			spawner: Rc::clone(&self.spawner),
			scheduler: Rc::clone(&self.scheduler),
			history: Rc::clone(&self.history),
			navigator: Rc::clone(&self.navigator),
			session: Rc::clone(&self.session),
			local: Rc::clone(&self.local),
			config: Rc::clone(&self.config),
		}
	}
}

impl<D: Document> fmt::Debug for Page<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Page").field("bus", &self.bus).field("cart", &self.cart).field("config", &self.config).finish_non_exhaustive()
	}
}

impl<D: Document> Page<D> {
	/// Resolves the configured routes against the current URL.
	///
	/// # Errors
	///
	/// Iff a route isn't a valid URL reference.
	pub fn new(seams: Seams<D>, config: Config) -> Result<Self, ConfigError> {
		let Seams { document, transport, spawner, scheduler, history, navigator, session, local } = seams;
		let cart = CartApi::new(Rc::clone(&transport), &history.current(), &config.routes)?;
		Ok(Self {
			document,
			bus: EventBus::new(),
			fragments: FragmentClient::new(transport),
			cart,
			spawner,
			scheduler,
			history,
			navigator,
			session,
			local,
			config: Rc::new(config),
		})
	}

	pub fn spawn(&self, future: impl 'static + Future<Output = ()>) {
		self.spawner.spawn(Box::pin(future));
	}

	/// `route` resolved against the current URL.
	///
	/// # Errors
	///
	/// Iff `route` isn't a valid URL reference.
	pub fn resolve(&self, route: &str) -> Result<Url, ConfigError> {
		Routes::resolve(&self.history.current(), route)
	}

	/// The cart page, which renders every cart section.
	///
	/// # Errors
	///
	/// Iff the configured route isn't a valid URL reference.
	pub fn cart_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.config.routes.cart_url)
	}

	/// Path and query of the current page, the context bundled sections are rendered in.
	#[must_use]
	pub fn sections_url(&self) -> String {
		let current = self.history.current();
		match current.query() {
			Some(query) => format!("{}?{}", current.path(), query),
			None => current.path().to_owned(),
		}
	}
}
