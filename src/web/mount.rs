//! Wires the standard components onto theme markup.
//!
//! Listeners are delegated at each component's root (or the document, for open/close triggers), so they survive
//! section merges that replace the elements inside.
//!
//! Trigger markup:
//!
//! - `[data-open="…"]`, `[data-close="…"]`, `[data-toggle="…"]` name an overlay id (`cart-drawer`, `menu-drawer`,
//!   `facet-filters`, `predictive-search`, `newsletter-popup`).
//! - `[data-submenu]` inside the menu drawer opens the submenu whose id it names.
//! - `[data-dismiss]` inside an announcement bar dismisses it.
//! - Cart quantity fields and remove buttons carry the 1-based line in `data-index`.

use super::{
	dom::WebDocument,
	env::{WebHistory, WebNavigator, WebStorage},
	net::FetchTransport,
	timers::{WebSpawner, WebTimers},
};
use crate::{
	config::{Config, CONFIG_ELEMENT_ID},
	dismissal::DismissibleBanner,
	dom::DomNode,
	error::ConfigError,
	form::{CartItems, ProductForm, QuantityInput, QuickAdd, VariantPicker},
	overlay::Panel,
	page::{Page, Seams},
	panel::{cart_icon, facets::form_query, CartDrawer, CartIcon, FacetFilters, MenuDrawer, NewsletterPopup, PredictiveSearch},
	selector::{selector, selectors, Selector},
};
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Element, Event, EventInit, EventTarget};

#[derive(Debug, Error)]
pub enum MountError {
	#[error("no `window`")]
	NoWindow,
	#[error("no `document`")]
	NoDocument,
	#[error("JavaScript error: {0}")]
	Js(String),
	#[error("unparsable page URL: {0}")]
	Url(#[from] url::ParseError),
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// A DOM event listener that's removed when dropped.
struct Listener {
	target: EventTarget,
	kind: &'static str,
	closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
	fn new(target: &EventTarget, kind: &'static str, handler: impl 'static + FnMut(Event)) -> Self {
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
		if let Err(error) = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref()) {
			error!("Failed to add {} listener: {:?}", kind, error);
		}
		Self { target: target.clone(), kind, closure }
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		if let Err(error) = self.target.remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {} listener: {:?}", self.kind, error);
		}
	}
}

/// The mounted components. Dropping this detaches them.
pub struct Storefront {
	page: Page<WebDocument>,
	panels: HashMap<String, Rc<dyn Panel>>,
	cart_icon: Option<CartIcon<WebDocument>>,
	forms: Vec<ProductForm<WebDocument>>,
	quick_adds: Vec<QuickAdd<WebDocument>>,
	pickers: Vec<VariantPicker<WebDocument>>,
	cart_items: Vec<CartItems<WebDocument>>,
	banners: Vec<Rc<DismissibleBanner<Element>>>,
	listeners: Vec<Listener>,
}

impl fmt::Debug for Storefront {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Storefront")
			.field("page", &self.page)
			.field("panels", &self.panels.keys().collect::<Vec<_>>())
			.field("cart_icon", &self.cart_icon.is_some())
			.field("forms", &self.forms.len())
			.field("quick_adds", &self.quick_adds.len())
			.field("pickers", &self.pickers.len())
			.field("cart_items", &self.cart_items.len())
			.field("banners", &self.banners.len())
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

impl Storefront {
	#[must_use]
	pub fn page(&self) -> &Page<WebDocument> {
		&self.page
	}

	#[must_use]
	pub fn panel(&self, id: &str) -> Option<&Rc<dyn Panel>> {
		self.panels.get(id)
	}

	/// Keeps everything mounted for the rest of the page's lifetime.
	pub fn leak(self) {
		core::mem::forget(self);
	}
}

fn closest(event: &Event, selector: &str) -> Option<Element> {
	event.target()?.dyn_into::<Element>().ok()?.closest(selector).ok().flatten()
}

fn all(root: &Element, tag: &str) -> Vec<Element> {
	root.query_all(&selector(tag))
}

/// Reads the configuration from `#storefront-config`, or uses the defaults if there is none.
///
/// # Errors
///
/// Iff the configuration element holds invalid JSON.
pub fn read_config(document: &web_sys::Document) -> Result<Config, ConfigError> {
	match document.get_element_by_id(CONFIG_ELEMENT_ID).map(|element| element.text_content()) {
		Some(json) => Config::from_json(&json),
		None => {
			debug!("No configuration element; using defaults.");
			Ok(Config::default())
		}
	}
}

/// Attaches every component found in the current document.
///
/// # Errors
///
/// Iff there's no browser environment, or the configuration or page URL is invalid.
#[allow(clippy::too_many_lines)]
pub fn mount() -> Result<Storefront, MountError> {
	let window = web_sys::window().ok_or(MountError::NoWindow)?;
	let document = window.document().ok_or(MountError::NoDocument)?;
	let body: Element = document.body().ok_or(MountError::NoDocument)?.into();
	let config = read_config(&document)?;

	let page = Page::new(
		Seams {
			document: Rc::new(WebDocument::new(document.clone()).map_err(|error| MountError::Js(format!("{:?}", error)))?),
			transport: Rc::new(FetchTransport::new(window.clone())),
			spawner: Rc::new(WebSpawner),
			scheduler: Rc::new(WebTimers::new(window.clone())),
			history: Rc::new(WebHistory::new(window.clone())?),
			navigator: Rc::new(WebNavigator::new(window.clone())),
			session: Rc::new(WebStorage::session(&window)),
			local: Rc::new(WebStorage::local(&window)),
		},
		config,
	)?;

	let mut storefront = Storefront {
		page: page.clone(),
		panels: HashMap::new(),
		cart_icon: None,
		forms: Vec::new(),
		quick_adds: Vec::new(),
		pickers: Vec::new(),
		cart_items: Vec::new(),
		banners: Vec::new(),
		listeners: Vec::new(),
	};
	let listeners = &mut storefront.listeners;
	let panels = &mut storefront.panels;

	if let Some(root) = all(&body, "cart-drawer").into_iter().next() {
		let drawer = CartDrawer::attach(&page, root);
		panels.insert(drawer.overlay().id().to_owned(), Rc::new(drawer));
	}
	if body.query(&Selector::id(cart_icon::SECTION_ID)).is_some() {
		storefront.cart_icon = Some(CartIcon::attach(&page, body.clone()));
	}

	if let Some(root) = all(&body, "menu-drawer").into_iter().next() {
		let drawer = MenuDrawer::attach(&page, root.clone());
		let target: &EventTarget = root.as_ref();
		listeners.push(Listener::new(target, "click", {
			let drawer = drawer.clone();
			let document = document.clone();
			move |event| {
				if let Some(trigger) = closest(&event, "[data-submenu]") {
					let submenu = trigger.get_attribute("data-submenu").and_then(|id| document.get_element_by_id(&id));
					if let Some(submenu) = submenu {
						event.prevent_default();
						drawer.open_submenu(submenu, trigger);
					}
				} else if closest(&event, "[data-submenu-close]").is_some() {
					drawer.close_submenu();
				}
			}
		}));
		panels.insert(drawer.overlay().id().to_owned(), Rc::new(drawer));
	}

	if let Some(root) = all(&body, "predictive-search").into_iter().next() {
		let results = root.query(&selector("[data-predictive-search]")).unwrap_or_else(|| root.clone());
		let search = PredictiveSearch::attach(&page, root.clone(), results);
		let target: &EventTarget = root.as_ref();
		listeners.push(Listener::new(target, "input", {
			let search = search.clone();
			move |event| {
				if let Some(input) = closest(&event, "input[type=search]") {
					search.input(&input.value().unwrap_or_default());
				}
			}
		}));
		panels.insert(search.overlay().id().to_owned(), Rc::new(search));
	}

	if let Some(root) = all(&body, "facet-filters-form").into_iter().next() {
		match root.get_attribute("data-section-id") {
			Some(section_id) => {
				let facets = FacetFilters::attach(&page, root.clone(), body.clone(), &section_id);
				let target: &EventTarget = root.as_ref();
				listeners.push(Listener::new(target, "change", {
					let facets = facets.clone();
					move |event| match closest(&event, "[name=sort_by]") {
						Some(sort) => facets.change_sort(&sort.value().unwrap_or_default()),
						None => {
							if let Some(form) = closest(&event, "form") {
								facets.submit_filters(form_query(&form));
							}
						}
					}
				}));
				let target: &EventTarget = body.as_ref();
				listeners.push(Listener::new(target, "click", {
					let facets = facets.clone();
					move |event| {
						if let Some(pill) = closest(&event, "[data-facet-remove]") {
							event.prevent_default();
							if let Err(error) = facets.remove_filter(&pill.get_attribute("href").unwrap_or_default()) {
								warn!(%error, "Invalid filter removal link.");
							}
						}
					}
				}));
				let target: &EventTarget = window.as_ref();
				listeners.push(Listener::new(target, "popstate", {
					let facets = facets.clone();
					let history = Rc::clone(&page.history);
					move |_| facets.restore(history.current())
				}));
				panels.insert(facets.overlay().id().to_owned(), Rc::new(facets));
			}
			None => warn!("`facet-filters-form` without `data-section-id`; not attaching."),
		}
	}

	if let Some(root) = all(&body, "newsletter-popup").into_iter().next() {
		let popup = NewsletterPopup::attach(&page, root);
		panels.insert(popup.overlay().id().to_owned(), Rc::new(popup));
	}

	for root in all(&body, "product-form") {
		let quick = root.has_attribute("data-quick-add");
		let target: &EventTarget = root.as_ref();
		if quick {
			let quick_add = QuickAdd::attach(&page, root.clone());
			listeners.push(Listener::new(target, "submit", {
				let quick_add = quick_add.clone();
				move |event| {
					event.prevent_default();
					quick_add.submit();
				}
			}));
			storefront.quick_adds.push(quick_add);
		} else {
			let form = ProductForm::attach(&page, root.clone());
			listeners.push(Listener::new(target, "submit", {
				let form = form.clone();
				move |event| {
					event.prevent_default();
					form.submit();
				}
			}));
			storefront.forms.push(form);
		}
	}

	for root in all(&body, "variant-selects") {
		let Some(section_id) = root.get_attribute("data-section") else {
			warn!("`variant-selects` without `data-section`; not attaching.");
			continue;
		};
		match VariantPicker::attach(&page, root.clone(), body.clone(), &section_id) {
			Ok(picker) => {
				let target: &EventTarget = root.as_ref();
				listeners.push(Listener::new(target, "change", {
					let picker = picker.clone();
					move |_| picker.change()
				}));
				storefront.pickers.push(picker);
			}
			Err(failure) => warn!(%failure, "Variant picker not attached."),
		}
	}

	for root in all(&body, "cart-items") {
		let section_id = root.get_attribute("data-id").unwrap_or_else(|| "main-cart-items".to_owned());
		let items = CartItems::attach(&page, root.clone(), &section_id, selectors(&[".js-contents"]));
		let target: &EventTarget = root.as_ref();
		listeners.push(Listener::new(target, "change", {
			let items = items.clone();
			move |event| {
				if let Some(input) = closest(&event, "input[data-index]") {
					let line = input.get_attribute("data-index").and_then(|index| index.parse().ok());
					let quantity = QuantityInput::attach(input.parent_element().unwrap_or_else(|| input.clone())).map(|control| control.commit());
					if let (Some(line), Some(quantity)) = (line, quantity) {
						items.set_quantity(line, quantity);
					}
				}
			}
		}));
		listeners.push(Listener::new(target, "click", {
			let items = items.clone();
			move |event| {
				if let Some(remove) = closest(&event, "[data-remove][data-index]") {
					event.prevent_default();
					if let Some(line) = remove.get_attribute("data-index").and_then(|index| index.parse().ok()) {
						items.remove(line);
					}
				}
			}
		}));
		storefront.cart_items.push(items);
	}

	// Quantity buttons everywhere. Cart lines pick the new value up through the `change` this dispatches.
	let target: &EventTarget = body.as_ref();
	listeners.push(Listener::new(target, "click", move |event| {
		let Some(button) = closest(&event, "quantity-input button[name]") else { return };
		let Some(control) = button.closest("quantity-input").ok().flatten().and_then(QuantityInput::attach) else { return };
		event.prevent_default();
		match button.get_attribute("name").as_deref() {
			Some("plus") => control.increment(),
			Some("minus") => control.decrement(),
			_ => return,
		};
		let init = EventInit::new();
		init.set_bubbles(true);
		match Event::new_with_event_init_dict("change", &init) {
			Ok(change) => {
				if let Err(error) = control.input().dispatch_event(&change) {
					error!("Failed to dispatch change: {:?}", error);
				}
			}
			Err(error) => error!("Failed to create change event: {:?}", error),
		}
	}));

	for root in all(&body, "announcement-bar") {
		let banner = Rc::new(DismissibleBanner::attach(root.clone(), Rc::clone(&page.session)));
		let target: &EventTarget = root.as_ref();
		listeners.push(Listener::new(target, "click", {
			let banner = Rc::clone(&banner);
			move |event| {
				if closest(&event, "[data-dismiss]").is_some() {
					banner.dismiss();
				}
			}
		}));
		storefront.banners.push(banner);
	}

	// Open/close/toggle triggers, wherever they are.
	let triggers = panels.clone();
	let target: &EventTarget = document.as_ref();
	listeners.push(Listener::new(target, "click", move |event| {
		let actions: [(&str, fn(&dyn Panel)); 3] = [("data-open", |panel| panel.open()), ("data-close", |panel| panel.close()), ("data-toggle", |panel| panel.toggle())];
		for (attribute, action) in actions {
			let Some(trigger) = closest(&event, &format!("[{}]", attribute)) else { continue };
			match trigger.get_attribute(attribute).and_then(|id| triggers.get(&id)) {
				Some(panel) => {
					event.prevent_default();
					action(&**panel);
				}
				None => debug!(attribute, "Trigger for an overlay that isn't mounted."),
			}
			return;
		}
	}));

	info!(panels = storefront.panels.len(), forms = storefront.forms.len() + storefront.quick_adds.len(), "Storefront mounted.");
	Ok(storefront)
}
