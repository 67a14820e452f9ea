mod common;

use common::Harness;
use storefront_dom::{
	form::CartItems,
	overlay::Panel,
	panel::{CartDrawer, CartIcon, MenuDrawer, NewsletterPopup},
	selector::selectors,
	EventBus, EventKind,
};

const PAGE: &str = r#"
	<header id="header"><a id="cart-icon-bubble" href="/cart">0</a></header>
	<menu-drawer id="menu"><a href="/pages/about">About</a></menu-drawer>
	<cart-drawer id="CartDrawer">
		<button class="drawer__close">Close</button>
		<div class="drawer__contents"><div class="cart-item" id="CartItem-1">Tee <input data-index="1" value="1"></div></div>
		<div class="drawer__footer"><a href="/checkout">Check out</a></div>
	</cart-drawer>
	<div id="newsletter-popup" data-dismissal-id="teardown"><p>Join our list</p><button>Close</button></div>"#;

fn handler_counts(bus: &EventBus) -> Vec<usize> {
	EventKind::ALL.into_iter().map(|kind| bus.handler_count(kind)).collect()
}

#[test]
fn dropped_components_leave_nothing_behind() {
	let harness = Harness::new(PAGE);
	let bus = &harness.page.bus;
	let baseline = handler_counts(bus);

	let drawer = CartDrawer::attach(&harness.page, harness.node("#CartDrawer"));
	let icon = CartIcon::attach(&harness.page, harness.node("#header"));
	let items = CartItems::attach(&harness.page, harness.node("#CartDrawer"), "cart-drawer", selectors(&[".drawer__contents"]));
	let menu = MenuDrawer::attach(&harness.page, harness.node("#menu"));
	let popup = NewsletterPopup::attach(&harness.page, harness.node("#newsletter-popup"));
	assert_ne!(handler_counts(bus), baseline);
	assert!(popup.is_scheduled());

	drawer.open();
	menu.open();
	items.set_quantity(1, 2);
	harness.run();
	assert!(harness.document.key_listener_count() > 0);
	assert!(harness.scheduler.pending() > 0);

	drop((drawer, icon, items, menu, popup));

	assert_eq!(handler_counts(bus), baseline);
	assert_eq!(harness.document.key_listener_count(), 0);
	assert_eq!(harness.scheduler.pending(), 0, "debounced commits and the delayed popup are cancelled");
	harness.advance(10_000);
	assert_eq!(harness.transport.count(), 0);
}
