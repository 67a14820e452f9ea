mod common;

use common::{json, Harness};
use serde_json::json;
use storefront_dom::{
	dom::DomNode,
	event::CartItemAdded,
	form::CartItems,
	model::Sections,
	selector::selectors,
	vdom::VDocument,
	DomainEvent, EventKind,
};

const CART: &str = r#"
	<cart-items id="main-cart-items">
		<div class="js-contents">
			<div class="cart-item" id="CartItem-1">Tee <input data-index="1" value="1"></div>
			<div id="Line-item-error-1" hidden><span class="cart-item__error-text"></span></div>
		</div>
	</cart-items>"#;

fn contents(quantity: u32) -> String {
	format!(
		r#"<cart-items><div class="js-contents"><div class="cart-item" id="CartItem-1">Tee <input data-index="1" value="{}"></div><div id="Line-item-error-1" hidden><span class="cart-item__error-text"></span></div></div></cart-items>"#,
		quantity
	)
}

fn changed(quantity: u32) -> serde_json::Value {
	json!({
		"item_count": quantity,
		"items": [{ "id": 1, "variant_id": 41, "quantity": quantity, "key": "41:abc" }],
		"sections": { "main-cart-items": contents(quantity) }
	})
}

fn cart_page() -> (Harness, CartItems<VDocument>) {
	let harness = Harness::at("https://shop.example/cart", CART, Default::default());
	let items = CartItems::attach(&harness.page, harness.node("#main-cart-items"), "main-cart-items", selectors(&[".js-contents"]));
	(harness, items)
}

fn shown_quantity(harness: &Harness) -> Option<String> {
	harness.node("input[data-index=1]").attribute("value")
}

#[test]
fn only_the_latest_change_is_applied() {
	let (harness, items) = cart_page();
	let events = harness.record(&[EventKind::CartUpdated, EventKind::CartItemRemoved]);

	items.set_quantity(1, 2);
	harness.advance(100);
	items.set_quantity(1, 3);
	harness.advance(300);
	assert_eq!(harness.transport.count(), 1, "one request per settled edit");
	items.set_quantity(1, 5);
	harness.advance(300);
	assert_eq!(harness.transport.count(), 2);

	let body: serde_json::Value = serde_json::from_str(harness.transport.request(0).body.as_deref().unwrap()).unwrap();
	assert_eq!(body["quantity"], json!(3));
	assert_eq!(body["sections"], json!(["main-cart-items", "cart-drawer", "cart-icon-bubble"]));
	assert_eq!(body["sections_url"], json!("/cart"));

	harness.transport.resolve(1, json(200, &changed(5)));
	harness.run();
	harness.transport.resolve(0, json(200, &changed(3)));
	harness.run();

	assert_eq!(shown_quantity(&harness).as_deref(), Some("5"));
	assert_eq!(events.kinds(), [EventKind::CartUpdated]);
	match &events.events()[0] {
		DomainEvent::CartUpdated(updated) => {
			assert_eq!(updated.source, items.source());
			assert_eq!(updated.cart.item_count, 5);
			assert!(updated.sections.get("main-cart-items").is_some());
		}
		other => panic!("unexpected event {:?}", other),
	}
	assert_eq!(harness.transport.count(), 2, "the bundle made a refetch unnecessary");
}

#[test]
fn capped_quantities_are_explained() {
	let (harness, items) = cart_page();
	let events = harness.record(&[EventKind::CartUpdated]);

	items.set_quantity(1, 10);
	harness.advance(300);
	harness.transport.resolve(0, json(200, &changed(7)));
	harness.run();

	assert_eq!(shown_quantity(&harness).as_deref(), Some("7"));
	let error = harness.node("#Line-item-error-1");
	assert!(!error.is_hidden());
	assert_eq!(harness.node(".cart-item__error-text").text_content(), harness.page.config.strings.quantity_error);
	assert_eq!(events.kinds(), [EventKind::CartUpdated]);
}

#[test]
fn refused_changes_show_inline_and_publish_nothing() {
	let (harness, items) = cart_page();
	let events = harness.record(&[EventKind::CartUpdated, EventKind::CartItemRemoved]);

	items.set_quantity(1, 9);
	harness.advance(300);
	assert!(harness.node("#CartItem-1").has_class("loading"));
	harness.transport.resolve(0, json(422, &json!({ "status": 422, "message": "Cart Error", "description": "You can only add 4 Tee to the cart." })));
	harness.run();

	assert!(!harness.node("#CartItem-1").has_class("loading"));
	assert!(!harness.node("#Line-item-error-1").is_hidden());
	assert_eq!(harness.node(".cart-item__error-text").text_content(), "You can only add 4 Tee to the cart.");
	assert_eq!(shown_quantity(&harness).as_deref(), Some("1"));
	assert!(events.kinds().is_empty());
}

#[test]
fn removal_skips_the_debounce() {
	let (harness, items) = cart_page();
	let events = harness.record(&[EventKind::CartUpdated, EventKind::CartItemRemoved]);

	items.set_quantity(1, 4);
	items.remove(1);
	assert!(!items.is_pending(1));
	harness.run();
	assert_eq!(harness.transport.count(), 1);

	harness.transport.resolve(
		0,
		json(200, &json!({ "item_count": 0, "items": [], "sections": { "main-cart-items": "<cart-items><div class=\"js-contents\"><p>Your cart is empty</p></div></cart-items>" } })),
	);
	harness.run();
	harness.advance(1_000);

	assert_eq!(harness.transport.count(), 1);
	assert_eq!(harness.node(".js-contents").text_content(), "Your cart is empty");
	assert_eq!(events.kinds(), [EventKind::CartItemRemoved, EventKind::CartUpdated]);
}

#[test]
fn follows_adds_from_elsewhere() {
	let (harness, _items) = cart_page();

	let sections: Sections = [("main-cart-items", contents(2))].into_iter().collect();
	harness.page.bus.publish(&DomainEvent::CartItemAdded(CartItemAdded {
		source: "product-form-main".into(),
		items: Vec::new(),
		sections,
	}));
	harness.run();

	assert_eq!(harness.transport.count(), 0);
	assert_eq!(shown_quantity(&harness).as_deref(), Some("2"));
}

#[test]
fn a_late_failure_of_a_superseded_change_stays_silent() {
	let (harness, items) = cart_page();

	items.set_quantity(1, 2);
	harness.advance(300);
	items.set_quantity(1, 3);
	harness.advance(300);
	assert_eq!(harness.transport.count(), 2);

	harness.transport.resolve(1, json(200, &changed(3)));
	harness.run();
	harness.transport.resolve(0, json(422, &json!({ "status": 422, "message": "Cart Error", "description": "You can only add 1 Tee to the cart." })));
	harness.run();

	assert_eq!(shown_quantity(&harness).as_deref(), Some("3"));
	assert!(harness.node("#Line-item-error-1").is_hidden());
	assert_eq!(harness.node(".cart-item__error-text").text_content(), "");
}
