#![cfg(target_arch = "wasm32")]

use storefront_dom::{overlay::Panel, web::mount};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

fn body() -> HtmlBodyElement {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
	window().unwrap().document().unwrap().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap()
}

fn click(id: &str) {
	let document = window().unwrap().document().unwrap();
	document.get_element_by_id(id).unwrap().dyn_into::<HtmlElement>().unwrap().click();
}

#[wasm_bindgen_test]
fn triggers_open_and_close_mounted_overlays() {
	let body = body();
	body.set_inner_html(
		r#"<script type="application/json" id="storefront-config">{"timings": {"newsletter_delay_ms": 60000}}</script>
		<button id="open-cart" data-open="cart-drawer">Cart</button>
		<cart-drawer id="CartDrawer">
			<button id="close-cart" data-close="cart-drawer">Close</button>
			<div class="drawer__contents"></div>
		</cart-drawer>"#,
	);

	let storefront = mount().unwrap();
	let drawer = storefront.panel("cart-drawer").unwrap();
	assert!(!drawer.is_open());

	click("open-cart");
	assert!(drawer.is_open());
	let root = window().unwrap().document().unwrap().get_element_by_id("CartDrawer").unwrap();
	assert!(root.class_list().contains("active"));
	assert!(body.class_list().contains("overflow-hidden"));

	click("close-cart");
	assert!(!drawer.is_open());
	assert!(!root.class_list().contains("active"));

	drop(storefront);
	click("open-cart");
	assert!(!root.class_list().contains("active"), "listeners go away with the storefront");
}

#[wasm_bindgen_test]
fn dismissed_announcements_stay_hidden() {
	let body = body();
	window().unwrap().local_storage().unwrap().unwrap().clear().unwrap();
	body.set_inner_html(
		r#"<announcement-bar data-dismissal-id="web-test"><p>Free shipping</p><button id="dismiss" data-dismiss>×</button></announcement-bar>"#,
	);

	let storefront = mount().unwrap();
	click("dismiss");
	let bar = window().unwrap().document().unwrap().query_selector("announcement-bar").unwrap().unwrap();
	assert!(bar.has_attribute("hidden"));
	drop(storefront);

	body.set_inner_html(r#"<announcement-bar data-dismissal-id="web-test"><p>Free shipping</p></announcement-bar>"#);
	let _storefront = mount().unwrap();
	let bar = window().unwrap().document().unwrap().query_selector("announcement-bar").unwrap().unwrap();
	assert!(bar.has_attribute("hidden"));
}
