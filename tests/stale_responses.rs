mod common;

use common::{html, json, Harness};
use serde_json::json;
use storefront_dom::{
	dom::DomNode,
	form::VariantPicker,
	history::History,
	overlay::Panel,
	panel::{facets::form_query, FacetFilters, PredictiveSearch},
	selector::selector,
	sync::Response,
	DomainEvent, EventKind,
};

const SEARCH: &str = r#"
	<predictive-search id="search">
		<input type="search" name="q">
		<div id="predictive-search-results"></div>
	</predictive-search>"#;

fn suggestions(title: &str) -> serde_json::Value {
	json!({ "resources": { "results": { "products": [{ "title": title, "url": "/products/tee" }] } } })
}

#[test]
fn search_shows_only_the_latest_query() {
	let harness = Harness::new(SEARCH);
	let search = PredictiveSearch::attach(&harness.page, harness.node("#search"), harness.node("#predictive-search-results"));

	search.input("t");
	search.input("te");
	harness.advance(100);
	search.input(" tee ");
	harness.advance(299);
	assert_eq!(harness.transport.count(), 0, "keystrokes are debounced");
	harness.advance(1);
	assert_eq!(harness.transport.count(), 1);
	let first = harness.transport.request(0);
	assert_eq!(first.url.path(), "/search/suggest.json");
	assert!(first.url.query_pairs().any(|(key, value)| key == "q" && value == "tee"));
	assert!(first.url.query_pairs().any(|(key, value)| key == "resources[limit]" && value == "4"));
	assert!(harness.node("#search").has_class("loading"));

	search.input("tees");
	harness.advance(300);
	assert_eq!(harness.transport.count(), 2);

	harness.transport.resolve(1, json(200, &suggestions("Tee shirts")));
	harness.run();
	assert!(search.is_open());
	assert!(!harness.node("#search").has_class("loading"));
	assert!(harness.node("#predictive-search-results").text_content().contains("Tee shirts"));

	// The first answer arrives last and is dropped.
	harness.transport.resolve(0, json(200, &suggestions("Old tee")));
	harness.run();
	assert!(!harness.node("#predictive-search-results").text_content().contains("Old tee"));
}

#[test]
fn short_queries_clear_and_repeats_come_from_the_cache() {
	let harness = Harness::new(SEARCH);
	let search = PredictiveSearch::attach(&harness.page, harness.node("#search"), harness.node("#predictive-search-results"));

	search.input("tee");
	harness.advance(300);
	harness.transport.resolve(0, json(200, &suggestions("Tee")));
	harness.run();
	assert!(search.is_open());

	search.input("t");
	assert!(!search.is_open());
	assert_eq!(harness.node("#predictive-search-results").text_content(), "");

	search.input("tee");
	assert!(search.is_open(), "cached results show without waiting");
	harness.advance(1_000);
	assert_eq!(harness.transport.count(), 1);
	assert!(harness.node("#predictive-search-results").text_content().contains("Tee"));
}

#[test]
fn a_response_for_a_cleared_query_is_dropped() {
	let harness = Harness::new(SEARCH);
	let search = PredictiveSearch::attach(&harness.page, harness.node("#search"), harness.node("#predictive-search-results"));

	search.input("tee");
	harness.advance(300);
	search.input("");
	harness.transport.resolve(0, json(200, &suggestions("Tee")));
	harness.run();

	assert!(!search.is_open());
	assert_eq!(harness.node("#predictive-search-results").text_content(), "");
}

const PRODUCT: &str = r#"
	<section id="shopify-section-main">
		<variant-selects id="variant-selects-main" data-url="/products/tee">
			<select name="Size"><option value="S" selected>S</option><option value="M">M</option></select>
			<fieldset>
				<input type="radio" name="Color" value="Red" checked>
				<input type="radio" name="Color" value="Blue">
			</fieldset>
			<script type="application/json">[
				{"id": 1, "options": ["S", "Red"], "available": true},
				{"id": 2, "options": ["M", "Red"], "available": true},
				{"id": 3, "options": ["M", "Blue"], "available": false}
			]</script>
		</variant-selects>
		<div id="price-main">€10</div>
		<form><input type="hidden" name="id" value="1"><button type="submit" name="add" id="ProductSubmitButton-main">Add to cart</button></form>
	</section>"#;

fn pick(harness: &Harness, size: &str, color: &str) {
	harness.node("select[name=Size]").set_value(size);
	for radio in harness.node("fieldset").query_all(&selector("input[name=Color]")) {
		if radio.attribute("value").as_deref() == Some(color) {
			radio.set_attribute("checked", "");
		} else {
			radio.remove_attribute("checked");
		}
	}
}

#[test]
fn variant_changes_apply_the_latest_section() {
	let harness = Harness::at("https://shop.example/products/tee", PRODUCT, Default::default());
	let events = harness.record(&[EventKind::VariantChanged]);
	let picker = VariantPicker::attach(&harness.page, harness.node("variant-selects"), harness.node("#shopify-section-main"), "main").unwrap();
	assert_eq!(picker.current().map(|variant| variant.id), Some(1));

	pick(&harness, "M", "Red");
	picker.change();
	harness.run();
	assert_eq!(harness.node("input[name=id]").attribute("value").as_deref(), Some("2"));

	pick(&harness, "M", "Blue");
	picker.change();
	harness.run();
	assert_eq!(harness.transport.count(), 2);
	let latest = harness.transport.request(1);
	assert_eq!(latest.url.path(), "/products/tee");
	assert!(latest.url.query_pairs().any(|(key, value)| key == "variant" && value == "3"));
	assert!(latest.url.query_pairs().any(|(key, value)| key == "section_id" && value == "main"));

	// Unavailable right away, before the server answers.
	let button = harness.node("button[name=add]");
	assert!(button.attribute("disabled").is_some());
	assert_eq!(button.text_content(), harness.page.config.strings.unavailable);
	assert_eq!(harness.history.current().as_str(), "https://shop.example/products/tee?variant=3");

	harness.transport.resolve(1, html(r#"<section><div id="price-main">€30</div><button id="ProductSubmitButton-main">Sold out</button></section>"#));
	harness.run();
	harness.transport.resolve(0, html(r#"<section><div id="price-main">€20</div><button id="ProductSubmitButton-main">Add to cart</button></section>"#));
	harness.run();

	assert_eq!(harness.node("#price-main").text_content(), "€30");
	let events = events.events();
	assert_eq!(events.len(), 1);
	match &events[0] {
		DomainEvent::VariantChanged(changed) => {
			assert_eq!(changed.variant.as_ref().map(|variant| variant.id), Some(3));
			assert_eq!(changed.section_id, "main");
			assert_eq!(changed.source, "variant-selects-main");
			assert!(changed.html.as_deref().unwrap().contains("€30"));
		}
		other => panic!("unexpected event {:?}", other),
	}
}

#[test]
fn missing_combinations_disable_the_form() {
	let harness = Harness::at("https://shop.example/products/tee", PRODUCT, Default::default());
	let events = harness.record(&[EventKind::VariantChanged]);
	let picker = VariantPicker::attach(&harness.page, harness.node("variant-selects"), harness.node("#shopify-section-main"), "main").unwrap();

	pick(&harness, "M", "Red");
	picker.change();
	harness.run();
	pick(&harness, "S", "Blue");
	picker.change();
	harness.run();

	assert!(picker.current().is_none());
	assert!(harness.node("button[name=add]").attribute("disabled").is_some());
	assert_eq!(events.kinds(), [EventKind::VariantChanged]);
	assert!(matches!(&events.events()[0], DomainEvent::VariantChanged(changed) if changed.variant.is_none()));

	// The earlier selection's response no longer applies.
	harness.transport.resolve(0, html(r#"<div id="price-main">€20</div>"#));
	harness.run();
	assert_eq!(harness.node("#price-main").text_content(), "€10");
	assert_eq!(events.events().len(), 1);

	pick(&harness, "S", "Red");
	picker.change();
	assert!(harness.node("button[name=add]").attribute("disabled").is_none());
	assert_eq!(harness.node("button[name=add]").text_content(), "Add to cart");
}

const COLLECTION: &str = r#"
	<div id="FacetFiltersDrawer">
		<form id="FacetFiltersForm">
			<input type="checkbox" name="filter.v.availability" value="1" checked>
			<input type="checkbox" name="filter.p.vendor" value="Acme">
		</form>
	</div>
	<div id="ProductGridWrapper">
		<div id="ProductGridContainer"><ul><li>Everything</li></ul></div>
		<span id="ProductCount">12 products</span>
		<span id="ProductCountDesktop">12 products</span>
		<div class="active-facets"></div>
	</div>"#;

fn grid(label: &str) -> Response {
	html(&format!(
		r#"<div id="ProductGridContainer"><ul><li>{0}</li></ul></div><span id="ProductCount">{0}</span><span id="ProductCountDesktop">{0}</span><div class="active-facets"></div>"#,
		label
	))
}

#[test]
fn filters_debounce_then_render_and_push() {
	let harness = Harness::new(COLLECTION);
	let facets = FacetFilters::attach(&harness.page, harness.node("#FacetFiltersDrawer"), harness.node("#ProductGridWrapper"), "main-grid");
	facets.open();

	facets.submit_filters(form_query(&harness.node("#FacetFiltersForm")));
	harness.advance(400);
	harness.node("input[name=filter.p.vendor]").set_attribute("checked", "");
	facets.submit_filters(form_query(&harness.node("#FacetFiltersForm")));
	harness.advance(499);
	assert_eq!(harness.transport.count(), 0);
	harness.advance(1);
	assert_eq!(harness.transport.count(), 1);

	let request = harness.transport.request(0);
	let pairs: Vec<(String, String)> = request.url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
	assert_eq!(
		pairs,
		[
			("filter.v.availability".to_owned(), "1".to_owned()),
			("filter.p.vendor".to_owned(), "Acme".to_owned()),
			("section_id".to_owned(), "main-grid".to_owned()),
		]
	);
	assert!(harness.node("#ProductGridContainer").has_class("loading"));

	harness.transport.resolve(0, grid("In stock, Acme"));
	harness.run();
	assert_eq!(harness.node("#ProductCount").text_content(), "In stock, Acme");
	assert!(!harness.node("#ProductGridContainer").has_class("loading"));
	assert!(!facets.is_open());
	assert_eq!(harness.history.entry_count(), 2);
	assert_eq!(harness.history.current().query(), Some("filter.v.availability=1&filter.p.vendor=Acme"));
}

#[test]
fn sorting_is_immediate_and_back_renders_from_cache() {
	let harness = Harness::new(COLLECTION);
	let facets = FacetFilters::attach(&harness.page, harness.node("#FacetFiltersDrawer"), harness.node("#ProductGridWrapper"), "main-grid");

	facets.change_sort("price-ascending");
	harness.run();
	facets.change_sort("price-descending");
	harness.run();
	assert_eq!(harness.transport.count(), 2);

	// Out of order: the older sort must not win.
	harness.transport.resolve(1, grid("Expensive first"));
	harness.run();
	harness.transport.resolve(0, grid("Cheap first"));
	harness.run();
	assert_eq!(harness.node("#ProductCount").text_content(), "Expensive first");
	assert_eq!(harness.history.current().query(), Some("sort_by=price-descending"));
	assert_eq!(harness.history.entry_count(), 2, "only the applied render pushes");

	let back = harness.history.back().unwrap();
	facets.restore(back);
	harness.run();
	assert_eq!(harness.transport.count(), 3);
	harness.transport.resolve(2, grid("Everything"));
	harness.run();
	assert_eq!(harness.node("#ProductCount").text_content(), "Everything");
	assert_eq!(harness.history.entry_count(), 2, "restoring doesn't push");

	let forward = harness.history.forward().unwrap();
	facets.restore(forward);
	assert_eq!(harness.node("#ProductCount").text_content(), "Expensive first");
	assert_eq!(harness.transport.count(), 3, "served from the cache");
}

#[test]
fn a_cached_render_ends_the_loading_state_of_the_fetch_it_supersedes() {
	let harness = Harness::new(COLLECTION);
	let facets = FacetFilters::attach(&harness.page, harness.node("#FacetFiltersDrawer"), harness.node("#ProductGridWrapper"), "main-grid");

	facets.change_sort("price-ascending");
	harness.run();
	harness.transport.resolve(0, grid("Cheap first"));
	harness.run();
	let cheap_first = harness.history.current();

	facets.change_sort("price-descending");
	harness.run();
	assert!(harness.node("#ProductGridContainer").has_class("loading"));

	facets.restore(cheap_first);
	assert!(!harness.node("#ProductGridContainer").has_class("loading"));
	harness.transport.resolve(1, grid("Expensive first"));
	harness.run();

	assert_eq!(harness.node("#ProductCount").text_content(), "Cheap first");
	assert!(!harness.node("#ProductGridContainer").has_class("loading"));
	assert_eq!(harness.transport.count(), 2);
}
