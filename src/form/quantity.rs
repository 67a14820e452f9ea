//! The `<quantity-input>` control: a number field flanked by minus and plus buttons.

use crate::{dom::DomNode, selector::selector};
use tracing::trace;

/// Bounds a quantity must respect, read from the field's `min`, `max` and `step` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityRules {
	pub min: u32,
	pub max: Option<u32>,
	pub step: u32,
}

impl Default for QuantityRules {
	fn default() -> Self {
		Self { min: 1, max: None, step: 1 }
	}
}

impl QuantityRules {
	/// Missing or malformed attributes keep their defaults. A `step` of 0 counts as 1.
	pub fn from_input<N: DomNode>(input: &N) -> Self {
		let read = |name: &str| input.attribute(name).and_then(|value| value.trim().parse::<u32>().ok());
		let defaults = Self::default();
		let min = read("min").unwrap_or(defaults.min);
		Self {
			min,
			max: read("max").filter(|&max| max >= min),
			step: read("step").filter(|&step| step > 0).unwrap_or(defaults.step),
		}
	}

	/// The closest valid quantity at or below `value`, but never below `min`.
	#[must_use]
	pub fn clamp(&self, value: u32) -> u32 {
		let upper = self.max.map_or(value, |max| value.min(max));
		if upper <= self.min {
			return self.min;
		}
		self.min + (upper - self.min) / self.step * self.step
	}

	/// Lenient parse of user input: surrounding whitespace is ignored and anything that isn't a whole number,
	/// including negatives, reads as `min`.
	#[must_use]
	pub fn parse(&self, raw: &str) -> u32 {
		match raw.trim().parse::<u32>() {
			Ok(value) => self.clamp(value),
			Err(_) => self.min,
		}
	}

	#[must_use]
	pub fn increment(&self, value: u32) -> u32 {
		self.clamp(value.saturating_add(self.step))
	}

	#[must_use]
	pub fn decrement(&self, value: u32) -> u32 {
		self.clamp(value.saturating_sub(self.step))
	}
}

/// Binds a `<quantity-input>` element with `input`, `button[name=minus]` and `button[name=plus]` inside.
#[derive(Debug, Clone)]
pub struct QuantityInput<N> {
	root: N,
	input: N,
	rules: QuantityRules,
}

impl<N: DomNode> QuantityInput<N> {
	/// [`None`] iff `root` has no `input`.
	pub fn attach(root: N) -> Option<Self> {
		let input = root.query(&selector("input"))?;
		let rules = QuantityRules::from_input(&input);
		let control = Self { root, input, rules };
		control.update_buttons(control.value());
		Some(control)
	}

	#[must_use]
	pub fn rules(&self) -> QuantityRules {
		self.rules
	}

	#[must_use]
	pub fn input(&self) -> &N {
		&self.input
	}

	/// The field's value as the rules read it.
	#[must_use]
	pub fn value(&self) -> u32 {
		self.rules.parse(&self.input.value().unwrap_or_default())
	}

	/// Writes the clamped `value` back and returns it.
	pub fn set(&self, value: u32) -> u32 {
		let value = self.rules.clamp(value);
		self.input.set_value(&value.to_string());
		self.update_buttons(value);
		trace!(value, "Quantity set.");
		value
	}

	pub fn increment(&self) -> u32 {
		self.set(self.rules.increment(self.value()))
	}

	pub fn decrement(&self) -> u32 {
		self.set(self.rules.decrement(self.value()))
	}

	/// Normalizes whatever was typed.
	pub fn commit(&self) -> u32 {
		self.set(self.value())
	}

	fn update_buttons(&self, value: u32) {
		if let Some(minus) = self.root.query(&selector("button[name=minus]")) {
			minus.toggle_class("disabled", value <= self.rules.min);
		}
		if let Some(plus) = self.root.query(&selector("button[name=plus]")) {
			plus.toggle_class("disabled", self.rules.increment(value) <= value);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vdom::VNode;

	#[test]
	fn clamps_to_bounds_and_step_grid() {
		let rules = QuantityRules { min: 2, max: Some(11), step: 3 };
		assert_eq!(rules.clamp(0), 2);
		assert_eq!(rules.clamp(4), 2);
		assert_eq!(rules.clamp(5), 5);
		assert_eq!(rules.clamp(10), 8);
		assert_eq!(rules.clamp(99), 11);
		assert_eq!(rules.increment(8), 11);
		assert_eq!(rules.decrement(2), 2);
	}

	#[test]
	fn parse_is_lenient() {
		let rules = QuantityRules::default();
		assert_eq!(rules.parse(" 4 "), 4);
		assert_eq!(rules.parse("-3"), 1);
		assert_eq!(rules.parse("two"), 1);
		assert_eq!(rules.parse(""), 1);
	}

	#[test]
	fn rules_from_attributes() {
		let input = VNode::parse(r#"<input min="0" max="oops" step="0">"#).unwrap().query(&selector("input")).unwrap();
		assert_eq!(QuantityRules::from_input(&input), QuantityRules { min: 0, max: None, step: 1 });
	}

	#[test]
	fn buttons_follow_bounds() {
		let root = VNode::parse(
			r#"<quantity-input>
				<button name="minus">-</button>
				<input type="number" value="1" min="1" max="3">
				<button name="plus">+</button>
			</quantity-input>"#,
		)
		.unwrap()
		.query(&selector("quantity-input"))
		.unwrap();
		let control = QuantityInput::attach(root.clone()).unwrap();
		let minus = root.query(&selector("button[name=minus]")).unwrap();
		let plus = root.query(&selector("button[name=plus]")).unwrap();
		assert!(minus.has_class("disabled"));

		assert_eq!(control.increment(), 2);
		assert!(!minus.has_class("disabled"));
		assert!(!plus.has_class("disabled"));
		assert_eq!(control.increment(), 3);
		assert!(plus.has_class("disabled"));
		assert_eq!(control.increment(), 3);
		assert_eq!(control.input().value().as_deref(), Some("3"));

		control.input().set_value("12");
		assert_eq!(control.commit(), 3);
	}
}
