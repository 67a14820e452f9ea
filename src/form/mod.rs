//! Components that mutate the cart or the selected variant.

pub mod cart_items;
pub mod product_form;
pub mod quantity;
pub mod quick_add;
pub mod variant_picker;

pub use cart_items::CartItems;
pub use product_form::{ProductForm, Submission};
pub use quantity::{QuantityInput, QuantityRules};
pub use quick_add::QuickAdd;
pub use variant_picker::VariantPicker;
