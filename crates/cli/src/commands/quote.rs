//! Price a cart from a YAML file.
//!
//! ```yaml
//! items:
//!   - { name: Colour, unit_price: "100.00" }
//!   - { name: Shampoo, kind: product, unit_price: "12.50", quantity: 2 }
//! discount: { type: percentage, value: "20" }
//! ```

use std::path::Path;

use reservio_core::domain::{Discount, LineItem, LineItemKind};
use reservio_core::pricing::{PricingError, Totals, compute_totals};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Errors from `quote`.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("failed to read cart file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse cart file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

const fn default_kind() -> LineItemKind {
    LineItemKind::Service
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct CartLine {
    name: String,
    #[serde(default = "default_kind")]
    kind: LineItemKind,
    unit_price: Decimal,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct CartFile {
    items: Vec<CartLine>,
    #[serde(default)]
    discount: Option<Discount>,
}

impl CartFile {
    fn line_items(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .map(|line| LineItem {
                kind: line.kind,
                item_id: Uuid::new_v4(),
                variant_id: None,
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                staff_id: None,
            })
            .collect()
    }
}

fn price(text: &str) -> Result<Totals, QuoteError> {
    let cart: CartFile = serde_yaml::from_str(text)?;
    Ok(compute_totals(&cart.line_items(), cart.discount.as_ref())?)
}

/// Print the totals for the cart in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the cart is
/// rejected by the calculator.
pub fn run(path: &Path) -> Result<(), QuoteError> {
    let text = std::fs::read_to_string(path)?;
    let totals = price(&text)?;
    info!(
        subtotal = %totals.subtotal,
        discount = %totals.discount_amount,
        tax = %totals.tax_amount,
        total = %totals.total,
        "Cart priced"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_discount() {
        let totals = price(
            r#"
items:
  - { name: Colour, unit_price: "100.00" }
discount: { type: percentage, value: "20" }
"#,
        )
        .unwrap();
        assert_eq!(totals.discount_amount, Decimal::from(20));
        assert_eq!(totals.tax_amount, Decimal::from(8));
        assert_eq!(totals.total, Decimal::from(88));
    }

    #[test]
    fn test_quantity_and_kind_defaults() {
        let totals = price(
            r#"
items:
  - { name: Cut, unit_price: "40.00" }
  - { name: Shampoo, kind: product, unit_price: "5.00", quantity: 2 }
"#,
        )
        .unwrap();
        assert_eq!(totals.subtotal, Decimal::from(50));
        assert_eq!(totals.total, Decimal::from(55));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = price("items: []").unwrap_err();
        assert!(matches!(err, QuoteError::Pricing(PricingError::EmptyCart)));
    }
}
