//! POS cart pricing.
//!
//! ```text
//! subtotal        = Σ unit_price × quantity
//! discount_amount = subtotal × pct / 100      (percentage)
//!                 | min(value, subtotal)      (fixed)
//! tax_amount      = (subtotal − discount_amount) × TAX_RATE
//! total           = subtotal − discount_amount + tax_amount
//! ```
//!
//! Each of subtotal, discount and tax is rounded to cents before it feeds the
//! next step, so the stored figures always add up exactly. Arithmetic is
//! checked, and subtotals above [`MAX_SUBTOTAL`] are rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Discount, LineItem};
use crate::types::round_money;

/// Flat sales tax rate (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Largest cart subtotal accepted (one trillion).
pub const MAX_SUBTOTAL: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Errors rejecting a cart before any totals are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("line item quantity must be at least 1")]
    InvalidQuantity,
    #[error("unit price cannot be negative")]
    NegativePrice,
    #[error("discount cannot be negative")]
    NegativeDiscount,
    #[error("percentage discount cannot exceed 100")]
    PercentageOutOfRange,
    #[error("cart amount is too large")]
    Overflow,
}

/// Computed cart figures, all rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl Discount {
    /// Amount taken off `subtotal`, never more than the subtotal itself.
    ///
    /// # Errors
    ///
    /// Returns `PricingError` for negative values or percentages above 100.
    pub fn amount_off(&self, subtotal: Decimal) -> Result<Decimal, PricingError> {
        match *self {
            Self::Percentage { value } | Self::Fixed { value } if value.is_sign_negative() => {
                Err(PricingError::NegativeDiscount)
            }
            Self::Percentage { value } if value > Decimal::ONE_HUNDRED => {
                Err(PricingError::PercentageOutOfRange)
            }
            Self::Percentage { value } => subtotal
                .checked_mul(value)
                .and_then(|amount| amount.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(PricingError::Overflow),
            Self::Fixed { value } => Ok(value.min(subtotal)),
        }
    }
}

/// Price a cart.
///
/// # Errors
///
/// Returns `PricingError` for an empty cart, zero quantities, negative
/// prices, an invalid discount, or a subtotal above [`MAX_SUBTOTAL`].
///
/// ```
/// use reservio_core::domain::{Discount, LineItem, LineItemKind};
/// use reservio_core::pricing::compute_totals;
/// use rust_decimal::Decimal;
///
/// let item = LineItem {
///     kind: LineItemKind::Service,
///     item_id: uuid::Uuid::new_v4(),
///     variant_id: None,
///     name: "Colour".into(),
///     quantity: 1,
///     unit_price: Decimal::from(100),
///     staff_id: None,
/// };
/// let discount = Discount::Percentage { value: Decimal::from(20) };
/// let totals = compute_totals(&[item], Some(&discount)).unwrap();
/// assert_eq!(totals.total, Decimal::from(88));
/// ```
pub fn compute_totals(
    items: &[LineItem],
    discount: Option<&Discount>,
) -> Result<Totals, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut subtotal = Decimal::ZERO;
    for item in items {
        if item.quantity == 0 {
            return Err(PricingError::InvalidQuantity);
        }
        if item.unit_price.is_sign_negative() {
            return Err(PricingError::NegativePrice);
        }
        subtotal = item
            .line_total()
            .and_then(|line| subtotal.checked_add(line))
            .filter(|sum| *sum <= MAX_SUBTOTAL)
            .ok_or(PricingError::Overflow)?;
    }
    let subtotal = round_money(subtotal);

    let discount_amount = match discount {
        Some(discount) => round_money(discount.amount_off(subtotal)?),
        None => round_money(Decimal::ZERO),
    };
    let taxable = subtotal - discount_amount;
    let tax_amount = round_money(taxable.checked_mul(TAX_RATE).ok_or(PricingError::Overflow)?);

    Ok(Totals {
        subtotal,
        discount_amount,
        tax_amount,
        total: taxable + tax_amount,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::LineItemKind;

    fn item(cents: i64, quantity: u32) -> LineItem {
        LineItem {
            kind: LineItemKind::Product,
            item_id: Uuid::new_v4(),
            variant_id: None,
            name: "Item".to_owned(),
            quantity,
            unit_price: Decimal::new(cents, 2),
            staff_id: None,
        }
    }

    fn pct(value: i64) -> Discount {
        Discount::Percentage {
            value: Decimal::from(value),
        }
    }

    fn fixed(cents: i64) -> Discount {
        Discount::Fixed {
            value: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn test_twenty_percent_off_hundred() {
        let totals = compute_totals(&[item(10_000, 1)], Some(&pct(20))).unwrap();
        assert_eq!(totals.subtotal, Decimal::from(100));
        assert_eq!(totals.discount_amount, Decimal::from(20));
        assert_eq!(totals.tax_amount, Decimal::from(8));
        assert_eq!(totals.total, Decimal::from(88));
        assert_eq!(totals.total.to_string(), "88.00");
    }

    #[test]
    fn test_quantities_multiply() {
        let totals = compute_totals(&[item(1_250, 3), item(499, 2)], None).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(4_748, 2));
        assert_eq!(totals.discount_amount, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::new(475, 2));
        assert_eq!(totals.total, Decimal::new(5_223, 2));
    }

    #[test]
    fn test_zero_discounts_take_nothing() {
        for discount in [pct(0), fixed(0)] {
            let totals = compute_totals(&[item(5_000, 1)], Some(&discount)).unwrap();
            assert_eq!(totals.discount_amount, Decimal::ZERO);
            assert_eq!(totals.total, Decimal::from(55));
        }
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let totals = compute_totals(&[item(1_000, 1)], Some(&fixed(2_500))).unwrap();
        assert_eq!(totals.discount_amount, Decimal::from(10));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_totals_identity_holds_with_rounding() {
        let carts = [
            (vec![item(333, 3)], Some(pct(15))),
            (vec![item(1_999, 1), item(1, 7)], Some(fixed(333))),
            (vec![item(7_777, 2)], Some(pct(33))),
            (vec![item(12, 1)], None),
        ];
        for (items, discount) in carts {
            let t = compute_totals(&items, discount.as_ref()).unwrap();
            assert_eq!(t.total, t.subtotal - t.discount_amount + t.tax_amount);
            let exact_tax = (t.subtotal - t.discount_amount) * TAX_RATE;
            assert!((t.tax_amount - exact_tax).abs() <= Decimal::new(5, 3));
        }
    }

    #[test]
    fn test_invalid_carts() {
        assert_eq!(compute_totals(&[], None), Err(PricingError::EmptyCart));
        assert_eq!(
            compute_totals(&[item(100, 0)], None),
            Err(PricingError::InvalidQuantity)
        );
        assert_eq!(
            compute_totals(&[item(-100, 1)], None),
            Err(PricingError::NegativePrice)
        );
        assert_eq!(
            compute_totals(&[item(100, 1)], Some(&pct(101))),
            Err(PricingError::PercentageOutOfRange)
        );
        assert_eq!(
            compute_totals(&[item(100, 1)], Some(&fixed(-1))),
            Err(PricingError::NegativeDiscount)
        );
    }

    #[test]
    fn test_huge_amounts_rejected() {
        let mut huge = item(0, 2);
        huge.unit_price = Decimal::MAX;
        assert_eq!(compute_totals(&[huge], None), Err(PricingError::Overflow));

        // Each line fits but the cart does not
        let mut big = item(0, 1);
        big.unit_price = MAX_SUBTOTAL;
        assert_eq!(
            compute_totals(&[big.clone(), item(1, 1)], None),
            Err(PricingError::Overflow)
        );

        let totals = compute_totals(&[big], Some(&pct(100))).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
