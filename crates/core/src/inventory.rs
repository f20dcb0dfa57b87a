//! Stock movements.

use thiserror::Error;

use crate::domain::{MAX_STOCK_QUANTITY, Product};
use crate::types::VariantId;

/// Errors from a stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// The product has variants, so the sale must name one.
    #[error("product has variants; a variant_id is required")]
    VariantRequired,
    /// The variant does not belong to the product.
    #[error("unknown variant {0}")]
    UnknownVariant(VariantId),
    /// The sale would take stock below zero and oversell is disabled.
    #[error("insufficient stock: {available} available, {requested} requested")]
    Insufficient {
        /// Units on hand before the sale.
        available: i64,
        /// Units the sale asked for.
        requested: u32,
    },
    /// The sale would push stock past the supported range.
    #[error("stock level out of range")]
    OutOfRange,
}

impl Product {
    /// Remove `quantity` units sold at the POS.
    ///
    /// With variants, the named variant is decremented and the parent totals
    /// are rolled up again. The product is unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns `StockError` for a missing/unknown variant, when
    /// `allow_negative` is false and stock would drop below zero, or when
    /// oversell would go past `-MAX_STOCK_QUANTITY`.
    pub fn remove_stock(
        &mut self,
        variant_id: Option<VariantId>,
        quantity: u32,
        allow_negative: bool,
    ) -> Result<(), StockError> {
        let requested = i64::from(quantity);
        let on_hand = if self.variants.is_empty() {
            &mut self.stock_quantity
        } else {
            let id = variant_id.ok_or(StockError::VariantRequired)?;
            let variant = self
                .variants
                .iter_mut()
                .find(|v| v.id == id)
                .ok_or(StockError::UnknownVariant(id))?;
            &mut variant.stock_quantity
        };

        if !allow_negative && *on_hand < requested {
            return Err(StockError::Insufficient {
                available: *on_hand,
                requested: quantity,
            });
        }
        *on_hand = on_hand
            .checked_sub(requested)
            .filter(|left| *left >= -MAX_STOCK_QUANTITY)
            .ok_or(StockError::OutOfRange)?;
        self.roll_up_variants();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{ProductDraft, VariantDraft};

    fn product(stock: i64, variants: Vec<(i64, i64)>) -> Product {
        let variants = variants
            .into_iter()
            .map(|(cents, stock)| VariantDraft {
                id: None,
                name: format!("v{cents}"),
                sku: None,
                price: Decimal::new(cents, 2),
                stock_quantity: stock,
            })
            .collect();
        Product::create(
            ProductDraft {
                name: "Wax".to_owned(),
                sku: None,
                category: None,
                description: None,
                price: Some(Decimal::from(12)),
                stock_quantity: stock,
                variants,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_plain_product_decrements_exactly() {
        let mut p = product(10, Vec::new());
        p.remove_stock(None, 4, true).unwrap();
        assert_eq!(p.stock_quantity, 6);
    }

    #[test]
    fn test_oversell_allowed_goes_negative() {
        let mut p = product(1, Vec::new());
        p.remove_stock(None, 3, true).unwrap();
        assert_eq!(p.stock_quantity, -2);
    }

    #[test]
    fn test_oversell_blocked_leaves_stock() {
        let mut p = product(1, Vec::new());
        let err = p.remove_stock(None, 3, false).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                available: 1,
                requested: 3
            }
        );
        assert_eq!(p.stock_quantity, 1);
    }

    #[test]
    fn test_variant_sale_rolls_up() {
        let mut p = product(0, vec![(500, 5), (800, 2)]);
        let small = p.variants[0].id;
        p.remove_stock(Some(small), 2, false).unwrap();
        assert_eq!(p.variants[0].stock_quantity, 3);
        assert_eq!(p.stock_quantity, 5);
    }

    #[test]
    fn test_variant_required_and_known() {
        let mut p = product(0, vec![(500, 5)]);
        assert_eq!(p.remove_stock(None, 1, true), Err(StockError::VariantRequired));
        let stranger = VariantId::new();
        assert_eq!(
            p.remove_stock(Some(stranger), 1, true),
            Err(StockError::UnknownVariant(stranger))
        );
    }

    #[test]
    fn test_oversell_bounded() {
        let mut p = product(-MAX_STOCK_QUANTITY + 2, Vec::new());
        assert_eq!(p.remove_stock(None, 3, true), Err(StockError::OutOfRange));
        assert_eq!(p.stock_quantity, -MAX_STOCK_QUANTITY + 2);
        p.remove_stock(None, 2, true).unwrap();
        assert_eq!(p.stock_quantity, -MAX_STOCK_QUANTITY);
    }
}
