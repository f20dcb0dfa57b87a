//! Retail products and their variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ValidationError, optional_text, require_text};
use crate::types::{ProductId, VariantId};

/// Largest stock level, positive or negative, a product or variant may hold.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

fn check_stock(field: &'static str, quantity: i64) -> Result<i64, ValidationError> {
    if !(-MAX_STOCK_QUANTITY..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ValidationError::new(
            field,
            format!("must be within ±{MAX_STOCK_QUANTITY}"),
        ));
    }
    Ok(quantity)
}

/// A purchasable variation of a product (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
}

/// A retail product sold through the POS.
///
/// When `variants` is non-empty, `price` is the cheapest variant price and
/// `stock_quantity` is the sum of variant stock. [`Product::roll_up_variants`]
/// restores this after any change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a variant. An `id` keeps an existing variant's identity on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDraft {
    #[serde(default)]
    pub id: Option<VariantId>,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i64,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Required unless variants are given.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub variants: Vec<VariantDraft>,
}

/// Partial update of a product. `variants` replaces the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i64>,
    pub variants: Option<Vec<VariantDraft>>,
}

fn build_variants(drafts: Vec<VariantDraft>) -> Result<Vec<Variant>, ValidationError> {
    drafts
        .into_iter()
        .map(|draft| {
            if draft.price.is_sign_negative() {
                return Err(ValidationError::new("variants.price", "cannot be negative"));
            }
            Ok(Variant {
                id: draft.id.unwrap_or_default(),
                name: require_text("variants.name", &draft.name)?,
                sku: optional_text(draft.sku),
                price: draft.price,
                stock_quantity: check_stock("variants.stock_quantity", draft.stock_quantity)?,
            })
        })
        .collect()
}

impl Product {
    /// Build a product from a draft and establish the variant invariant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name, a negative price, a
    /// missing price on a product without variants, or stock beyond
    /// [`MAX_STOCK_QUANTITY`].
    pub fn create(draft: ProductDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let variants = build_variants(draft.variants)?;
        let stock_quantity = check_stock("stock_quantity", draft.stock_quantity)?;
        let price = match (draft.price, variants.is_empty()) {
            (Some(price), _) if price.is_sign_negative() => {
                return Err(ValidationError::new("price", "cannot be negative"));
            }
            (Some(price), _) => price,
            (None, false) => Decimal::ZERO,
            (None, true) => {
                return Err(ValidationError::new(
                    "price",
                    "is required for products without variants",
                ));
            }
        };

        let mut product = Self {
            id: ProductId::new(),
            name: require_text("name", &draft.name)?,
            sku: optional_text(draft.sku),
            category: optional_text(draft.category),
            description: optional_text(draft.description),
            price,
            stock_quantity,
            variants,
            created_at: now,
            updated_at: now,
        };
        product.roll_up_variants();
        Ok(product)
    }

    /// Apply a partial update and re-establish the variant invariant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name, a negative price or stock
    /// beyond [`MAX_STOCK_QUANTITY`]; nothing is changed in that case.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let name = patch.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        if patch.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(ValidationError::new("price", "cannot be negative"));
        }
        let variants = patch.variants.map(build_variants).transpose()?;
        let stock = patch
            .stock_quantity
            .map(|q| check_stock("stock_quantity", q))
            .transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if patch.sku.is_some() {
            self.sku = optional_text(patch.sku);
        }
        if patch.category.is_some() {
            self.category = optional_text(patch.category);
        }
        if patch.description.is_some() {
            self.description = optional_text(patch.description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = stock {
            self.stock_quantity = stock;
        }
        if let Some(variants) = variants {
            self.variants = variants;
        }
        self.updated_at = now;
        self.roll_up_variants();
        Ok(())
    }

    /// Recompute `price` and `stock_quantity` from variants, if any.
    pub fn roll_up_variants(&mut self) {
        if let Some(min_price) = self.variants.iter().map(|v| v.price).min() {
            self.price = min_price;
            self.stock_quantity = self
                .variants
                .iter()
                .fold(0, |sum, v| sum.saturating_add(v.stock_quantity));
        }
    }

    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}
