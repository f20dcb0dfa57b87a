//! Point-of-sale transactions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{BookingId, CustomerId, StaffId, TransactionId, VariantId};

/// What a line item sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Service,
    Product,
}

/// One entry of a POS cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    /// A `ServiceId` or `ProductId` depending on `kind`.
    pub item_id: Uuid,
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Staff member who performed a service line, for commission reporting.
    pub staff_id: Option<StaffId>,
}

impl LineItem {
    /// `unit_price × quantity`, unrounded. `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Cart-level discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percent of the subtotal, `0..=100`.
    Percentage { value: Decimal },
    /// Flat amount off the subtotal.
    Fixed { value: Decimal },
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Card,
    Other,
}

/// A committed sale. Amounts are stored rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub items: Vec<LineItem>,
    pub discount: Option<Discount>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub booking_id: Option<BookingId>,
    pub customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
}
