//! Point of sale: cart quotes and transaction commits.

use chrono::Utc;
use reservio_core::domain::{
    Discount, LineItem, LineItemKind, PaymentMethod, Product, Transaction,
};
use reservio_core::inventory::StockError;
use reservio_core::pricing::{PricingError, Totals, compute_totals};
use reservio_core::types::{
    BookingId, BusinessId, CustomerId, PaymentStatus, ProductId, ServiceId, StaffId,
    TransactionId, VariantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{Database, RepositoryError, Tenant};

/// Errors from quoting or committing a cart.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("{product}: {source}")]
    Stock {
        product: String,
        #[source]
        source: StockError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One requested cart entry.
///
/// `unit_price` and `name` default to the catalogue values of the
/// referenced service, product or variant.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub kind: LineItemKind,
    pub item_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub staff_id: Option<StaffId>,
}

/// Body of the quote and commit endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CartRequest {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
}

/// Priced cart without side effects.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
}

/// POS operations for one business.
pub struct PosService<'a> {
    db: &'a Database,
    business_id: BusinessId,
}

impl<'a> PosService<'a> {
    #[must_use]
    pub const fn new(db: &'a Database, business_id: BusinessId) -> Self {
        Self { db, business_id }
    }

    /// Price a cart.
    ///
    /// # Errors
    ///
    /// Returns `PosError` for unknown items or an invalid cart.
    pub async fn quote(&self, cart: &CartRequest) -> Result<Quote, PosError> {
        let tables = self.db.read().await;
        let tenant = tables.tenant(self.business_id)?;
        let items = resolve_items(tenant, &cart.items)?;
        let totals = compute_totals(&items, cart.discount.as_ref())?;
        Ok(Quote { items, totals })
    }

    /// Record a sale.
    ///
    /// Under one write guard: decrements product stock, stores the
    /// transaction and, when a booking is linked, stamps it as paid. If any
    /// step fails nothing is changed.
    ///
    /// # Errors
    ///
    /// Returns `PosError::Stock` when the business forbids negative stock
    /// and a product would oversell, plus the errors of [`Self::quote`].
    #[instrument(skip(self, cart), fields(business_id = %self.business_id))]
    pub async fn commit(&self, cart: CartRequest) -> Result<Transaction, PosError> {
        let mut tables = self.db.write().await;
        let tenant = tables.tenant_mut(self.business_id)?;

        let items = resolve_items(tenant, &cart.items)?;
        let totals = compute_totals(&items, cart.discount.as_ref())?;

        let booking_customer = match cart.booking_id {
            Some(id) => Some(tenant.bookings.resolve(id)?.customer.id),
            None => None,
        };
        if let Some(id) = cart.customer_id {
            tenant.customers.resolve(id)?;
        }

        let allow_negative = tenant.settings.allow_negative_stock;
        // Working copies; written back only once every line succeeded.
        let mut restocked: Vec<Product> = Vec::new();
        for item in items.iter().filter(|i| i.kind == LineItemKind::Product) {
            let id = ProductId::from_uuid(item.item_id);
            let index = match restocked.iter().position(|p| p.id == id) {
                Some(index) => index,
                None => {
                    restocked.push(tenant.products.resolve(id)?.clone());
                    restocked.len() - 1
                }
            };
            let product = restocked
                .get_mut(index)
                .ok_or(RepositoryError::InvalidReference("product"))?;
            product
                .remove_stock(item.variant_id, item.quantity, allow_negative)
                .map_err(|source| PosError::Stock {
                    product: product.name.clone(),
                    source,
                })?;
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(),
            items,
            discount: cart.discount,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            total: totals.total,
            payment_method: cart.payment_method,
            booking_id: cart.booking_id,
            customer_id: cart.customer_id.or(booking_customer),
            created_at: now,
        };

        for mut product in restocked {
            product.updated_at = now;
            let id = product.id;
            *tenant.products.find_mut(id)? = product;
        }
        if let Some(booking_id) = cart.booking_id {
            let booking = tenant.bookings.find_mut(booking_id)?;
            booking.transaction_id = Some(transaction.id);
            booking.payment_status = PaymentStatus::Paid;
            booking.updated_at = now;
        }
        tenant.transactions.insert(transaction.clone())?;

        info!(
            transaction_id = %transaction.id,
            total = %transaction.total,
            "Transaction committed"
        );
        Ok(transaction)
    }
}

/// Turn requested cart entries into priced line items.
fn resolve_items(tenant: &Tenant, cart: &[CartItem]) -> Result<Vec<LineItem>, PosError> {
    cart.iter()
        .map(|item| {
            let (name, price) = match item.kind {
                LineItemKind::Service => {
                    let service = tenant
                        .services
                        .resolve(ServiceId::from_uuid(item.item_id))?;
                    if let Some(staff_id) = item.staff_id {
                        tenant.staff.resolve(staff_id)?;
                    }
                    (service.name.clone(), service.price)
                }
                LineItemKind::Product => {
                    let product = tenant
                        .products
                        .resolve(ProductId::from_uuid(item.item_id))?;
                    let stock_error = |source| PosError::Stock {
                        product: product.name.clone(),
                        source,
                    };
                    match item.variant_id {
                        Some(id) => {
                            let variant = product
                                .variant(id)
                                .ok_or_else(|| stock_error(StockError::UnknownVariant(id)))?;
                            (format!("{} ({})", product.name, variant.name), variant.price)
                        }
                        None if !product.variants.is_empty() => {
                            return Err(stock_error(StockError::VariantRequired));
                        }
                        None => (product.name.clone(), product.price),
                    }
                }
            };

            Ok(LineItem {
                kind: item.kind,
                item_id: item.item_id,
                variant_id: item.variant_id,
                name: item
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map_or(name, str::to_owned),
                quantity: item.quantity,
                unit_price: item.unit_price.unwrap_or(price),
                staff_id: match item.kind {
                    LineItemKind::Service => item.staff_id,
                    LineItemKind::Product => None,
                },
            })
        })
        .collect()
}
