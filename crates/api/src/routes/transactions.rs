//! POS transactions: commit, quote and history.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use reservio_core::domain::Transaction;
use reservio_core::types::TransactionId;
use tracing::instrument;

use crate::db::TransactionRepository;
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::BusinessAuth;
use crate::services::{CartRequest, PosService, Quote};
use crate::state::AppState;

/// Build the transactions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(commit))
        .route("/quote", post(quote))
        .route("/{id}", get(show))
}

/// Transactions, newest first.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<Transaction>>> {
    let mut transactions = TransactionRepository::new(state.db(), auth.business_id)
        .list()
        .await?;
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(transactions))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>> {
    let transaction = TransactionRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(transaction))
}

/// Price a cart without recording anything.
#[instrument(skip_all, fields(items = cart.items.len()))]
pub async fn quote(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(cart): Json<CartRequest>,
) -> Result<Json<Quote>> {
    let quote = PosService::new(state.db(), auth.business_id)
        .quote(&cart)
        .await?;
    Ok(Json(quote))
}

/// Record a sale, moving stock and settling any linked booking.
#[instrument(skip_all, fields(items = cart.items.len()))]
pub async fn commit(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(cart): Json<CartRequest>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let transaction = PosService::new(state.db(), auth.business_id)
        .commit(cart)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}
