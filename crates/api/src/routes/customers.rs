//! Customer CRUD.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use reservio_core::domain::{Customer, CustomerDraft, CustomerPatch};
use reservio_core::types::CustomerId;
use tracing::instrument;

use crate::db::CustomerRepository;
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::BusinessAuth;
use crate::state::AppState;

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
}

/// List customers in creation order.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<Customer>>> {
    let customers = CustomerRepository::new(state.db(), auth.business_id)
        .list()
        .await?;
    Ok(Json(customers))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<CustomerDraft>,
) -> Result<(StatusCode, Json<Customer>)> {
    let customer = Customer::create(draft, Utc::now())?;
    let customer = CustomerRepository::new(state.db(), auth.business_id)
        .insert(customer)
        .await?;
    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<Customer>> {
    let customer = CustomerRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(customer))
}

#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CustomerId>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>> {
    let customer = CustomerRepository::new(state.db(), auth.business_id)
        .update(id, |c| c.apply(patch))
        .await?;
    Ok(Json(customer))
}

/// Delete a customer. Bookings keep their embedded customer snapshot.
#[instrument(skip_all, fields(%id))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    CustomerRepository::new(state.db(), auth.business_id)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
