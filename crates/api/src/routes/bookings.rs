//! Booking list, creation (with recurring series), update and deletion.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use reservio_core::domain::{Booking, BookingDraft, BookingPatch};
use reservio_core::types::BookingId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::BookingRepository;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::BusinessAuth;
use crate::services::BookingFilter;
use crate::state::AppState;

/// Build the bookings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
}

/// List bookings by start time, optionally filtered by range, staff and status.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>> {
    let bookings = state.bookings(auth.business_id).list(&filter).await?;
    Ok(Json(bookings))
}

/// Create a booking, or every occurrence of a recurring series.
///
/// Always responds with a list; a single booking is a list of one.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<BookingDraft>,
) -> Result<(StatusCode, Json<Vec<Booking>>)> {
    let bookings = state.bookings(auth.business_id).create(draft).await?;
    Ok((StatusCode::CREATED, Json(bookings)))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>> {
    let booking = BookingRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(booking))
}

#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<BookingId>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>> {
    let booking = state.bookings(auth.business_id).update(id, patch).await?;
    Ok(Json(booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Remove every booking of the series instead of just this one.
    #[serde(default)]
    pub series: bool,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: usize,
}

#[instrument(skip_all, fields(%id, series = query.series))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<BookingId>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Deleted>> {
    let deleted = state
        .bookings(auth.business_id)
        .delete(id, query.series)
        .await?;
    Ok(Json(Deleted { deleted }))
}
