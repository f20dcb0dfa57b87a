//! Customer portal: a customer's own bookings and reviews.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use reservio_core::domain::{Booking, Review};
use tracing::instrument;

use crate::db::BookingRepository;
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::CustomerAuth;
use crate::services::{ReviewService, ReviewSubmission};
use crate::state::AppState;

/// Build the portal router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(bookings))
        .route("/reviews", post(submit_review))
}

/// The signed-in customer's bookings, soonest first.
#[instrument(skip_all, fields(customer_id = %auth.customer_id))]
pub async fn bookings(
    State(state): State<AppState>,
    auth: CustomerAuth,
) -> Result<Json<Vec<Booking>>> {
    let mut bookings = BookingRepository::new(state.db(), auth.business_id)
        .filter(|b| b.customer.id == auth.customer_id)
        .await?;
    bookings.sort_by_key(|b| b.start_at);
    Ok(Json(bookings))
}

/// Review a completed booking. The review waits for moderation.
#[instrument(skip_all, fields(customer_id = %auth.customer_id))]
pub async fn submit_review(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Json(submission): Json<ReviewSubmission>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = ReviewService::new(state.db(), auth.business_id)
        .submit(auth.customer_id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
