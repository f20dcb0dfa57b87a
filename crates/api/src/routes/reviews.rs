//! Review moderation.
//!
//! Reviews are created by customers through the portal; businesses can
//! publish, reject, edit and delete them.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use reservio_core::domain::Review;
use reservio_core::types::{ReviewId, ReviewStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::db::ReviewRepository;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::BusinessAuth;
use crate::services::{ReviewPatch, ReviewService};
use crate::state::AppState;

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", get(show).patch(update).delete(destroy))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
}

/// Reviews, newest first.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>> {
    let mut reviews = ReviewRepository::new(state.db(), auth.business_id)
        .filter(|r| query.status.is_none_or(|status| r.status == status))
        .await?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(reviews))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(review))
}

/// Change status, rating or comment. Ratings are recomputed afterwards.
#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ReviewId>,
    Json(patch): Json<ReviewPatch>,
) -> Result<Json<Review>> {
    let review = ReviewService::new(state.db(), auth.business_id)
        .update(id, patch)
        .await?;
    Ok(Json(review))
}

#[instrument(skip_all, fields(%id))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewService::new(state.db(), auth.business_id)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
