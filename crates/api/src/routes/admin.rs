//! Platform administration.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use reservio_core::types::BusinessId;
use tracing::instrument;

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::AdminAuth;
use crate::services::reports::{self, BusinessSummary, PlatformStats};
use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/businesses", get(businesses))
        .route("/businesses/{id}/suspend", post(suspend))
        .route("/businesses/{id}/unsuspend", post(unsuspend))
        .route("/stats", get(stats))
}

/// Every business with entity counts, newest first.
#[instrument(skip_all)]
pub async fn businesses(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Json<Vec<BusinessSummary>> {
    Json(reports::businesses(state.db()).await)
}

/// Suspend a business. Its accounts and API keys get 403 until reinstated.
#[instrument(skip_all, fields(%id, admin = %admin.0.email))]
pub async fn suspend(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<BusinessId>,
) -> Result<Json<BusinessSummary>> {
    Ok(Json(reports::set_suspended(state.db(), id, true).await?))
}

#[instrument(skip_all, fields(%id, admin = %admin.0.email))]
pub async fn unsuspend(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<BusinessId>,
) -> Result<Json<BusinessSummary>> {
    Ok(Json(reports::set_suspended(state.db(), id, false).await?))
}

/// Totals across the platform.
#[instrument(skip_all)]
pub async fn stats(State(state): State<AppState>, _admin: AdminAuth) -> Json<PlatformStats> {
    Json(reports::platform_stats(state.db()).await)
}
