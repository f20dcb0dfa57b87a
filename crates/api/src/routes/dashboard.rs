//! Back-office dashboard.

use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::BusinessAuth;
use crate::services::reports::{self, DashboardSummary};
use crate::state::AppState;

/// Today's bookings and revenue, upcoming bookings and pending reviews.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<DashboardSummary>> {
    let summary = reports::dashboard(state.db(), auth.business_id, Utc::now()).await?;
    Ok(Json(summary))
}
