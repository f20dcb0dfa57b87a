//! Campaigns and audiences.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use reservio_core::domain::{
    Audience, AudienceDraft, AudiencePatch, Campaign, CampaignDraft, CampaignPatch, Customer,
};
use reservio_core::types::{AudienceId, CampaignId, CampaignStatus};
use tracing::instrument;

use crate::db::{AudienceRepository, CampaignRepository, RepositoryError};
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::BusinessAuth;
use crate::services::{AudienceView, MarketingService};
use crate::state::AppState;

/// Build the campaigns router.
pub fn campaign_router() -> Router<AppState> {
    Router::new()
        .route("/", get(campaign_index).post(campaign_create))
        .route(
            "/{id}",
            get(campaign_show)
                .patch(campaign_update)
                .delete(campaign_destroy),
        )
        .route("/{id}/send", post(campaign_send))
}

/// Build the audiences router.
pub fn audience_router() -> Router<AppState> {
    Router::new()
        .route("/", get(audience_index).post(audience_create))
        .route(
            "/{id}",
            get(audience_show)
                .patch(audience_update)
                .delete(audience_destroy),
        )
        .route("/{id}/members", get(audience_members))
}

// ============================================================================
// Campaigns
// ============================================================================

#[instrument(skip_all)]
pub async fn campaign_index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<Campaign>>> {
    let campaigns = CampaignRepository::new(state.db(), auth.business_id)
        .list()
        .await?;
    Ok(Json(campaigns))
}

#[instrument(skip_all)]
pub async fn campaign_create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<CampaignDraft>,
) -> Result<(StatusCode, Json<Campaign>)> {
    let campaign = MarketingService::new(state.db(), auth.business_id)
        .create_campaign(draft, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[instrument(skip_all, fields(%id))]
pub async fn campaign_show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CampaignId>,
) -> Result<Json<Campaign>> {
    let campaign = CampaignRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(campaign))
}

#[instrument(skip_all, fields(%id))]
pub async fn campaign_update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CampaignId>,
    Json(patch): Json<CampaignPatch>,
) -> Result<Json<Campaign>> {
    let campaign = MarketingService::new(state.db(), auth.business_id)
        .update_campaign(id, patch)
        .await?;
    Ok(Json(campaign))
}

#[instrument(skip_all, fields(%id))]
pub async fn campaign_destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CampaignId>,
) -> Result<StatusCode> {
    CampaignRepository::new(state.db(), auth.business_id)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send a campaign to its audience as it stands now.
#[instrument(skip_all, fields(%id))]
pub async fn campaign_send(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<CampaignId>,
) -> Result<Json<Campaign>> {
    let campaign = MarketingService::new(state.db(), auth.business_id)
        .send_campaign(id, Utc::now())
        .await?;
    Ok(Json(campaign))
}

// ============================================================================
// Audiences
// ============================================================================

#[instrument(skip_all)]
pub async fn audience_index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<AudienceView>>> {
    let audiences = MarketingService::new(state.db(), auth.business_id)
        .audiences(Utc::now())
        .await?;
    Ok(Json(audiences))
}

#[instrument(skip_all)]
pub async fn audience_create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<AudienceDraft>,
) -> Result<(StatusCode, Json<AudienceView>)> {
    let now = Utc::now();
    let audience = Audience::create(draft, now)?;
    AudienceRepository::new(state.db(), auth.business_id)
        .insert(audience.clone())
        .await?;
    let view = MarketingService::new(state.db(), auth.business_id)
        .audience(audience.id, now)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip_all, fields(%id))]
pub async fn audience_show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<AudienceId>,
) -> Result<Json<AudienceView>> {
    let view = MarketingService::new(state.db(), auth.business_id)
        .audience(id, Utc::now())
        .await?;
    Ok(Json(view))
}

#[instrument(skip_all, fields(%id))]
pub async fn audience_update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<AudienceId>,
    Json(patch): Json<AudiencePatch>,
) -> Result<Json<AudienceView>> {
    AudienceRepository::new(state.db(), auth.business_id)
        .update(id, |a| a.apply(patch))
        .await?;
    let view = MarketingService::new(state.db(), auth.business_id)
        .audience(id, Utc::now())
        .await?;
    Ok(Json(view))
}

/// Delete an audience that no unsent campaign targets.
#[instrument(skip_all, fields(%id))]
pub async fn audience_destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<AudienceId>,
) -> Result<StatusCode> {
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    let in_use = tenant
        .campaigns
        .iter()
        .any(|c| c.audience_id == Some(id) && c.status != CampaignStatus::Sent);
    if in_use {
        return Err(RepositoryError::Conflict(
            "audience is targeted by an unsent campaign".to_owned(),
        )
        .into());
    }
    tenant.audiences.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Customers currently in the audience.
#[instrument(skip_all, fields(%id))]
pub async fn audience_members(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<AudienceId>,
) -> Result<Json<Vec<Customer>>> {
    let members = MarketingService::new(state.db(), auth.business_id)
        .members(id, Utc::now())
        .await?;
    Ok(Json(members))
}
