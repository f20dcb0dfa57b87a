//! Business settings and API key management.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use chrono::Utc;
use reservio_core::ValidationError;
use reservio_core::domain::BusinessSettings;
use reservio_core::types::ApiKeyId;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::{ApiKeyView, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{BusinessActor, BusinessAuth};
use crate::services::auth::generate_api_key;
use crate::state::AppState;

/// Build the settings and API key router (mounted at `/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(show).put(replace))
        .route("/api-keys", get(api_key_index).post(api_key_create))
        .route("/api-keys/{id}", delete(api_key_revoke))
}

#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<BusinessSettings>> {
    let tables = state.db().read().await;
    let settings = tables.tenant(auth.business_id)?.settings.clone();
    Ok(Json(settings))
}

/// Replace the settings. The business name is kept in sync.
#[instrument(skip_all)]
pub async fn replace(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(mut settings): Json<BusinessSettings>,
) -> Result<Json<BusinessSettings>> {
    settings.business_name = settings.business_name.trim().to_owned();
    if settings.business_name.is_empty() {
        return Err(ValidationError::new("business_name", "cannot be blank").into());
    }
    if settings.timezone.trim().is_empty() {
        return Err(ValidationError::new("timezone", "cannot be blank").into());
    }

    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    tenant.business.name.clone_from(&settings.business_name);
    tenant.settings = settings.clone();
    info!(business_id = %auth.business_id, "Settings updated");
    Ok(Json(settings))
}

/// API keys can only be managed with a signed-in business account.
fn require_account(auth: &BusinessAuth) -> Result<()> {
    match auth.actor {
        BusinessActor::Account(_) => Ok(()),
        BusinessActor::ApiKey(_) => Err(AppError::Forbidden(
            "API keys cannot manage API keys".to_owned(),
        )),
    }
}

#[instrument(skip_all)]
pub async fn api_key_index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<ApiKeyView>>> {
    require_account(&auth)?;
    let tables = state.db().read().await;
    let keys = tables
        .tenant(auth.business_id)?
        .api_keys
        .iter()
        .map(ApiKeyView::from)
        .collect();
    Ok(Json(keys))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKey {
    pub label: String,
}

/// Issue a key. The plaintext is only ever returned here.
#[instrument(skip_all)]
pub async fn api_key_create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(request): Json<CreateApiKey>,
) -> Result<(StatusCode, Json<ApiKeyView>)> {
    require_account(&auth)?;
    if request.label.trim().is_empty() {
        return Err(ValidationError::new("label", "cannot be blank").into());
    }
    let (record, key) = generate_api_key(&request.label, Utc::now());
    let mut view = ApiKeyView::from(&record);
    view.key = Some(key);

    let mut tables = state.db().write().await;
    tables
        .tenant_mut(auth.business_id)?
        .api_keys
        .insert(record)?;
    info!(api_key_id = %view.id, "API key created");
    Ok((StatusCode::CREATED, Json(view)))
}

/// Revoke a key. Revoked keys stay listed.
#[instrument(skip_all, fields(%id))]
pub async fn api_key_revoke(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ApiKeyId>,
) -> Result<Json<ApiKeyView>> {
    require_account(&auth)?;
    let mut tables = state.db().write().await;
    let key = tables
        .tenant_mut(auth.business_id)?
        .api_keys
        .find_mut(id)?;
    if !key.is_active() {
        return Err(RepositoryError::Conflict("API key is already revoked".to_owned()).into());
    }
    key.revoked_at = Some(Utc::now());
    info!(api_key_id = %id, "API key revoked");
    Ok(Json(ApiKeyView::from(&*key)))
}
