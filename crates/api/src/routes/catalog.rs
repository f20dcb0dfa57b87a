//! Bookable service CRUD.
//!
//! Staff assignments must reference staff of the same business.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use reservio_core::domain::{Service, ServiceDraft, ServicePatch};
use reservio_core::types::{ServiceId, StaffId};
use tracing::instrument;

use crate::db::{RepositoryError, ServiceRepository, Tenant};
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::BusinessAuth;
use crate::state::AppState;

/// Build the services router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
}

fn check_staff(tenant: &Tenant, staff_ids: &[StaffId]) -> std::result::Result<(), RepositoryError> {
    for id in staff_ids {
        tenant.staff.resolve(*id)?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    auth: BusinessAuth,
) -> Result<Json<Vec<Service>>> {
    let services = ServiceRepository::new(state.db(), auth.business_id)
        .list()
        .await?;
    Ok(Json(services))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<ServiceDraft>,
) -> Result<(StatusCode, Json<Service>)> {
    let service = Service::create(draft, Utc::now())?;
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    check_staff(tenant, &service.staff_ids)?;
    tenant.services.insert(service.clone())?;
    tracing::info!(service_id = %service.id, "Service created");
    Ok((StatusCode::CREATED, Json(service)))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ServiceId>,
) -> Result<Json<Service>> {
    let service = ServiceRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(service))
}

/// Update a service. Existing bookings keep the snapshot taken when booked.
#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ServiceId>,
    Json(patch): Json<ServicePatch>,
) -> Result<Json<Service>> {
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    if let Some(staff_ids) = &patch.staff_ids {
        check_staff(tenant, staff_ids)?;
    }
    let stored = tenant.services.find_mut(id)?;
    let mut updated = stored.clone();
    updated.apply(patch)?;
    *stored = updated.clone();
    Ok(Json(updated))
}

#[instrument(skip_all, fields(%id))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<ServiceId>,
) -> Result<StatusCode> {
    ServiceRepository::new(state.db(), auth.business_id)
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
