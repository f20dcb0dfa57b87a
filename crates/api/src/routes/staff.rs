//! Staff CRUD, weekly schedules, time off and availability.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use chrono::{NaiveDate, Utc};
use reservio_core::domain::{Staff, StaffDraft, StaffPatch, TimeOff, TimeOffDraft, WeeklySchedule};
use reservio_core::types::{StaffId, TimeOffId};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{RepositoryError, StaffRepository};
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::BusinessAuth;
use crate::services::Availability;
use crate::state::AppState;

/// Build the staff router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
        .route("/{id}/schedule", put(set_schedule))
        .route("/{id}/availability", get(availability))
        .route("/{id}/time-off", get(time_off_index).post(time_off_create))
        .route(
            "/{id}/time-off/{time_off_id}",
            get(time_off_show)
                .patch(time_off_update)
                .delete(time_off_destroy),
        )
}

#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, auth: BusinessAuth) -> Result<Json<Vec<Staff>>> {
    let staff = StaffRepository::new(state.db(), auth.business_id)
        .list()
        .await?;
    Ok(Json(staff))
}

/// Add a staff member. Without a schedule they work Monday to Friday.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Json(draft): Json<StaffDraft>,
) -> Result<(StatusCode, Json<Staff>)> {
    let staff = Staff::create(draft, Utc::now())?;
    let staff = StaffRepository::new(state.db(), auth.business_id)
        .insert(staff)
        .await?;
    tracing::info!(staff_id = %staff.id, "Staff member created");
    Ok((StatusCode::CREATED, Json(staff)))
}

#[instrument(skip_all, fields(%id))]
pub async fn show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
) -> Result<Json<Staff>> {
    let staff = StaffRepository::new(state.db(), auth.business_id)
        .get(id)
        .await?;
    Ok(Json(staff))
}

#[instrument(skip_all, fields(%id))]
pub async fn update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
    Json(patch): Json<StaffPatch>,
) -> Result<Json<Staff>> {
    let staff = StaffRepository::new(state.db(), auth.business_id)
        .update(id, |s| s.apply(patch))
        .await?;
    Ok(Json(staff))
}

/// Remove a staff member, their time off and their service assignments.
#[instrument(skip_all, fields(%id))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
) -> Result<StatusCode> {
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    tenant.staff.remove(id)?;
    tenant.time_off.remove_where(|t| t.staff_id == id);
    for service in tenant.services.iter_mut() {
        service.staff_ids.retain(|s| *s != id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the weekly schedule.
#[instrument(skip_all, fields(%id))]
pub async fn set_schedule(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
    Json(schedule): Json<WeeklySchedule>,
) -> Result<Json<Staff>> {
    let staff = StaffRepository::new(state.db(), auth.business_id)
        .update(id, |s| s.set_schedule(schedule))
        .await?;
    Ok(Json(staff))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

/// Free slots of a staff member on one day.
#[instrument(skip_all, fields(%id, date = %query.date))]
pub async fn availability(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>> {
    let availability = state
        .bookings(auth.business_id)
        .availability(id, query.date)
        .await?;
    Ok(Json(availability))
}

#[instrument(skip_all, fields(%id))]
pub async fn time_off_index(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
) -> Result<Json<Vec<TimeOff>>> {
    let tables = state.db().read().await;
    let tenant = tables.tenant(auth.business_id)?;
    tenant.staff.find(id)?;
    let mut entries: Vec<TimeOff> = tenant
        .time_off
        .iter()
        .filter(|t| t.staff_id == id)
        .cloned()
        .collect();
    entries.sort_by_key(|t| t.start_at);
    Ok(Json(entries))
}

#[instrument(skip_all, fields(%id))]
pub async fn time_off_create(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path(id): Path<StaffId>,
    Json(draft): Json<TimeOffDraft>,
) -> Result<(StatusCode, Json<TimeOff>)> {
    let entry = TimeOff::create(id, draft, Utc::now())?;
    let mut tables = state.db().write().await;
    let tenant = tables.tenant_mut(auth.business_id)?;
    tenant.staff.find(id)?;
    tenant.time_off.insert(entry.clone())?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip_all, fields(%id, %time_off_id))]
pub async fn time_off_show(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path((id, time_off_id)): Path<(StaffId, TimeOffId)>,
) -> Result<Json<TimeOff>> {
    let tables = state.db().read().await;
    let entry = tables
        .tenant(auth.business_id)?
        .time_off
        .get(time_off_id)
        .filter(|t| t.staff_id == id)
        .ok_or(RepositoryError::NotFound("time off"))?;
    Ok(Json(entry.clone()))
}

/// Replace a time off period.
#[instrument(skip_all, fields(%id, %time_off_id))]
pub async fn time_off_update(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path((id, time_off_id)): Path<(StaffId, TimeOffId)>,
    Json(draft): Json<TimeOffDraft>,
) -> Result<Json<TimeOff>> {
    let mut tables = state.db().write().await;
    let stored = tables
        .tenant_mut(auth.business_id)?
        .time_off
        .get_mut(time_off_id)
        .filter(|t| t.staff_id == id)
        .ok_or(RepositoryError::NotFound("time off"))?;
    stored.replace(draft)?;
    Ok(Json(stored.clone()))
}

#[instrument(skip_all, fields(%id, %time_off_id))]
pub async fn time_off_destroy(
    State(state): State<AppState>,
    auth: BusinessAuth,
    Path((id, time_off_id)): Path<(StaffId, TimeOffId)>,
) -> Result<StatusCode> {
    let mut tables = state.db().write().await;
    let removed = tables
        .tenant_mut(auth.business_id)?
        .time_off
        .remove_where(|t| t.id == time_off_id && t.staff_id == id);
    if removed == 0 {
        return Err(RepositoryError::NotFound("time off").into());
    }
    Ok(StatusCode::NO_CONTENT)
}
