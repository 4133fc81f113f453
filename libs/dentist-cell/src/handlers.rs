use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::error::DentistError;
use crate::models::{AssignServiceRequest, AvailabilityQuery, ServiceListQuery, WorkingHours};
use crate::services::{
    availability::AvailabilityService,
    catalog::ServiceCatalog,
    working_hours::WorkingHoursService,
};

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability_public(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let days = service
        .get_availability(dentist_id, &query, state.clinic_today(), None)
        .await?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "days": days,
        "total": days.len()
    })))
}

pub async fn get_working_hours_public(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = WorkingHoursService::new(&state);
    let hours = service.get_working_hours(dentist_id, None).await?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "configured": !hours.is_empty(),
        "working_hours": hours,
        "summary": hours.working_summary()
    })))
}

pub async fn get_dentist_services_public(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let catalog = ServiceCatalog::new(&state);
    let services = catalog.list_dentist_services(dentist_id, None).await?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "services": services,
        "total": services.len()
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

fn require_admin(user: &User, action: &str) -> Result<(), DentistError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(DentistError::Forbidden(format!("Only an administrator can {}", action)))
    }
}

#[axum::debug_handler]
pub async fn set_working_hours(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(hours): Json<WorkingHours>,
) -> Result<Json<Value>, AppError> {
    let is_own_schedule = user.clinic_role() == Role::Dentist && user.id == dentist_id.to_string();
    if !is_own_schedule && !user.is_admin() {
        return Err(DentistError::Forbidden(
            "Only the dentist or an administrator can change working hours".to_string(),
        )
        .into());
    }

    let service = WorkingHoursService::new(&state);
    let saved = service.set_working_hours(dentist_id, &hours, auth.token()).await?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "working_hours": saved,
        "summary": saved.working_summary()
    })))
}

pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "browse the service catalog")?;

    let catalog = ServiceCatalog::new(&state);
    let services = catalog.list_services(&query, auth.token()).await?;

    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn assign_service(
    State(state): State<Arc<AppConfig>>,
    Path(dentist_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AssignServiceRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "assign services")?;

    let catalog = ServiceCatalog::new(&state);
    let assignment = catalog.assign_service(dentist_id, &request, auth.token()).await?;

    Ok(Json(json!({
        "dentist_id": dentist_id,
        "assignment": assignment,
        "bookable": assignment.is_bookable()
    })))
}

pub async fn remove_service(
    State(state): State<Arc<AppConfig>>,
    Path((dentist_id, service_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_admin(&user, "remove services")?;

    let catalog = ServiceCatalog::new(&state);
    catalog.remove_service(dentist_id, service_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
