use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Actor, Appointment, AppointmentFilter, CancelRequest, CreateAppointmentRequest,
    RescheduleRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;

fn actor_for(user: &User) -> Result<Actor, AppError> {
    Ok(Actor::try_from(user)?)
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.create_appointment(&actor, request, auth.token()).await?;
    Ok(Json(appointment))
}

pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service.list_appointments(&actor, filter, auth.token()).await?;
    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Appointment>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(&actor, appointment_id, auth.token()).await?;
    Ok(Json(appointment))
}

pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .update_status(&actor, appointment_id, request, auth.token())
        .await?;
    Ok(Json(appointment))
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .reschedule_appointment(&actor, appointment_id, request, auth.token())
        .await?;
    Ok(Json(appointment))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    body: Bytes,
) -> Result<Json<Appointment>, AppError> {
    let actor = actor_for(&user)?;
    let booking_service = AppointmentBookingService::new(&state);

    // The body is optional; an empty one means no reason was given.
    let request: CancelRequest = if body.is_empty() {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    let appointment = booking_service
        .cancel(&actor, appointment_id, request.reason.as_deref(), auth.token())
        .await?;
    Ok(Json(appointment))
}
