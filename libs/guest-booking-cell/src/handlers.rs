use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::json;
use tracing::error;

use auth_cell::{LoginCredentials, RegisterProfile};
use shared_models::auth::User;
use shared_models::error::{AppError, ErrorKind};

use crate::error::GuestBookingError;
use crate::models::{GuestBookingOutcome, PendingBooking, SaveIntentRequest};
use crate::router::GuestBookingState;
use crate::services::flow::GuestBookingFlow;

/// Like `AppError`, but a failure after sign-in still hands the new session back.
fn failure_response(err: GuestBookingError) -> Response {
    let Some(session) = err.signed_in_session().cloned() else {
        return AppError::from(err).into_response();
    };

    let message = err.to_string();
    let app_error = AppError::from(err);
    let status = app_error.status_code();
    let kind = app_error.kind();

    error!("Error: {}: {}", status, message);

    (
        status,
        Json(json!({
            "error": message,
            "kind": kind,
            "retryable": kind == ErrorKind::Transient,
            "signed_in": true,
            "session": session,
        })),
    )
        .into_response()
}

pub async fn save_intent(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
    Json(request): Json<SaveIntentRequest>,
) -> Result<StatusCode, AppError> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    flow.save_intent(&session_id, request.intent, request.profile).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_intent(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
) -> Result<Json<PendingBooking>, AppError> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    let pending = flow
        .pending_intent(&session_id)
        .await?
        .ok_or(GuestBookingError::NoPendingBooking)?;
    Ok(Json(pending))
}

pub async fn discard_intent(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    flow.discard(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_with_login(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<GuestBookingOutcome>, Response> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    let outcome = flow
        .complete_with_login(&session_id, credentials)
        .await
        .map_err(failure_response)?;
    Ok(Json(outcome))
}

pub async fn complete_with_registration(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
    Json(profile): Json<RegisterProfile>,
) -> Result<Json<GuestBookingOutcome>, Response> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    let outcome = flow
        .complete_with_registration(&session_id, profile)
        .await
        .map_err(failure_response)?;
    Ok(Json(outcome))
}

pub async fn resume_booking(
    State(state): State<GuestBookingState>,
    Path(session_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<GuestBookingOutcome>, Response> {
    let flow = GuestBookingFlow::from_config(&state.config, state.scratch.clone());
    let outcome = flow
        .resume(&session_id, user, auth.token().to_string())
        .await
        .map_err(failure_response)?;
    Ok(Json(outcome))
}
