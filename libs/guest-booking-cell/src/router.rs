use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::scratch::ScratchStore;

#[derive(Clone)]
pub struct GuestBookingState {
    pub config: Arc<AppConfig>,
    pub scratch: Arc<dyn ScratchStore>,
}

pub fn guest_booking_routes(state: GuestBookingState) -> Router {
    let public_routes = Router::new()
        .route("/{session_id}/intent", post(handlers::save_intent).get(handlers::get_intent))
        .route("/{session_id}", delete(handlers::discard_intent))
        .route("/{session_id}/login", post(handlers::complete_with_login))
        .route("/{session_id}/register", post(handlers::complete_with_registration));

    let protected_routes = Router::new()
        .route("/{session_id}/resume", post(handlers::resume_booking))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
