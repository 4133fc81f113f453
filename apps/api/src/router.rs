use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use dentist_cell::router::dentist_routes;
use guest_booking_cell::{guest_booking_routes, GuestBookingState, ScratchStore};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, scratch: Arc<dyn ScratchStore>) -> Router {
    let guest_state = GuestBookingState {
        config: state.clone(),
        scratch,
    };

    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/dentists", dentist_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/booking/guest", guest_booking_routes(guest_state))
}
