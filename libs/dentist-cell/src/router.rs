use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn dentist_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/{dentist_id}/availability", get(handlers::get_availability_public))
        .route("/{dentist_id}/working-hours", get(handlers::get_working_hours_public))
        .route("/{dentist_id}/services", get(handlers::get_dentist_services_public));

    let protected_routes = Router::new()
        .route("/catalog", get(handlers::list_services))
        .route("/{dentist_id}/working-hours", put(handlers::set_working_hours))
        .route("/{dentist_id}/services", post(handlers::assign_service))
        .route("/{dentist_id}/services/{service_id}", delete(handlers::remove_service))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
