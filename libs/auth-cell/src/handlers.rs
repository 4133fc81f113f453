use std::sync::Arc;

use axum::{
    extract::{State, Json},
    http::HeaderMap,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt;

use crate::models::{AuthSession, LoginCredentials, RegisterProfile};
use crate::services::auth::AuthService;

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<AuthSession>, AppError> {
    let service = AuthService::new(&config);
    let session = service.login(&credentials).await?;
    Ok(Json(session))
}

pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(profile): Json<RegisterProfile>,
) -> Result<Json<AuthSession>, AppError> {
    let service = AuthService::new(&config);
    let session = service.register(&profile).await?;
    Ok(Json(session))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;
    let user = jwt::validate_token(&token, &config.jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}
