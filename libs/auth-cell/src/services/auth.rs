use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{ClinicApiClient, DatabaseError};

use crate::error::AuthError;
use crate::models::{AuthSession, LoginCredentials, RegisterProfile};

const MIN_PASSWORD_LENGTH: usize = 6;

pub struct AuthService {
    client: ClinicApiClient,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        validate_email(&credentials.email)?;
        if credentials.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        debug!("Signing in {}", credentials.email);

        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
        });

        let session: AuthSession = self.client
            .request(Method::POST, "/auth/v1/token?grant_type=password", None, Some(body))
            .await
            .map_err(|e| match e {
                DatabaseError::InvalidInput(_) | DatabaseError::Unauthorized(_) => {
                    warn!("Rejected sign-in for {}", credentials.email);
                    AuthError::InvalidCredentials
                }
                other => AuthError::Backend(other),
            })?;

        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    pub async fn register(&self, profile: &RegisterProfile) -> Result<AuthSession, AuthError> {
        validate_email(&profile.email)?;
        validate_password(&profile.password)?;
        if profile.first_name.trim().is_empty() || profile.last_name.trim().is_empty() {
            return Err(AuthError::Validation("First and last name are required".to_string()));
        }

        debug!("Registering {}", profile.email);

        let body = json!({
            "email": profile.email,
            "password": profile.password,
            "data": {
                "first_name": profile.first_name,
                "last_name": profile.last_name,
                "phone": profile.phone,
                "date_of_birth": profile.date_of_birth,
                "role": "patient",
            }
        });

        let response: Value = self.client
            .request(Method::POST, "/auth/v1/signup", None, Some(body))
            .await
            .map_err(|e| match e {
                DatabaseError::InvalidInput(msg) | DatabaseError::Conflict(msg)
                    if msg.contains("already registered") || msg.contains("already exists") =>
                {
                    AuthError::EmailTaken
                }
                DatabaseError::InvalidInput(msg) => AuthError::Validation(msg),
                other => AuthError::Backend(other),
            })?;

        // Without auto-confirm the backend answers with the bare user and no session.
        if response.get("access_token").is_none() {
            info!("Registered {} pending email confirmation", profile.email);
            return Err(AuthError::ConfirmationRequired);
        }

        let session: AuthSession = serde_json::from_value(response)
            .map_err(|e| AuthError::Backend(DatabaseError::from(e)))?;

        info!("Registered user {}", session.user.id);
        Ok(session)
    }
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .map(|re| re.is_match(email))
        .unwrap_or(false);

    if valid && email.len() <= 254 {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email address".to_string()))
    }
}

/// At least six characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let has = |pattern: &str| {
        Regex::new(pattern)
            .map(|re| re.is_match(password))
            .unwrap_or(false)
    };

    if !(has(r"[A-Z]") && has(r"[a-z]") && has(r"[0-9]")) {
        return Err(AuthError::Validation(
            "Password must contain uppercase, lowercase and a number".to_string(),
        ));
    }

    Ok(())
}
