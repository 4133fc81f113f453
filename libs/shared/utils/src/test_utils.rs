use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_url: String,
    pub api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            api_url: "http://localhost:54321".to_string(),
            api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn dentist(email: &str) -> Self {
        Self::new(email, "dentist")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::nil())
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned backend rows in the shape the clinic tables return them.
pub struct MockApiResponses;

impl MockApiResponses {
    pub fn working_day_row(dentist_id: &str, day: &str, start: &str, end: &str, is_working: bool) -> serde_json::Value {
        json!({
            "dentist_id": dentist_id,
            "day_of_week": day,
            "start_time": start,
            "end_time": end,
            "is_working": is_working
        })
    }

    /// Monday to Friday 09:00-17:00, weekend explicitly off.
    pub fn default_week_rows(dentist_id: &str) -> serde_json::Value {
        let mut rows = Vec::new();
        for day in ["monday", "tuesday", "wednesday", "thursday", "friday"] {
            rows.push(Self::working_day_row(dentist_id, day, "09:00:00", "17:00:00", true));
        }
        rows.push(Self::working_day_row(dentist_id, "saturday", "09:00:00", "13:00:00", false));
        rows.push(Self::working_day_row(dentist_id, "sunday", "00:00:00", "00:00:00", false));
        json!(rows)
    }

    pub fn appointment_row(
        id: &str,
        patient_id: &str,
        dentist_id: &str,
        service_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "dentist_id": dentist_id,
            "service_id": service_id,
            "date": date,
            "time": time,
            "duration_minutes": 30,
            "notes": null,
            "status": status,
            "idempotency_key": null,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn service_row(service_id: &str, name: &str, default_duration: i32) -> serde_json::Value {
        json!({
            "id": service_id,
            "name": name,
            "category": "General",
            "description": "Routine dental care",
            "default_duration": default_duration,
            "default_price": 80.0,
            "is_active": true
        })
    }

    pub fn dentist_service_row(dentist_id: &str, service_id: &str, custom_duration: Option<i32>) -> serde_json::Value {
        json!({
            "dentist_id": dentist_id,
            "service_id": service_id,
            "custom_price": null,
            "custom_duration": custom_duration,
            "is_offered": true,
            "notes": null,
            "service": Self::service_row(service_id, "Dental Cleaning", 30)
        })
    }

    pub fn auth_session_response(user_id: &str, email: &str, access_token: &str) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {
                "id": user_id,
                "email": email,
                "role": "patient"
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.api_url, "http://localhost:54321");
        assert_eq!(app_config.api_key, "test-api-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::dentist("dr@example.com");
        assert_eq!(user.email, "dr@example.com");
        assert_eq!(user.role, "dentist");

        let user_model = user.to_user();
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
        assert_eq!(user.uuid().to_string(), user.id);
    }

    #[test]
    fn test_default_week_has_seven_rows() {
        let rows = MockApiResponses::default_week_rows("d-1");
        assert_eq!(rows.as_array().map(Vec::len), Some(7));
    }
}
