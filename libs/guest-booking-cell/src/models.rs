use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::{Appointment, CreateAppointmentRequest};
use auth_cell::AuthSession;
use dentist_cell::models::clock_time;

use crate::error::GuestBookingError;

/// The slot a guest picked before signing in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingIntent {
    pub dentist_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingIntent {
    /// Only the shape is checked here; availability is re-checked when the booking is created.
    pub fn validate(&self) -> Result<(), GuestBookingError> {
        if self.time.second() != 0 || self.time.minute() % 30 != 0 {
            return Err(GuestBookingError::InvalidIntent(format!(
                "{} is not on a 30 minute slot boundary",
                self.time.format("%H:%M")
            )));
        }
        if self.notes.as_deref().map(str::len).unwrap_or(0) > 2000 {
            return Err(GuestBookingError::InvalidIntent("notes are too long".to_string()));
        }
        Ok(())
    }

    pub fn to_create_request(&self, idempotency_key: String) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: None,
            dentist_id: self.dentist_id,
            service_id: self.service_id,
            date: self.date,
            time: self.time,
            notes: self.notes.clone(),
            idempotency_key: Some(idempotency_key),
        }
    }
}

/// Registration details kept while the guest finishes the wizard. Never holds the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Marker written before the sign-in call and removed once Create has resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn start() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveIntentRequest {
    pub intent: BookingIntent,
    #[serde(default)]
    pub profile: Option<GuestProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingBooking {
    pub intent: BookingIntent,
    pub profile: Option<GuestProfile>,
    pub attempt_in_progress: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestBookingOutcome {
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn intent(time: &str) -> BookingIntent {
        serde_json::from_value(json!({
            "dentist_id": Uuid::new_v4(),
            "service_id": Uuid::new_v4(),
            "date": "2026-11-02",
            "time": time
        }))
        .unwrap()
    }

    #[test]
    fn intent_accepts_both_clock_formats() {
        assert_eq!(intent("10:30").time, intent("10:30:00").time);
        assert!(intent("10:30").validate().is_ok());
    }

    #[test]
    fn intent_off_the_slot_grid_is_rejected() {
        assert_matches!(intent("10:15").validate(), Err(GuestBookingError::InvalidIntent(_)));
    }

    #[test]
    fn create_request_books_for_the_signed_in_patient() {
        let intent = intent("09:00");
        let request = intent.to_create_request("attempt-1".to_string());
        assert_eq!(request.patient_id, None);
        assert_eq!(request.dentist_id, intent.dentist_id);
        assert_eq!(request.idempotency_key.as_deref(), Some("attempt-1"));
    }
}
