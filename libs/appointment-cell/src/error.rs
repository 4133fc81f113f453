use thiserror::Error;
use uuid::Uuid;

use dentist_cell::DentistError;
use shared_database::DatabaseError;
use shared_models::error::{AppError, ErrorKind};

use crate::models::{AppointmentStatus, LifecycleAction};

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("This time slot is already booked, please pick another time")]
    SlotAlreadyBooked,

    #[error("Requested time is outside the dentist's working hours")]
    OutsideWorkingHours,

    #[error("Appointments cannot be booked in the past")]
    InPast,

    #[error("Cannot {action} an appointment that is {from}")]
    InvalidTransition { action: LifecycleAction, from: AppointmentStatus },

    #[error("Cannot move an appointment from {from} to {to}")]
    InvalidStatusChange { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Confirmed appointments cannot be changed within 24 hours of the start time")]
    WithinCutoff,

    #[error("Appointment was changed by someone else, reload and try again")]
    StaleState,

    #[error("Idempotency key was already used for a different booking")]
    IdempotencyKeyReused,

    #[error("Service {0} is not offered by this dentist")]
    ServiceNotOffered(Uuid),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend temporarily unavailable: {0}")]
    Transient(String),

    #[error(transparent)]
    Backend(DatabaseError),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::NotFound => ErrorKind::NotFound,
            AppointmentError::SlotAlreadyBooked
            | AppointmentError::InvalidTransition { .. }
            | AppointmentError::InvalidStatusChange { .. }
            | AppointmentError::WithinCutoff
            | AppointmentError::StaleState
            | AppointmentError::IdempotencyKeyReused => ErrorKind::Conflict,
            AppointmentError::OutsideWorkingHours
            | AppointmentError::InPast
            | AppointmentError::ServiceNotOffered(_)
            | AppointmentError::Validation(_) => ErrorKind::Validation,
            AppointmentError::Forbidden(_) => ErrorKind::Forbidden,
            AppointmentError::Transient(_) => ErrorKind::Transient,
            AppointmentError::Backend(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(_) => AppointmentError::NotFound,
            e if e.is_transient() => AppointmentError::Transient(e.to_string()),
            e => AppointmentError::Backend(e),
        }
    }
}

impl From<DentistError> for AppointmentError {
    fn from(err: DentistError) -> Self {
        match err {
            DentistError::ServiceNotOffered { service_id } => AppointmentError::ServiceNotOffered(service_id),
            DentistError::Transient(msg) => AppointmentError::Transient(msg),
            DentistError::Backend(e) => AppointmentError::from(e),
            DentistError::Forbidden(msg) => AppointmentError::Forbidden(msg),
            other => AppointmentError::Validation(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        AppError::from_kind(err.kind(), err.to_string())
    }
}
