use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::{AppError, ErrorKind};

#[derive(Error, Debug)]
pub enum DentistError {
    #[error("Invalid working hours: {0}")]
    InvalidWorkingHours(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Service {service_id} is not offered by this dentist")]
    ServiceNotOffered { service_id: Uuid },

    #[error("Service {0} does not exist")]
    ServiceNotFound(Uuid),

    #[error("Dentist {dentist_id} has no assignment for service {service_id}")]
    AssignmentNotFound { dentist_id: Uuid, service_id: Uuid },

    #[error("Invalid service assignment: {0}")]
    InvalidAssignment(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Schedule data is temporarily unavailable: {0}")]
    Transient(String),

    #[error(transparent)]
    Backend(DatabaseError),
}

impl DentistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DentistError::InvalidWorkingHours(_)
            | DentistError::InvalidRange(_)
            | DentistError::ServiceNotOffered { .. }
            | DentistError::InvalidAssignment(_) => ErrorKind::Validation,
            DentistError::ServiceNotFound(_) | DentistError::AssignmentNotFound { .. } => ErrorKind::NotFound,
            DentistError::Forbidden(_) => ErrorKind::Forbidden,
            DentistError::Transient(_) => ErrorKind::Transient,
            DentistError::Backend(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for DentistError {
    fn from(err: DatabaseError) -> Self {
        if err.is_transient() {
            DentistError::Transient(err.to_string())
        } else {
            DentistError::Backend(err)
        }
    }
}

impl From<DentistError> for AppError {
    fn from(err: DentistError) -> Self {
        AppError::from_kind(err.kind(), err.to_string())
    }
}
