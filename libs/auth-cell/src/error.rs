use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::{AppError, ErrorKind};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Account created, confirm your email before signing in")]
    ConfirmationRequired,

    #[error(transparent)]
    Backend(#[from] DatabaseError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::InvalidCredentials | AuthError::ConfirmationRequired => ErrorKind::Auth,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::Backend(e) => e.kind(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::from_kind(err.kind(), err.to_string())
    }
}
