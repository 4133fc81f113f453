use thiserror::Error;

use appointment_cell::AppointmentError;
use auth_cell::{AuthError, AuthSession};
use shared_models::error::{AppError, ErrorKind};

#[derive(Error, Debug)]
pub enum ScratchStoreError {
    #[error("Scratch store unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GuestBookingError {
    #[error("Invalid guest session id: {0}")]
    InvalidSession(String),

    #[error("Invalid booking intent: {0}")]
    InvalidIntent(String),

    #[error("No pending booking for this session")]
    NoPendingBooking,

    #[error("A booking attempt for this session is already in progress")]
    AttemptInProgress,

    #[error("Sign-in failed: {0}")]
    Authentication(#[source] AuthError),

    #[error("Signed in, but booking failed: {source}")]
    BookingFailedAfterSignIn {
        session: Box<AuthSession>,
        #[source]
        source: AppointmentError,
    },

    #[error(transparent)]
    Store(#[from] ScratchStoreError),
}

impl GuestBookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuestBookingError::InvalidSession(_) | GuestBookingError::InvalidIntent(_) => ErrorKind::Validation,
            GuestBookingError::NoPendingBooking => ErrorKind::NotFound,
            GuestBookingError::AttemptInProgress => ErrorKind::Conflict,
            GuestBookingError::Authentication(e) => e.kind(),
            GuestBookingError::BookingFailedAfterSignIn { source, .. } => source.kind(),
            GuestBookingError::Store(_) => ErrorKind::Transient,
        }
    }

    /// The session obtained before the booking step failed, if sign-in got that far.
    pub fn signed_in_session(&self) -> Option<&AuthSession> {
        match self {
            GuestBookingError::BookingFailedAfterSignIn { session, .. } => Some(session.as_ref()),
            _ => None,
        }
    }
}

impl From<GuestBookingError> for AppError {
    fn from(err: GuestBookingError) -> Self {
        AppError::from_kind(err.kind(), err.to_string())
    }
}
