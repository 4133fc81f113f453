use thiserror::Error;

use shared_models::error::ErrorKind;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflicting write rejected: {0}")]
    Conflict(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl DatabaseError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => DatabaseError::InvalidInput(message),
            401 | 403 => DatabaseError::Unauthorized(message),
            404 => DatabaseError::NotFound(message),
            409 => DatabaseError::Conflict(message),
            408 | 429 | 500..=599 => DatabaseError::Unavailable(message),
            _ => DatabaseError::Api { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::InvalidInput(_) => ErrorKind::Validation,
            DatabaseError::Unauthorized(_) => ErrorKind::Auth,
            DatabaseError::NotFound(_) => ErrorKind::NotFound,
            DatabaseError::Conflict(_) => ErrorKind::Conflict,
            DatabaseError::Unavailable(_) => ErrorKind::Transient,
            DatabaseError::Api { .. } | DatabaseError::Decode(_) => ErrorKind::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DatabaseError::Decode(err.to_string())
        } else {
            DatabaseError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_matches!(DatabaseError::from_status(409, "dup".into()), DatabaseError::Conflict(_));
        assert_matches!(DatabaseError::from_status(503, "down".into()), DatabaseError::Unavailable(_));
        assert_matches!(DatabaseError::from_status(401, "no".into()), DatabaseError::Unauthorized(_));
        assert_matches!(DatabaseError::from_status(418, "tea".into()), DatabaseError::Api { status: 418, .. });
    }

    #[test]
    fn only_unavailable_is_transient() {
        assert!(DatabaseError::Unavailable("timeout".into()).is_transient());
        assert!(!DatabaseError::Conflict("dup".into()).is_transient());
        assert!(!DatabaseError::Decode("bad".into()).is_transient());
    }
}
