//! Persistence error types

use thiserror::Error;

/// Failure of a ledger gateway call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PersistenceError {
    pub kind: PersistenceErrorKind,
    pub message: String,
}

impl PersistenceError {
    pub fn new(kind: PersistenceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Timeout, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Auth, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::InvalidRequest, message)
    }

    pub fn stale_selection(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::StaleSelection, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(PersistenceErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from the store
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!("Authentication failed: {body}")),
            429 => Self::rate_limit(format!("Rate limited: {body}")),
            400..=499 => Self::invalid_request(format!("Rejected ({status}): {body}")),
            500..=599 => Self::server_error(format!("Server error ({status}): {body}")),
            _ => Self::unknown(format!("Unexpected status {status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::invalid_request(format!("Malformed response: {e}"))
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Error classification, for logs and user-facing wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    /// Connection failures
    Network,
    /// Call exceeded the configured bound
    Timeout,
    /// Credentials rejected (401, 403)
    Auth,
    /// Rate limited (429)
    RateLimit,
    /// Store-side failure (5xx)
    ServerError,
    /// Bad request or unreadable response
    InvalidRequest,
    /// The row picked from a listing moved or changed before the action ran
    StaleSelection,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            PersistenceError::from_status(401, "").kind,
            PersistenceErrorKind::Auth
        );
        assert_eq!(
            PersistenceError::from_status(403, "").kind,
            PersistenceErrorKind::Auth
        );
        assert_eq!(
            PersistenceError::from_status(429, "").kind,
            PersistenceErrorKind::RateLimit
        );
        assert_eq!(
            PersistenceError::from_status(400, "bad range").kind,
            PersistenceErrorKind::InvalidRequest
        );
        assert_eq!(
            PersistenceError::from_status(503, "").kind,
            PersistenceErrorKind::ServerError
        );
    }
}
