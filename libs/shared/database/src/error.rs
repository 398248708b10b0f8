use serde::Deserialize;
use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`, surfaced by PostgREST in the error body.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Storage failures, classified only as far as the domain cells need.
///
/// `UniqueViolation` carries the violated constraint's name so callers can
/// tell the race they expect apart from any other duplicate. Everything else
/// is an unclassified fault that callers surface as-is.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Other(String),
}

/// Error body PostgREST returns for a failed statement.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

impl DbError {
    /// Classify a non-success PostgREST response.
    pub fn from_response(status: u16, body: String) -> Self {
        if let Ok(PostgrestError { code: Some(code), message }) = serde_json::from_str(&body) {
            if code == UNIQUE_VIOLATION_CODE {
                let constraint = message
                    .as_deref()
                    .and_then(constraint_name)
                    .map(str::to_string)
                    .unwrap_or(body);
                return DbError::UniqueViolation(constraint);
            }
        }

        match status {
            401 | 403 => DbError::Auth(body),
            404 => DbError::NotFound(body),
            _ => DbError::Api { status, message: body },
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation(_))
    }

    /// Whether this is a unique violation of the named constraint.
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, DbError::UniqueViolation(name) if name == constraint)
    }
}

// `duplicate key value violates unique constraint "name"`
fn constraint_name(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("constraint \"")?;
    rest.split_once('"').map(|(name, _)| name)
}
