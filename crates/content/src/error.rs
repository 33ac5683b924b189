//! Error types for the content repository
//!
//! Every store backend reports failures through [`ContentError`], keeping
//! "not found" apart from configuration mistakes so callers can map the
//! former to a 404 without inspecting messages.

use thiserror::Error;

/// Result type alias for content store operations
pub type ContentResult<T> = Result<T, ContentError>;

/// Error types for content store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    /// Object, object type or tree placement could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed filter, include spec, type registry or fixture
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ContentError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ContentError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ContentError::InvalidConfiguration(msg.into())
    }

    /// Check whether this error should surface as a 404-equivalent
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound(_))
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ContentError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ContentError::NotFound("row not found".to_string()),
            other => ContentError::Database(other.to_string()),
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        ContentError::Serialization(err.to_string())
    }
}

// Convert from serde_yaml errors
impl From<serde_yaml::Error> for ContentError {
    fn from(err: serde_yaml::Error) -> Self {
        ContentError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContentError::not_found("object 'home'");
        assert_eq!(err.to_string(), "Not found: object 'home'");
        assert!(err.is_not_found());

        let err = ContentError::invalid("unknown filter strategy 'foo'");
        assert!(err.to_string().contains("unknown filter strategy"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ContentError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
