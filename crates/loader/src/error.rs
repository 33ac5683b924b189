//! Error types for the object loader

use leafpress_content::ContentError;
use thiserror::Error;

/// Result type alias for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error types for loader operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// Unknown id, uname, type or path, or an object outside the visible status level
    #[error("Not found: {0}")]
    NotFound(String),

    /// Loader configuration, filter or include spec rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failure reported by the content store
    #[error("Store error: {0}")]
    Store(String),
}

impl LoaderError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LoaderError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        LoaderError::InvalidConfiguration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoaderError::NotFound(_))
    }
}

impl From<ContentError> for LoaderError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(what) => LoaderError::NotFound(what),
            ContentError::InvalidConfiguration(msg) => LoaderError::InvalidConfiguration(msg),
            other => LoaderError::Store(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for LoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        LoaderError::InvalidConfiguration(format!("malformed loader configuration: {}", err))
    }
}
