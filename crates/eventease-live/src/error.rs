use thiserror::Error;

use eventease_api::BackendError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LiveError {
    #[error("Sign in to continue")]
    Unauthenticated,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A form field that failed to parse or validate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Preferences file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
