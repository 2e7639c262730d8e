use thiserror::Error;

use eventease_db::SchemaError;

/// Failures reported by a [`crate::backend::Backend`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Duplicate row: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidQuery(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Backend unreachable: {0}")]
    Network(String),
}

impl BackendError {
    /// Map a store error onto the facade taxonomy.
    pub fn classify(err: anyhow::Error) -> Self {
        if let Some(schema) = err.downcast_ref::<SchemaError>() {
            return Self::InvalidQuery(schema.to_string());
        }

        if let Some(rusqlite::Error::SqliteFailure(code, msg)) = err.downcast_ref::<rusqlite::Error>()
        {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            return match code.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Self::Conflict(detail),
                _ if code.code == rusqlite::ErrorCode::ConstraintViolation => {
                    Self::InvalidQuery(detail)
                }
                _ => Self::Store(detail),
            };
        }

        Self::Store(err.to_string())
    }
}

/// Failures reported by [`crate::auth::AuthService`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired access token")]
    InvalidToken,

    #[error("Auth storage error: {0}")]
    Store(String),
}

impl From<AuthError> for BackendError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::InvalidCredentials => Self::Unauthenticated,
            other => Self::Store(other.to_string()),
        }
    }
}
