pub mod auth;
pub mod backend;
pub mod error;
pub mod local;
pub mod token;

pub use auth::{AuthService, AuthState};
pub use backend::Backend;
pub use error::{AuthError, BackendError};
pub use local::{LocalBackend, Role};
