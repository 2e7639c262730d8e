use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use eventease_db::Database;
use eventease_db::models::UserRow;
use eventease_types::api::{Claims, Session, SignInRequest, SignUpRequest, User};

use crate::error::AuthError;
use crate::token;

/// Where the auth collaborator stands. Starts at `Restoring` until the
/// persisted session (if any) has been checked.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Restoring,
    SignedOut,
    SignedIn(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

/// Account registry and session holder for the local backend.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    db: Arc<Database>,
    jwt_secret: String,
    hasher: Argon2<'static>,
    state_tx: watch::Sender<AuthState>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, jwt_secret: impl Into<String>) -> Self {
        Self::with_hasher(db, jwt_secret, Argon2::default())
    }

    /// Use custom Argon2id cost parameters (cheaper ones keep tests fast).
    pub fn with_params(db: Arc<Database>, jwt_secret: impl Into<String>, params: Params) -> Self {
        Self::with_hasher(db, jwt_secret, Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn with_hasher(db: Arc<Database>, jwt_secret: impl Into<String>, hasher: Argon2<'static>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Restoring);
        Self {
            inner: Arc::new(AuthInner {
                db,
                jwt_secret: jwt_secret.into(),
                hasher,
                state_tx,
            }),
        }
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> Result<Session, AuthError> {
        let full_name = req.full_name.trim().to_string();
        let email = req.email.trim().to_lowercase();
        validate_sign_up(&full_name, &email, &req.password)?;

        let inner = self.inner.clone();
        let user_id = Uuid::new_v4();
        let (id, mail, name) = (user_id.to_string(), email.clone(), full_name.clone());
        tokio::task::spawn_blocking(move || {
            if inner.db.get_user_by_email(&mail).map_err(store_error)?.is_some() {
                return Err(AuthError::EmailTaken);
            }

            // Hash password with Argon2id
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = inner
                .hasher
                .hash_password(req.password.as_bytes(), &salt)
                .map_err(|e| AuthError::Store(e.to_string()))?
                .to_string();

            inner
                .db
                .create_user(&id, &mail, &password_hash, Some(&name))
                .map_err(insert_error)
        })
        .await
        .map_err(join_error)??;

        info!("Registered account {} ({})", email, user_id);

        let user = User {
            id: user_id,
            email,
            full_name: Some(full_name),
            created_at: Utc::now(),
        };
        self.start_session(user)
    }

    pub async fn sign_in(&self, req: SignInRequest) -> Result<Session, AuthError> {
        let email = req.email.trim().to_lowercase();
        let inner = self.inner.clone();

        let row = tokio::task::spawn_blocking(move || {
            let row = inner
                .db
                .get_user_by_email(&email)
                .map_err(store_error)?
                .ok_or(AuthError::InvalidCredentials)?;

            // Verify password
            let parsed_hash =
                PasswordHash::new(&row.password).map_err(|e| AuthError::Store(e.to_string()))?;
            inner
                .hasher
                .verify_password(req.password.as_bytes(), &parsed_hash)
                .map_err(|_| AuthError::InvalidCredentials)?;

            Ok::<_, AuthError>(row)
        })
        .await
        .map_err(join_error)??;

        let user = user_from_row(&row)?;
        info!("{} signed in", user.email);
        self.start_session(user)
    }

    /// Re-establish a session from a persisted access token. A missing,
    /// invalid or orphaned token resolves to signed out.
    pub async fn restore(&self, access_token: Option<&str>) -> AuthState {
        let state = match access_token {
            None => AuthState::SignedOut,
            Some(token) => match self.session_from_token(token).await {
                Ok(session) => AuthState::SignedIn(session),
                Err(e) => {
                    warn!("Could not restore session: {}", e);
                    AuthState::SignedOut
                }
            },
        };

        self.inner.state_tx.send_replace(state.clone());
        state
    }

    pub fn sign_out(&self) {
        if let AuthState::SignedIn(session) = self.inner.state_tx.send_replace(AuthState::SignedOut) {
            info!("{} signed out", session.user.email);
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state().session().cloned()
    }

    /// Follow sign-in and sign-out transitions.
    pub fn on_auth_state_change(&self) -> watch::Receiver<AuthState> {
        self.inner.state_tx.subscribe()
    }

    pub fn verify(&self, access_token: &str) -> Result<Claims, AuthError> {
        token::verify_token(&self.inner.jwt_secret, access_token).map_err(|_| AuthError::InvalidToken)
    }

    async fn session_from_token(&self, access_token: &str) -> Result<Session, AuthError> {
        let claims = self.verify(access_token)?;
        let inner = self.inner.clone();
        let id = claims.sub.to_string();

        let row = tokio::task::spawn_blocking(move || inner.db.get_user_by_id(&id))
            .await
            .map_err(join_error)?
            .map_err(store_error)?
            .ok_or(AuthError::InvalidToken)?;

        Ok(Session {
            user: user_from_row(&row)?,
            access_token: access_token.to_string(),
            expires_at: DateTime::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now),
        })
    }

    fn start_session(&self, user: User) -> Result<Session, AuthError> {
        let (access_token, expires_at) = token::create_token(&self.inner.jwt_secret, user.id, &user.email)
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let session = Session {
            user,
            access_token,
            expires_at,
        };
        self.inner
            .state_tx
            .send_replace(AuthState::SignedIn(session.clone()));
        Ok(session)
    }
}

fn validate_sign_up(full_name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    let name_len = full_name.chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(AuthError::InvalidInput(
            "Name must be between 2 and 100 characters".into(),
        ));
    }

    if !looks_like_email(email) {
        return Err(AuthError::InvalidInput("Please enter a valid email address".into()));
    }

    if password.chars().count() < 8 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 8 characters".into(),
        ));
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(AuthError::InvalidInput(
            "Password must contain uppercase, lowercase, and number".into(),
        ));
    }

    Ok(())
}

pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn user_from_row(row: &UserRow) -> Result<User, AuthError> {
    let id = row.id.parse::<Uuid>().map_err(|e| {
        error!("Corrupt user id '{}': {}", row.id, e);
        AuthError::Store(e.to_string())
    })?;
    let created_at = row.created_at.parse::<DateTime<Utc>>().map_err(|e| {
        error!("Corrupt created_at '{}' on user '{}': {}", row.created_at, row.id, e);
        AuthError::Store(e.to_string())
    })?;

    Ok(User {
        id,
        email: row.email.clone(),
        full_name: row.full_name.clone(),
        created_at,
    })
}

/// A racing sign-up can pass the email check and still lose on the unique
/// index.
fn insert_error(e: anyhow::Error) -> AuthError {
    if let Some(rusqlite::Error::SqliteFailure(code, _)) = e.downcast_ref::<rusqlite::Error>() {
        if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return AuthError::EmailTaken;
        }
    }
    store_error(e)
}

fn store_error(e: anyhow::Error) -> AuthError {
    AuthError::Store(e.to_string())
}

fn join_error(e: tokio::task::JoinError) -> AuthError {
    error!("spawn_blocking join error: {}", e);
    AuthError::Store(e.to_string())
}
