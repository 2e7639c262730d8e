use tokio::sync::watch;
use tracing::debug;

use eventease_api::{AuthService, AuthState};
use eventease_types::api::Session;

use crate::error::LiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    Dashboard,
}

/// What a page should do given the current auth state.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// The persisted session is still being checked.
    Loading,
    Redirect(Route),
    Allow(Session),
}

/// Follows the auth-state stream and gates protected pages on it.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    rx: watch::Receiver<AuthState>,
}

impl SessionGuard {
    pub fn new(rx: watch::Receiver<AuthState>) -> Self {
        Self { rx }
    }

    pub fn for_auth(auth: &AuthService) -> Self {
        Self::new(auth.on_auth_state_change())
    }

    /// Gate for protected pages: signed-out users go to the auth page.
    pub fn gate(&self) -> Gate {
        match &*self.rx.borrow() {
            AuthState::Restoring => Gate::Loading,
            AuthState::SignedOut => Gate::Redirect(Route::Auth),
            AuthState::SignedIn(session) => Gate::Allow(session.clone()),
        }
    }

    /// Where the auth page should send the user instead of rendering, if
    /// anywhere.
    pub fn auth_page_redirect(&self) -> Option<Route> {
        matches!(*self.rx.borrow(), AuthState::SignedIn(_)).then_some(Route::Dashboard)
    }

    /// Wait until the auth state is known and return the session.
    pub async fn wait_for_session(&mut self) -> Result<Session, LiveError> {
        let state = self
            .rx
            .wait_for(|s| *s != AuthState::Restoring)
            .await
            .map_err(|_| LiveError::Unauthenticated)?;

        match &*state {
            AuthState::SignedIn(session) => Ok(session.clone()),
            _ => {
                debug!("No session, redirecting to {:?}", Route::Auth);
                Err(LiveError::Unauthenticated)
            }
        }
    }
}
