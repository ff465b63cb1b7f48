//! crates/readmate_core/src/session.rs
//!
//! The identity session manager: wraps an `IdentityProvider` and broadcasts the
//! current session to everything that depends on it.

use crate::domain::{AuthSession, User};
use crate::ports::{AuthError, AuthResult, FederatedCallback, IdentityProvider};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// What is currently known about who is signed in on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The initial check has not finished yet. Routing must wait, not redirect.
    Unknown,
    SignedOut,
    SignedIn(AuthSession),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::SignedIn(session) => Some(&session.user),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }
}

pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// A manager whose state is `Unknown` until `restore` runs.
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_state(identity, SessionState::Unknown)
    }

    /// A manager for a device known to have no session yet.
    pub fn signed_out(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_state(identity, SessionState::SignedOut)
    }

    fn with_state(identity: Arc<dyn IdentityProvider>, initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { identity, state }
    }

    /// A receiver that observes every session change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        match &*self.state.borrow() {
            SessionState::SignedIn(session) => Some(session.token.clone()),
            _ => None,
        }
    }

    /// Waits until the state is no longer `Unknown` and returns it.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(SessionState::is_known).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => SessionState::SignedOut,
        };
        settled
    }

    /// Resolves a token issued earlier. Any failure leaves the device signed out.
    pub async fn restore(&self, token: &str) {
        let next = match self.identity.resume(token).await {
            Ok(Some(session)) => SessionState::SignedIn(session),
            Ok(None) => SessionState::SignedOut,
            Err(e) => {
                warn!("Could not restore session: {}", e);
                SessionState::SignedOut
            }
        };
        self.state.send_replace(next);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<User> {
        let session = self.identity.sign_in(email, password).await?;
        Ok(self.establish(session))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<User> {
        let session = self.identity.sign_up(email, password).await?;
        Ok(self.establish(session))
    }

    pub async fn federated_authorize_url(&self, state: &str) -> AuthResult<String> {
        self.identity.federated_authorize_url(state).await
    }

    pub async fn sign_in_federated(&self, callback: &FederatedCallback) -> AuthResult<User> {
        let session = self.identity.sign_in_federated(callback).await?;
        Ok(self.establish(session))
    }

    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        self.identity.reset_password(email).await
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthResult<()> {
        self.identity.confirm_password_reset(token, new_password).await
    }

    /// Ends the session. Calling it while signed out is a no-op.
    ///
    /// The local state is cleared even when the provider fails to revoke the
    /// token; that failure is still returned to the caller.
    pub async fn logout(&self) -> AuthResult<()> {
        let previous = self.state.send_replace(SessionState::SignedOut);
        let SessionState::SignedIn(session) = previous else {
            return Ok(());
        };
        info!("Signing out user {}", session.user.id);
        self.identity.sign_out(&session.token).await
    }

    /// Requires a signed-in user.
    pub fn require_user(&self) -> AuthResult<User> {
        self.current_user().ok_or(AuthError::NotSignedIn)
    }

    fn establish(&self, session: AuthSession) -> User {
        let user = session.user.clone();
        info!("User {} signed in", user.id);
        self.state.send_replace(SessionState::SignedIn(session));
        user
    }
}
