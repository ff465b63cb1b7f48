//! services/web/src/adapters/identity.rs
//!
//! The identity provider the service ships with. Accounts, sessions and reset
//! tokens live in a `CredentialStore` (Postgres or memory); passwords are
//! hashed with Argon2, and sessions are opaque random tokens with an expiry.

use crate::adapters::federated::FederatedProvider;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use readmate_core::domain::{AuthSession, User, UserCredentials};
use readmate_core::ports::{
    AuthError, AuthResult, FederatedCallback, IdentityProvider, StoreError, StoreResult,
};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

//=========================================================================================
// Credential Storage Port
//=========================================================================================

/// A session as the credential store keeps it.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredReset {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when the email is already taken.
    async fn create_user(&self, email: &str, hashed_password: Option<&str>) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>>;
    async fn set_password(&self, user_id: &str, hashed_password: &str) -> StoreResult<()>;
    async fn create_auth_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;
    async fn get_auth_session(&self, token: &str) -> StoreResult<Option<StoredSession>>;
    async fn delete_auth_session(&self, token: &str) -> StoreResult<()>;
    async fn create_reset_token(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;
    /// Removes and returns the token, so it can only be used once.
    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<StoredReset>>;
}

//=========================================================================================
// Reset Link Delivery
//=========================================================================================

#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset_link(&self, email: &str, link: &str) -> AuthResult<()>;
}

/// Writes the reset link to the log. Used until an email transport is wired in.
pub struct LogResetNotifier;

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset_link(&self, email: &str, link: &str) -> AuthResult<()> {
        info!(email = %email, link = %link, "Password reset requested");
        Ok(())
    }
}

//=========================================================================================
// Local Identity Provider
//=========================================================================================

pub struct LocalIdentityProvider {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn ResetNotifier>,
    federated: Option<Arc<dyn FederatedProvider>>,
    session_ttl: Duration,
    reset_ttl: Duration,
    public_base_url: String,
}

impl LocalIdentityProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn ResetNotifier>,
        session_ttl: Duration,
        reset_ttl: Duration,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            federated: None,
            session_ttl,
            reset_ttl,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn with_federated(mut self, provider: Arc<dyn FederatedProvider>) -> Self {
        self.federated = Some(provider);
        self
    }

    async fn issue_session(&self, user: User) -> AuthResult<AuthSession> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        self.store
            .create_auth_session(&token, &user.id, expires_at)
            .await
            .map_err(store_failure)?;
        debug!("Issued a session for user {}", user.id);
        Ok(AuthSession { token, user, expires_at })
    }
}

fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

fn check_strength(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
    }
    Ok(())
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            AuthError::Provider("could not secure the password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> AuthResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Stored password hash is unreadable: {}", e);
        AuthError::Provider("could not verify the password".to_string())
    })?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

fn store_failure(e: StoreError) -> AuthError {
    error!("Credential store failure: {}", e);
    AuthError::Provider(e.to_string())
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email)?;
        let creds = self
            .store
            .get_user_by_email(&email)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::UserNotFound)?;

        // Federated-only accounts have no password to match.
        let hashed = creds.hashed_password.as_deref().ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hashed)? {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_session(creds.user).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email)?;
        check_strength(password)?;
        let hashed = hash_password(password)?;
        let user = self
            .store
            .create_user(&email, Some(&hashed))
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::EmailInUse)?;
        info!("Created account {}", user.id);
        self.issue_session(user).await
    }

    async fn federated_authorize_url(&self, state: &str) -> AuthResult<String> {
        let provider = self
            .federated
            .as_ref()
            .ok_or_else(|| AuthError::Provider("federated sign-in is not configured".to_string()))?;
        Ok(provider.authorize_url(state))
    }

    async fn sign_in_federated(&self, callback: &FederatedCallback) -> AuthResult<AuthSession> {
        let provider = self
            .federated
            .as_ref()
            .ok_or_else(|| AuthError::Provider("federated sign-in is not configured".to_string()))?;

        match (&callback.error, &callback.code) {
            (Some(e), _) if e == "access_denied" => return Err(AuthError::Cancelled),
            (Some(e), _) => return Err(AuthError::Provider(e.clone())),
            (None, None) => return Err(AuthError::Cancelled),
            (None, Some(_)) => {}
        }
        let code = callback.code.as_deref().unwrap_or_default();

        let identity = provider.exchange(code).await?;
        let email = normalize_email(&identity.email)?;

        let existing = self.store.get_user_by_email(&email).await.map_err(store_failure)?;
        let user = match existing {
            Some(creds) => creds.user,
            None => match self.store.create_user(&email, None).await.map_err(store_failure)? {
                Some(user) => {
                    info!("Created federated account {}", user.id);
                    user
                }
                // Lost a race with a concurrent first sign-in for the same email.
                None => self
                    .store
                    .get_user_by_email(&email)
                    .await
                    .map_err(store_failure)?
                    .map(|c| c.user)
                    .ok_or(AuthError::UserNotFound)?,
            },
        };
        self.issue_session(user).await
    }

    async fn resume(&self, token: &str) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.get_auth_session(token).await.map_err(store_failure)? else {
            return Ok(None);
        };
        if stored.expires_at <= Utc::now() {
            debug!("Session for user {} has expired", stored.user.id);
            self.store.delete_auth_session(token).await.map_err(store_failure)?;
            return Ok(None);
        }
        Ok(Some(AuthSession { token: token.to_string(), user: stored.user, expires_at: stored.expires_at }))
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        self.store.delete_auth_session(token).await.map_err(store_failure)
    }

    async fn reset_password(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email)?;
        let Some(creds) = self.store.get_user_by_email(&email).await.map_err(store_failure)? else {
            // Say nothing about whether the account exists.
            debug!("Password reset requested for an unknown email");
            return Ok(());
        };

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.reset_ttl;
        self.store
            .create_reset_token(&token, &creds.user.id, expires_at)
            .await
            .map_err(store_failure)?;

        let link = format!("{}/login/reset/confirm?token={}", self.public_base_url, urlencoding::encode(&token));
        self.notifier.send_reset_link(&email, &link).await
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthResult<()> {
        check_strength(new_password)?;
        let reset = self
            .store
            .take_reset_token(token)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::InvalidResetToken)?;
        if reset.expires_at <= Utc::now() {
            warn!("Expired reset token used for user {}", reset.user_id);
            return Err(AuthError::InvalidResetToken);
        }

        let hashed = hash_password(new_password)?;
        self.store.set_password(&reset.user_id, &hashed).await.map_err(store_failure)?;
        info!("Password updated for user {}", reset.user_id);
        Ok(())
    }
}
