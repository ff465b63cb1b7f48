//! crates/readmate_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete identity provider, document store and
//! device storage it is wired to.

use async_trait::async_trait;
use crate::domain::{AuthSession, Book, BookStatus, NewBook};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// Failures reported by the identity provider. The `Display` text is shown to
/// the user as-is, so it reads as a sentence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("The email or password is incorrect.")]
    InvalidCredentials,
    #[error("There is no account for that email address.")]
    UserNotFound,
    #[error("That email address is badly formatted.")]
    InvalidEmail,
    #[error("An account already exists for that email address.")]
    EmailInUse,
    #[error("Password should be at least {0} characters.")]
    WeakPassword(usize),
    #[error("You need to sign in first.")]
    NotSignedIn,
    #[error("That password reset link is invalid or has expired.")]
    InvalidResetToken,
    #[error("Sign-in was cancelled.")]
    Cancelled,
    #[error("The identity provider could not complete the request: {0}")]
    Provider(String),
}

/// Failures reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Permission denied")]
    PermissionDenied,
    #[error("The store is unavailable: {0}")]
    Unavailable(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// CRUD over the single logical collection of book records. Every operation is
/// scoped by the owner id the caller supplies; whether a record may be touched
/// is the store's access rule, not the caller's.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Stores a new book and returns the id the store assigned. The store also
    /// stamps `date_added` from its own clock.
    async fn add(&self, book: NewBook, owner_id: &str) -> StoreResult<String>;

    /// All of the owner's books, in no particular order.
    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Book>>;

    async fn update_status(&self, owner_id: &str, id: &str, status: BookStatus) -> StoreResult<()>;

    async fn update_notes(&self, owner_id: &str, id: &str, notes: &str) -> StoreResult<()>;

    /// Hard delete. Deleting an id that does not exist is `StoreError::NotFound`.
    async fn delete(&self, owner_id: &str, id: &str) -> StoreResult<()>;
}

/// What the provider sent back to the federated sign-in callback.
#[derive(Debug, Clone, Default)]
pub struct FederatedCallback {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    /// Where to send the user to start the federated flow. `state` is echoed
    /// back to the callback.
    async fn federated_authorize_url(&self, state: &str) -> AuthResult<String>;

    async fn sign_in_federated(&self, callback: &FederatedCallback) -> AuthResult<AuthSession>;

    /// Resolves a previously issued token. `Ok(None)` means the token is
    /// unknown or expired.
    async fn resume(&self, token: &str) -> AuthResult<Option<AuthSession>>;

    /// Revokes a token. Revoking an unknown token succeeds.
    async fn sign_out(&self, token: &str) -> AuthResult<()>;

    async fn reset_password(&self, email: &str) -> AuthResult<()>;

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthResult<()>;
}

/// Small key/value storage local to the user's device.
pub trait DeviceStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

