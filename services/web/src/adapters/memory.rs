//! services/web/src/adapters/memory.rs
//!
//! An in-process store for books and credentials. Selected with
//! `STORE_BACKEND=memory` and used by the test suites; nothing survives a
//! restart.

use crate::adapters::identity::{CredentialStore, StoredReset, StoredSession};
use crate::adapters::RawBook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use readmate_core::domain::{Book, BookStatus, NewBook, User, UserCredentials};
use readmate_core::ports::{BookRepository, StoreError, StoreResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredBook {
    id: String,
    owner_id: String,
    title: String,
    author: String,
    status: String,
    notes: Option<String>,
    date_added: Option<DateTime<Utc>>,
}

impl StoredBook {
    fn to_domain(&self) -> Book {
        RawBook {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            status: self.status.clone(),
            notes: self.notes.clone(),
            date_added: self.date_added,
        }
        .into_book()
    }
}

#[derive(Default)]
struct Inner {
    books: Vec<StoredBook>,
    // keyed by lowercase email
    users: HashMap<String, UserCredentials>,
    sessions: HashMap<String, (String, DateTime<Utc>)>,
    resets: HashMap<String, StoredReset>,
}

impl Inner {
    fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.values().map(|c| &c.user).find(|u| u.id == user_id)
    }

    /// Finds a book the owner may touch, or says why not.
    fn owned_book_mut(&mut self, owner_id: &str, id: &str) -> StoreResult<&mut StoredBook> {
        let book = self
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Book {} not found", id)))?;
        if book.owner_id != owner_id {
            return Err(StoreError::PermissionDenied);
        }
        Ok(book)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn add(&self, book: NewBook, owner_id: &str) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.inner.write().await.books.push(StoredBook {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            title: book.title,
            author: book.author,
            status: book.status.as_str().to_string(),
            notes: book.notes,
            date_added: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.iter().filter(|b| b.owner_id == owner_id).map(StoredBook::to_domain).collect())
    }

    async fn update_status(&self, owner_id: &str, id: &str, status: BookStatus) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.owned_book_mut(owner_id, id)?.status = status.as_str().to_string();
        Ok(())
    }

    async fn update_notes(&self, owner_id: &str, id: &str, notes: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.owned_book_mut(owner_id, id)?.notes = Some(notes.to_string());
        Ok(())
    }

    async fn delete(&self, owner_id: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.owned_book_mut(owner_id, id)?;
        inner.books.retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, email: &str, hashed_password: Option<&str>) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(email) {
            return Ok(None);
        }
        let user = User { id: Uuid::new_v4().to_string(), email: Some(email.to_string()) };
        inner.users.insert(
            email.to_string(),
            UserCredentials { user: user.clone(), hashed_password: hashed_password.map(str::to_string) },
        );
        Ok(Some(user))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(self.inner.read().await.users.get(email).cloned())
    }

    async fn set_password(&self, user_id: &str, hashed_password: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let creds = inner
            .users
            .values_mut()
            .find(|c| c.user.id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", user_id)))?;
        creds.hashed_password = Some(hashed_password.to_string());
        Ok(())
    }

    async fn create_auth_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.user_by_id(user_id).is_none() {
            return Err(StoreError::PermissionDenied);
        }
        inner.sessions.insert(token.to_string(), (user_id.to_string(), expires_at));
        Ok(())
    }

    async fn get_auth_session(&self, token: &str) -> StoreResult<Option<StoredSession>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token).and_then(|(user_id, expires_at)| {
            inner
                .user_by_id(user_id)
                .map(|user| StoredSession { user: user.clone(), expires_at: *expires_at })
        }))
    }

    async fn delete_auth_session(&self, token: &str) -> StoreResult<()> {
        self.inner.write().await.sessions.remove(token);
        Ok(())
    }

    async fn create_reset_token(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .resets
            .insert(token.to_string(), StoredReset { user_id: user_id.to_string(), expires_at });
        Ok(())
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<StoredReset>> {
        Ok(self.inner.write().await.resets.remove(token))
    }
}
