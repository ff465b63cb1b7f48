//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `BookRepository` port and of the identity provider's `CredentialStore`.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use crate::adapters::identity::{CredentialStore, StoredReset, StoredSession};
use crate::adapters::RawBook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use readmate_core::domain::{Book, BookStatus, NewBook, User, UserCredentials};
use readmate_core::ports::{BookRepository, StoreError, StoreResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Tells apart "no such book" from "someone else's book" after an update
    /// or delete matched no rows.
    async fn missing_or_forbidden(&self, id: Uuid) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await;
        match exists {
            Ok(true) => StoreError::PermissionDenied,
            Ok(false) => StoreError::NotFound(format!("Book {} not found", id)),
            Err(e) => store_error(e),
        }
    }
}

/// Maps driver errors onto the store taxonomy.
fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound(e.to_string()),
        // foreign_key_violation, insufficient_privilege
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("23503") | Some("42501")) => {
            StoreError::PermissionDenied
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn book_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| StoreError::NotFound(format!("Book {} not found", id)))
}

fn owner_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| StoreError::PermissionDenied)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    author: String,
    status: String,
    notes: Option<String>,
    date_added: Option<DateTime<Utc>>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        RawBook {
            id: self.id.to_string(),
            owner_id: self.owner_id.to_string(),
            title: self.title,
            author: self.author,
            status: self.status,
            notes: self.notes,
            date_added: self.date_added,
        }
        .into_book()
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User { id: self.user_id.to_string(), email: Some(self.email) },
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: Uuid,
    email: String,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ResetRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

//=========================================================================================
// `BookRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookRepository for DbAdapter {
    async fn add(&self, book: NewBook, owner: &str) -> StoreResult<String> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO books (owner_id, title, author, status, notes) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(owner_id(owner)?)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.status.as_str())
        .bind(&book.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(id.to_string())
    }

    async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<Book>> {
        // An id that is not a UUID cannot own anything here.
        let Ok(owner) = Uuid::parse_str(owner) else {
            return Ok(Vec::new());
        };
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT id, owner_id, title, author, status, notes, date_added FROM books WHERE owner_id = $1",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_status(&self, owner: &str, id: &str, status: BookStatus) -> StoreResult<()> {
        let id = book_id(id)?;
        let result = sqlx::query("UPDATE books SET status = $1 WHERE id = $2 AND owner_id = $3")
            .bind(status.as_str())
            .bind(id)
            .bind(owner_id(owner)?)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(self.missing_or_forbidden(id).await);
        }
        Ok(())
    }

    async fn update_notes(&self, owner: &str, id: &str, notes: &str) -> StoreResult<()> {
        let id = book_id(id)?;
        let result = sqlx::query("UPDATE books SET notes = $1 WHERE id = $2 AND owner_id = $3")
            .bind(notes)
            .bind(id)
            .bind(owner_id(owner)?)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(self.missing_or_forbidden(id).await);
        }
        Ok(())
    }

    async fn delete(&self, owner: &str, id: &str) -> StoreResult<()> {
        let id = book_id(id)?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id(owner)?)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(self.missing_or_forbidden(id).await);
        }
        Ok(())
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for DbAdapter {
    async fn create_user(&self, email: &str, hashed_password: Option<&str>) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (email, hashed_password) VALUES ($1, $2) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING user_id, email, hashed_password",
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(record.map(|r| r.to_domain().user))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn set_password(&self, user_id: &str, hashed_password: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE user_id = $2")
            .bind(hashed_password)
            .bind(owner_id(user_id)?)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn create_auth_session(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(owner_id(user_id)?)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn get_auth_session(&self, token: &str) -> StoreResult<Option<StoredSession>> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT u.user_id, u.email, s.expires_at \
             FROM auth_sessions s JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(record.map(|r| StoredSession {
            user: User { id: r.user_id.to_string(), email: Some(r.email) },
            expires_at: r.expires_at,
        }))
    }

    async fn delete_auth_session(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn create_reset_token(&self, token: &str, user_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(owner_id(user_id)?)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn take_reset_token(&self, token: &str) -> StoreResult<Option<StoredReset>> {
        let record = sqlx::query_as::<_, ResetRecord>(
            "DELETE FROM password_resets WHERE token = $1 RETURNING user_id, expires_at",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(record.map(|r| StoredReset { user_id: r.user_id.to_string(), expires_at: r.expires_at }))
    }
}
