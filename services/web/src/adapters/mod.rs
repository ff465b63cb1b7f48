pub mod db;
pub mod federated;
pub mod identity;
pub mod memory;

pub use db::DbAdapter;
pub use federated::{FederatedIdentity, FederatedProvider, OAuthClient};
pub use identity::{CredentialStore, LocalIdentityProvider, LogResetNotifier, ResetNotifier};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use readmate_core::domain::{to_iso8601, Book, BookStatus};
use tracing::warn;

/// A book record exactly as a store holds it, before it is normalised for the
/// application layer. Records written by older clients may lack notes or a
/// timestamp.
pub(crate) struct RawBook {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub author: String,
    pub status: String,
    pub notes: Option<String>,
    pub date_added: Option<DateTime<Utc>>,
}

impl RawBook {
    /// Missing notes become "", a missing timestamp becomes now, and an
    /// unrecognised status is read as "To Read".
    pub fn into_book(self) -> Book {
        let status = self.status.parse::<BookStatus>().unwrap_or_else(|e| {
            warn!("Book {} has a bad status: {}", self.id, e);
            BookStatus::ToRead
        });
        Book {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            author: self.author,
            status,
            notes: self.notes.unwrap_or_default(),
            date_added: to_iso8601(self.date_added.unwrap_or_else(Utc::now)),
        }
    }
}
