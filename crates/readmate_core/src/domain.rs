//! crates/readmate_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Books
//=========================================================================================

/// Where a book sits on the reader's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BookStatus {
    #[default]
    ToRead,
    Reading,
    Completed,
}

impl BookStatus {
    pub const ALL: [BookStatus; 3] = [BookStatus::ToRead, BookStatus::Reading, BookStatus::Completed];

    /// The stored and displayed name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::ToRead => "To Read",
            BookStatus::Reading => "Reading",
            BookStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a reading status")]
pub struct UnknownStatus(pub String);

impl FromStr for BookStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "To Read" => Ok(BookStatus::ToRead),
            "Reading" => Ok(BookStatus::Reading),
            "Completed" => Ok(BookStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A book on a user's reading list, as the application layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    /// Always present once read back; a missing stored value becomes "".
    pub notes: String,
    /// ISO-8601, e.g. `2024-05-01T09:30:00.000Z`.
    pub date_added: String,
}

impl Book {
    /// The parsed `date_added`, falling back to the Unix epoch when it does not parse.
    pub fn added_at(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.date_added)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Formats a store timestamp the way the application layer carries it.
pub fn to_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The fields a caller supplies when adding a book. `id`, `date_added` and
/// `owner_id` are filled in by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub notes: Option<String>,
}

/// A required field was left empty on a client-side form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("'{value}' is not a valid {field}")]
    Invalid { field: &'static str, value: String },
}

impl NewBook {
    /// Builds a book from raw form input: trims everything, rejects an empty
    /// title or author, and drops whitespace-only notes.
    pub fn from_form(
        title: &str,
        author: &str,
        status: BookStatus,
        notes: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Required("Title"));
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(ValidationError::Required("Author"));
        }
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            status,
            notes,
        })
    }
}

//=========================================================================================
// Users and Sessions
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

impl User {
    /// The part of the email before `@`, or "Anonymous User".
    pub fn username(&self) -> String {
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("Anonymous User")
            .to_string()
    }
}

// Only used inside identity providers - contains sensitive data.
// `hashed_password` is None for accounts created through a federated provider.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: Option<String>,
}

/// An authenticated session issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Themes
//=========================================================================================

/// Cosmetic colour scheme, persisted on the device rather than in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Sunset,
    Ocean,
    Forest,
    Lavender,
    Golden,
    Cherry,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Sunset,
        Theme::Ocean,
        Theme::Forest,
        Theme::Lavender,
        Theme::Golden,
        Theme::Cherry,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Theme::Sunset => "sunset",
            Theme::Ocean => "ocean",
            Theme::Forest => "forest",
            Theme::Lavender => "lavender",
            Theme::Golden => "golden",
            Theme::Cherry => "cherry",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Sunset => "Sunset",
            Theme::Ocean => "Ocean",
            Theme::Forest => "Forest",
            Theme::Lavender => "Lavender",
            Theme::Golden => "Golden",
            Theme::Cherry => "Cherry",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Theme::Sunset => "Warm sunset colors",
            Theme::Ocean => "Cool ocean blues",
            Theme::Forest => "Natural forest greens",
            Theme::Lavender => "Soft purple tones",
            Theme::Golden => "Rich golden hues",
            Theme::Cherry => "Sweet cherry blossoms",
        }
    }

    pub fn from_id(id: &str) -> Option<Theme> {
        Theme::ALL.into_iter().find(|t| t.id() == id)
    }
}
