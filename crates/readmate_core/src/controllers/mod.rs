//! crates/readmate_core/src/controllers/mod.rs
//!
//! Page controllers. Each one owns the transient state of a single page and
//! turns user actions into repository or session calls, reporting every
//! outcome as a `Notice` the page can show.

pub mod all_books;
pub mod dashboard;
pub mod login;
pub mod manage;

pub use all_books::AllBooksController;
pub use dashboard::{current_theme, DashboardController, DashboardView, THEME_STORAGE_KEY};
pub use login::{LoginController, LoginMode, LoginSuccess};
pub use manage::{BookForm, ManageBooksController, RECENT_LIMIT};

use crate::domain::{Book, BookStatus, ValidationError};
use crate::ports::{AuthError, BookRepository, StoreError};
use crate::session::SessionManager;
use tracing::{debug, error};

//=========================================================================================
// Notices and Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Destructive,
}

/// A short user-visible message: what happened, and a sentence about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub tone: Tone,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), tone: Tone::Info }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), tone: Tone::Destructive }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A failed page action: the underlying error plus the notice to show for it.
#[derive(Debug, thiserror::Error)]
#[error("{}: {}", .notice.title, .error)]
pub struct ActionError {
    pub notice: Notice,
    #[source]
    pub error: AppError,
}

impl ActionError {
    /// Logs the underlying error and pairs it with the notice.
    pub fn new(error: impl Into<AppError>, notice: Notice) -> Self {
        let error = error.into();
        error!("{}: {}", notice.title, error);
        Self { notice, error }
    }

    /// The notice used whenever an action needs a session and there is none.
    pub(crate) fn sign_in_required(action: &str) -> Self {
        Self::new(
            AuthError::NotSignedIn,
            Notice::destructive("Authentication Required", format!("Please log in to {action}.")),
        )
    }
}

//=========================================================================================
// Shelf: the books a page has loaded
//=========================================================================================

/// The in-memory copy of the owner's books held by a page, plus whose books they are.
#[derive(Debug, Default)]
pub(crate) struct Shelf {
    owner: Option<String>,
    books: Vec<Book>,
}

impl Shelf {
    pub(crate) fn books(&self) -> &[Book] {
        &self.books
    }

    pub(crate) fn is_loaded_for(&self, session: &SessionManager) -> bool {
        match (&self.owner, session.current_user()) {
            (Some(owner), Some(user)) => *owner == user.id,
            _ => false,
        }
    }

    /// Forgets the loaded books if they belong to someone other than the
    /// current user.
    pub(crate) fn follow_session(&mut self, session: &SessionManager) {
        if self.owner.is_some() && !self.is_loaded_for(session) {
            debug!("Session changed; dropping loaded books");
            self.owner = None;
            self.books.clear();
        }
    }

    /// Fetches the current user's books. If the session changed while the
    /// request was in flight, the result is dropped and the shelf is left alone.
    pub(crate) async fn load(
        &mut self,
        repo: &dyn BookRepository,
        session: &SessionManager,
    ) -> Result<(), AppError> {
        let user = session.require_user()?;
        let books = repo.list_by_owner(&user.id).await?;

        if session.current_user().map(|u| u.id) != Some(user.id.clone()) {
            debug!("Discarding books fetched for {}; session moved on", user.id);
            return Ok(());
        }
        self.owner = Some(user.id);
        self.books = books;
        Ok(())
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    pub(crate) fn prepend(&mut self, book: Book) {
        self.books.insert(0, book);
    }

    pub(crate) fn set_status(&mut self, id: &str, status: BookStatus) {
        if let Some(book) = self.books.iter_mut().find(|b| b.id == id) {
            book.status = status;
        }
    }

    pub(crate) fn set_notes(&mut self, id: &str, notes: &str) {
        if let Some(book) = self.books.iter_mut().find(|b| b.id == id) {
            book.notes = notes.to_string();
        }
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.books.retain(|b| b.id != id);
    }
}

/// The "Book deleted" notice names the book when the page knows it.
pub(crate) fn deleted_notice(title: Option<&str>) -> Notice {
    let title = title.unwrap_or("The book");
    Notice::destructive(
        "Book deleted",
        format!("\"{title}\" has been removed from your reading list."),
    )
}

pub(crate) fn status_updated_notice() -> Notice {
    Notice::info("Status updated!", "Book status has been updated successfully.")
}
