//! crates/readmate_core/src/controllers/all_books.rs
//!
//! The "All Books" page: the whole collection behind search, filter and sort
//! controls.
//!
//! Notes typed on this page are scratch notes. They change the page's own copy
//! of the book and are gone on the next mount; persisted notes are edited from
//! the Manage page.

use super::{deleted_notice, status_updated_notice, ActionError, Notice, Shelf};
use crate::domain::{Book, BookStatus};
use crate::ports::BookRepository;
use crate::session::SessionManager;
use crate::view_model::BookQuery;
use std::sync::Arc;

pub struct AllBooksController {
    books: Arc<dyn BookRepository>,
    shelf: Shelf,
    query: BookQuery,
}

impl AllBooksController {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books, shelf: Shelf::default(), query: BookQuery::default() }
    }

    /// Loads the collection afresh. On failure the previous books stay.
    pub async fn mount(&mut self, session: &SessionManager) -> Result<(), ActionError> {
        self.shelf.follow_session(session);
        self.shelf.load(self.books.as_ref(), session).await.map_err(|e| {
            ActionError::new(
                e,
                Notice::destructive("Error loading books", "Could not fetch books from database."),
            )
        })
    }

    /// Mounts only if the page holds nothing for the current user.
    pub async fn ensure_mounted(&mut self, session: &SessionManager) -> Result<(), ActionError> {
        self.shelf.follow_session(session);
        if self.shelf.is_loaded_for(session) {
            return Ok(());
        }
        self.mount(session).await
    }

    pub fn query(&self) -> &BookQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: BookQuery) {
        self.query = query;
    }

    pub fn books(&self) -> &[Book] {
        self.shelf.books()
    }

    /// The collection as the page shows it right now.
    pub fn visible(&self) -> Vec<Book> {
        self.query.apply(self.shelf.books())
    }

    pub async fn update_status(
        &mut self,
        session: &SessionManager,
        id: &str,
        status: BookStatus,
    ) -> Result<Notice, ActionError> {
        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("update books"))?;

        self.books
            .update_status(&user.id, id, status)
            .await
            .map_err(|e| {
                ActionError::new(
                    e,
                    Notice::destructive("Error updating status", "Unable to update book status."),
                )
            })?;

        self.shelf.set_status(id, status);
        Ok(status_updated_notice())
    }

    /// Changes the notes on this page only.
    pub fn jot_notes(&mut self, id: &str, notes: &str) -> Notice {
        self.shelf.set_notes(id, notes);
        Notice::info(
            "Scratch note saved",
            "Notes on this page stay here until you reload. Use Manage Books to keep them.",
        )
    }

    pub async fn delete(&mut self, session: &SessionManager, id: &str) -> Result<Notice, ActionError> {
        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("delete books"))?;
        let title = self.shelf.find(id).map(|b| b.title.clone());

        self.books.delete(&user.id, id).await.map_err(|e| {
            ActionError::new(
                e,
                Notice::destructive("Error deleting book", "Could not remove book from your list."),
            )
        })?;

        self.shelf.remove(id);
        Ok(deleted_notice(title.as_deref()))
    }
}
