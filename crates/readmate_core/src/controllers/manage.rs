//! crates/readmate_core/src/controllers/manage.rs
//!
//! The "Manage Books" page: the add-book form and the most recent additions.

use super::{deleted_notice, status_updated_notice, ActionError, Notice, Shelf};
use crate::domain::{to_iso8601, Book, BookStatus, NewBook};
use crate::ports::BookRepository;
use crate::session::SessionManager;
use chrono::Utc;
use std::sync::Arc;

/// How many books the page lists under "Recent Books".
pub const RECENT_LIMIT: usize = 3;

/// Raw input from the add-book form.
#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub notes: String,
}

pub struct ManageBooksController {
    books: Arc<dyn BookRepository>,
    shelf: Shelf,
}

impl ManageBooksController {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books, shelf: Shelf::default() }
    }

    pub async fn mount(&mut self, session: &SessionManager) -> Result<(), ActionError> {
        self.shelf.follow_session(session);
        self.shelf.load(self.books.as_ref(), session).await.map_err(|e| {
            ActionError::new(e, Notice::destructive("Error", "Failed to load books. Please try again."))
        })
    }

    pub async fn ensure_mounted(&mut self, session: &SessionManager) -> Result<(), ActionError> {
        self.shelf.follow_session(session);
        if self.shelf.is_loaded_for(session) {
            return Ok(());
        }
        self.mount(session).await
    }

    /// The first few books in the page's current order. Newly added books are
    /// prepended, so this is most-recent-first for this visit.
    pub fn recent(&self) -> &[Book] {
        let books = self.shelf.books();
        &books[..books.len().min(RECENT_LIMIT)]
    }

    /// Validates the form, stores the book, and puts it at the top of the
    /// page without fetching the collection again.
    pub async fn add_book(&mut self, session: &SessionManager, form: &BookForm) -> Result<Notice, ActionError> {
        let notes = Some(form.notes.as_str());
        let new_book = NewBook::from_form(&form.title, &form.author, form.status, notes).map_err(|e| {
            ActionError::new(
                e,
                Notice::destructive("Missing details", "Please enter both a title and an author."),
            )
        })?;

        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("add books"))?;

        let id = self
            .books
            .add(new_book.clone(), &user.id)
            .await
            .map_err(|e| ActionError::new(e, Notice::destructive("Error", "Failed to add book. Please try again.")))?;

        let title = new_book.title.clone();
        self.shelf.prepend(Book {
            id,
            owner_id: user.id,
            title: new_book.title,
            author: new_book.author,
            status: new_book.status,
            notes: new_book.notes.unwrap_or_default(),
            date_added: to_iso8601(Utc::now()),
        });

        Ok(Notice::info(
            "Book added successfully!",
            format!("\"{title}\" has been added to your reading list."),
        ))
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

        self.books.update_status(&user.id, id, status).await.map_err(|e| {
            ActionError::new(
                e,
                Notice::destructive("Error", "Failed to update book status. Please try again."),
            )
        })?;

        self.shelf.set_status(id, status);
        Ok(status_updated_notice())
    }

    /// Saves notes to the store, then mirrors them on the page.
    pub async fn update_notes(
        &mut self,
        session: &SessionManager,
        id: &str,
        notes: &str,
    ) -> Result<Notice, ActionError> {
        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("update books"))?;

        self.books.update_notes(&user.id, id, notes).await.map_err(|e| {
            ActionError::new(e, Notice::destructive("Error", "Failed to update notes. Please try again."))
        })?;

        self.shelf.set_notes(id, notes);
        Ok(Notice::info("Notes updated!", "Book notes have been updated successfully."))
    }

    pub async fn delete(&mut self, session: &SessionManager, id: &str) -> Result<Notice, ActionError> {
        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("delete books"))?;
        let title = self.shelf.find(id).map(|b| b.title.clone());

        self.books.delete(&user.id, id).await.map_err(|e| {
            ActionError::new(e, Notice::destructive("Error", "Failed to delete book. Please try again."))
        })?;

        self.shelf.remove(id);
        Ok(deleted_notice(title.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::tests::FakeShelfStore;
    use crate::controllers::AppError;
    use crate::domain::ValidationError;
    use crate::ports::{AuthError, StoreError};
    use crate::session::tests::FakeIdentity;

    fn form(title: &str, author: &str) -> BookForm {
        BookForm { title: title.into(), author: author.into(), ..Default::default() }
    }

    async fn mounted() -> (Arc<FakeShelfStore>, SessionManager, ManageBooksController) {
        let store = Arc::new(FakeShelfStore::default());
        let session = SessionManager::signed_out(Arc::new(FakeIdentity::with_account("a@b.co", "secret1")));
        session.sign_in("a@b.co", "secret1").await.unwrap();
        let mut page = ManageBooksController::new(store.clone());
        page.mount(&session).await.unwrap();
        (store, session, page)
    }

    #[tokio::test]
    async fn adding_prepends_without_refetching() {
        let (store, session, mut page) = mounted().await;

        for title in ["One", "Two", "Three", "Four"] {
            page.add_book(&session, &form(title, "Author")).await.unwrap();
        }
        // Something else writes to the store; the page must not pick it up.
        store.books.lock().unwrap().clear();

        let recent: Vec<&str> = page.recent().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(recent, vec!["Four", "Three", "Two"]);
    }

    #[tokio::test]
    async fn add_stores_trimmed_fields_under_the_owner() {
        let (store, session, mut page) = mounted().await;
        let me = session.current_user().unwrap().id;

        let notice = page
            .add_book(&session, &BookForm {
                title: "  Dune ".into(),
                author: "Frank Herbert ".into(),
                status: BookStatus::ToRead,
                notes: String::new(),
            })
            .await
            .unwrap();

        assert_eq!(notice.title, "Book added successfully!");
        let stored = store.books.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Dune");
        assert_eq!(stored[0].author, "Frank Herbert");
        assert_eq!(stored[0].owner_id, me);
        assert_eq!(stored[0].status, BookStatus::ToRead);
    }

    #[tokio::test]
    async fn blank_title_is_rejected_before_the_store_is_called() {
        let (store, session, mut page) = mounted().await;

        let err = page.add_book(&session, &form("   ", "Someone")).await.unwrap_err();

        assert!(matches!(err.error, AppError::Validation(ValidationError::Required("Title"))));
        assert!(store.books.lock().unwrap().is_empty());
        assert!(page.recent().is_empty());
    }

    #[tokio::test]
    async fn adding_while_signed_out_needs_authentication() {
        let store = Arc::new(FakeShelfStore::default());
        let session = SessionManager::signed_out(Arc::new(FakeIdentity::default()));
        let mut page = ManageBooksController::new(store);

        let err = page.add_book(&session, &form("Dune", "Frank Herbert")).await.unwrap_err();

        assert_eq!(err.notice.title, "Authentication Required");
        assert!(matches!(err.error, AppError::Auth(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn notes_are_persisted_from_this_page() {
        let (store, session, mut page) = mounted().await;
        page.add_book(&session, &form("Dune", "Frank Herbert")).await.unwrap();
        let id = page.recent()[0].id.clone();

        page.update_notes(&session, &id, "re-read the appendix").await.unwrap();

        assert_eq!(page.recent()[0].notes, "re-read the appendix");
        assert_eq!(store.books.lock().unwrap()[0].notes, "re-read the appendix");
    }

    #[tokio::test]
    async fn status_change_touches_only_status() {
        let (store, session, mut page) = mounted().await;
        page.add_book(&session, &BookForm { notes: "keep".into(), ..form("Dune", "Frank Herbert") })
            .await
            .unwrap();
        let before = store.books.lock().unwrap()[0].clone();

        page.update_status(&session, &before.id, BookStatus::Completed).await.unwrap();

        let after = store.books.lock().unwrap()[0].clone();
        assert_eq!(after.status, BookStatus::Completed);
        assert_eq!(Book { status: BookStatus::ToRead, ..after }, before);
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_book_listed() {
        let (store, session, mut page) = mounted().await;
        page.add_book(&session, &form("Dune", "Frank Herbert")).await.unwrap();
        let id = page.recent()[0].id.clone();

        *store.fail_with.lock().unwrap() = Some(StoreError::PermissionDenied);
        let err = page.delete(&session, &id).await.unwrap_err();

        assert_eq!(err.notice.description, "Failed to delete book. Please try again.");
        assert_eq!(page.recent().len(), 1);
    }
}
