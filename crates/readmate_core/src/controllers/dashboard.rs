//! crates/readmate_core/src/controllers/dashboard.rs

use super::{ActionError, Notice};
use crate::domain::{Theme, User, ValidationError};
use crate::ports::{BookRepository, DeviceStorage};
use crate::session::SessionManager;
use crate::view_model::BookStats;
use std::sync::Arc;
use tracing::warn;

/// Device storage key holding the selected theme id.
pub const THEME_STORAGE_KEY: &str = "readmate-theme";

/// The theme saved on this device, or the default when none (or an unknown
/// one) is stored.
pub fn current_theme(storage: &dyn DeviceStorage) -> Theme {
    match storage.get(THEME_STORAGE_KEY) {
        Some(id) => Theme::from_id(&id).unwrap_or_else(|| {
            warn!("Ignoring unknown stored theme '{}'", id);
            Theme::default()
        }),
        None => Theme::default(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub profile: Option<User>,
    pub stats: BookStats,
    pub theme: Theme,
}

pub struct DashboardController {
    books: Arc<dyn BookRepository>,
}

impl DashboardController {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books }
    }

    /// Loads the owner's books and summarises them, alongside the profile and
    /// the device's theme.
    pub async fn mount(
        &self,
        session: &SessionManager,
        storage: &dyn DeviceStorage,
    ) -> Result<DashboardView, ActionError> {
        let user = session
            .require_user()
            .map_err(|_| ActionError::sign_in_required("see your dashboard"))?;

        let books = self.books.list_by_owner(&user.id).await.map_err(|e| {
            ActionError::new(
                e,
                Notice::destructive("Error loading books", "Could not fetch books from database."),
            )
        })?;

        Ok(DashboardView {
            profile: Some(user),
            stats: BookStats::from_books(&books),
            theme: current_theme(storage),
        })
    }

    /// Saves the chosen theme on the device.
    pub fn select_theme(&self, storage: &mut dyn DeviceStorage, theme_id: &str) -> Result<Theme, ActionError> {
        let theme = Theme::from_id(theme_id).ok_or_else(|| {
            ActionError::new(
                ValidationError::Invalid { field: "theme", value: theme_id.to_string() },
                Notice::destructive("Error", "That theme is not available."),
            )
        })?;
        storage.set(THEME_STORAGE_KEY, theme.id());
        Ok(theme)
    }
}
