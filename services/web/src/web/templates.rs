//! services/web/src/web/templates.rs
//!
//! Askama page templates and the small view structs they render. Templates
//! take plain strings and flags; all formatting happens here.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use readmate_core::controllers::{Notice, Tone};
use readmate_core::routing::{Route, NAV_ITEMS};
use readmate_core::{Book, BookStats, BookStatus, SortKey, StatusFilter, Theme};
use tracing::error;

/// Renders a template, or a 500 if it fails.
pub fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response()
        }
    }
}

//=========================================================================================
// Shared Page Chrome
//=========================================================================================

pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

pub struct NoticeView {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            title: notice.title,
            description: notice.description,
            destructive: notice.tone == Tone::Destructive,
        }
    }
}

/// What every page shows around its content.
pub struct Chrome {
    pub title: &'static str,
    pub theme: &'static str,
    pub nav: Vec<NavLink>,
    pub signed_in: bool,
    pub notices: Vec<NoticeView>,
}

impl Chrome {
    pub fn new(title: &'static str, current: Route, theme: Theme, signed_in: bool) -> Self {
        let nav = if signed_in {
            NAV_ITEMS
                .iter()
                .map(|item| NavLink { href: item.route.path(), label: item.label, active: item.route == current })
                .collect()
        } else {
            Vec::new()
        };
        Self { title, theme: theme.id(), nav, signed_in, notices: Vec::new() }
    }

    pub fn with_notices(mut self, notices: impl IntoIterator<Item = Notice>) -> Self {
        self.notices.extend(notices.into_iter().map(NoticeView::from));
        self
    }

    pub fn with_notice(self, notice: Notice) -> Self {
        self.with_notices([notice])
    }
}

//=========================================================================================
// View Structs
//=========================================================================================

pub struct OptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn status_options(current: BookStatus) -> Vec<OptionView> {
    BookStatus::ALL
        .iter()
        .map(|s| OptionView { value: s.as_str(), label: s.as_str(), selected: *s == current })
        .collect()
}

pub fn filter_options(current: StatusFilter) -> Vec<OptionView> {
    std::iter::once(StatusFilter::All)
        .chain(BookStatus::ALL.into_iter().map(StatusFilter::Only))
        .map(|f| OptionView { value: f.as_str(), label: f.as_str(), selected: f == current })
        .collect()
}

pub fn sort_options(current: SortKey) -> Vec<OptionView> {
    [(SortKey::DateAdded, "Date Added"), (SortKey::Title, "Title")]
        .into_iter()
        .map(|(key, label)| OptionView { value: key.as_str(), label, selected: key == current })
        .collect()
}

pub struct BookRow {
    pub id: String,
    pub title: String,
    pub author: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub notes: String,
    pub added: String,
    pub statuses: Vec<OptionView>,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            status: book.status.as_str(),
            status_class: match book.status {
                BookStatus::ToRead => "to-read",
                BookStatus::Reading => "reading",
                BookStatus::Completed => "completed",
            },
            notes: book.notes.clone(),
            added: book.added_at().format("%b %-d, %Y").to_string(),
            statuses: status_options(book.status),
        }
    }
}

pub struct ThemeView {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub selected: bool,
}

pub fn theme_views(current: Theme) -> Vec<ThemeView> {
    Theme::ALL
        .iter()
        .map(|t| ThemeView { id: t.id(), name: t.name(), description: t.description(), selected: *t == current })
        .collect()
}

//=========================================================================================
// Page Templates
//=========================================================================================

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub heading: &'static str,
    pub subheading: &'static str,
    pub submit_label: &'static str,
    pub toggle_label: &'static str,
    pub mode: &'static str,
    pub toggle_mode: &'static str,
    pub email: String,
    pub federated_enabled: bool,
}

#[derive(Template)]
#[template(path = "reset_request.html")]
pub struct ResetRequestTemplate {
    pub chrome: Chrome,
    pub email: String,
}

#[derive(Template)]
#[template(path = "reset_confirm.html")]
pub struct ResetConfirmTemplate {
    pub chrome: Chrome,
    pub token: String,
}

#[derive(Template)]
#[template(path = "all_books.html")]
pub struct AllBooksTemplate {
    pub chrome: Chrome,
    pub search: String,
    pub filters: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
    pub books: Vec<BookRow>,
    pub total: usize,
}

#[derive(Template)]
#[template(path = "manage.html")]
pub struct ManageTemplate {
    pub chrome: Chrome,
    pub title: String,
    pub author: String,
    pub notes: String,
    pub statuses: Vec<OptionView>,
    pub recent: Vec<BookRow>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub email: String,
    pub stats: BookStats,
    pub themes: Vec<ThemeView>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: Chrome,
    pub path: String,
}
