//! services/web/src/web/pages.rs
//!
//! Handlers for the HTML pages. A GET mounts the page afresh; a POST is an
//! action on the page the device already has mounted, answered by rendering
//! that page again with the action's notice.

use crate::web::cookies::{
    oauth_state_cookie, removal, session_cookie, CookieStorage, OAUTH_STATE_COOKIE, SESSION_COOKIE,
};
use crate::web::device::DeviceContext;
use crate::web::state::AppState;
use crate::web::templates::*;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::CookieJar;
use readmate_core::controllers::{
    current_theme, ActionError, AllBooksController, BookForm, DashboardController, LoginController,
    LoginMode, LoginSuccess, ManageBooksController, Notice,
};
use readmate_core::routing::{log_out, Route};
use readmate_core::{BookQuery, BookStats, BookStatus, FederatedCallback, SessionManager, SortKey, StatusFilter};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

fn theme_of(jar: &CookieJar) -> readmate_core::Theme {
    current_theme(&CookieStorage::new(jar.clone()))
}

fn notice_of(result: Result<Notice, ActionError>) -> Notice {
    result.unwrap_or_else(|e| e.notice)
}

//=========================================================================================
// Login, Sign-up and Password Reset
//=========================================================================================

#[derive(Deserialize, Default)]
pub struct LoginQuery {
    mode: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    mode: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn login_page(
    state: &AppState,
    controller: &LoginController,
    jar: &CookieJar,
    email: String,
    notices: Vec<Notice>,
) -> Response {
    render_template(LoginTemplate {
        chrome: Chrome::new(controller.heading(), Route::Login, theme_of(jar), false).with_notices(notices),
        heading: controller.heading(),
        subheading: controller.subheading(),
        submit_label: controller.submit_label(),
        toggle_label: controller.toggle_label(),
        mode: controller.mode().as_str(),
        toggle_mode: controller.mode().toggled().as_str(),
        email,
        federated_enabled: state.config.federated.is_some(),
    })
}

/// Revokes the session this browser signed in with before, if any, and
/// forgets its device.
async fn retire_previous_session(state: &AppState, jar: &CookieJar) {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return;
    };
    if let Err(e) = state.identity.sign_out(&token).await {
        error!("Failed to revoke the previous session: {}", e);
    }
    state.devices.remove(&token);
}

/// Registers the freshly signed-in session for this device and sends the
/// browser on with the session cookie.
async fn complete_sign_in(
    state: &AppState,
    jar: CookieJar,
    session: SessionManager,
    success: LoginSuccess,
) -> Response {
    retire_previous_session(state, &jar).await;
    let Some(device) = state.devices.adopt(session) else {
        error!("Signed in user {} has no session token", success.user.id);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Sign-in did not produce a session".to_string())
            .into_response();
    };
    let Some(token) = device.session.token() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Sign-in did not produce a session".to_string())
            .into_response();
    };
    device.pages.lock().await.flash(success.notice);

    let jar = jar.add(session_cookie(token, state.config.cookie_secure));
    (jar, Redirect::to(success.redirect.path())).into_response()
}

pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar, Query(query): Query<LoginQuery>) -> Response {
    let mode = query.mode.as_deref().and_then(|m| m.parse::<LoginMode>().ok()).unwrap_or_default();
    login_page(&state, &LoginController::new(mode), &jar, String::new(), Vec::new())
}

pub async fn login_submit(State(state): State<Arc<AppState>>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let mode = form.mode.parse::<LoginMode>().unwrap_or_default();
    let controller = LoginController::new(mode);
    let session = state.devices.anonymous();

    match controller.submit(&session, form.email.trim(), &form.password).await {
        Ok(success) => complete_sign_in(&state, jar, session, success).await,
        Err(e) => login_page(&state, &controller, &jar, form.email, vec![e.notice]),
    }
}

#[derive(Deserialize)]
pub struct ResetRequestForm {
    #[serde(default)]
    email: String,
}

pub async fn reset_request(jar: CookieJar) -> Response {
    render_template(ResetRequestTemplate {
        chrome: Chrome::new("Reset password", Route::Login, theme_of(&jar), false),
        email: String::new(),
    })
}

pub async fn reset_request_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ResetRequestForm>,
) -> Response {
    let notice = notice_of(LoginController::default().request_reset(&state.devices.anonymous(), &form.email).await);
    render_template(ResetRequestTemplate {
        chrome: Chrome::new("Reset password", Route::Login, theme_of(&jar), false).with_notice(notice),
        email: form.email,
    })
}

#[derive(Deserialize, Default)]
pub struct ResetConfirmQuery {
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
pub struct ResetConfirmForm {
    #[serde(default)]
    token: String,
    #[serde(default)]
    password: String,
}

pub async fn reset_confirm(jar: CookieJar, Query(query): Query<ResetConfirmQuery>) -> Response {
    render_template(ResetConfirmTemplate {
        chrome: Chrome::new("Choose a new password", Route::Login, theme_of(&jar), false),
        token: query.token,
    })
}

pub async fn reset_confirm_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ResetConfirmForm>,
) -> Response {
    let controller = LoginController::default();
    match controller.confirm_reset(&state.devices.anonymous(), &form.token, &form.password).await {
        Ok(notice) => login_page(&state, &controller, &jar, String::new(), vec![notice]),
        Err(e) => render_template(ResetConfirmTemplate {
            chrome: Chrome::new("Choose a new password", Route::Login, theme_of(&jar), false).with_notice(e.notice),
            token: form.token,
        }),
    }
}

//=========================================================================================
// Federated Sign-in
//=========================================================================================

#[derive(Deserialize, Default)]
pub struct FederatedQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn federated_start(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let controller = LoginController::default();
    let nonce = Uuid::new_v4().to_string();
    match controller.federated_url(&state.devices.anonymous(), &nonce).await {
        Ok(url) => {
            let jar = jar.add(oauth_state_cookie(nonce, state.config.cookie_secure));
            (jar, Redirect::to(&url)).into_response()
        }
        Err(e) => login_page(&state, &controller, &jar, String::new(), vec![e.notice]),
    }
}

pub async fn federated_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<FederatedQuery>,
) -> Response {
    let controller = LoginController::default();
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(removal(OAUTH_STATE_COOKIE, "/login"));

    if query.error.is_none() && (expected.is_none() || expected != query.state) {
        warn!("Federated callback state did not match this browser");
        let notice = Notice::destructive("Authentication Failed", "Sign-in could not be verified. Please try again.");
        return (jar.clone(), login_page(&state, &controller, &jar, String::new(), vec![notice])).into_response();
    }

    let session = state.devices.anonymous();
    let callback = FederatedCallback { code: query.code, error: query.error };
    match controller.complete_federated(&session, &callback).await {
        Ok(success) => complete_sign_in(&state, jar, session, success).await,
        Err(e) => (jar.clone(), login_page(&state, &controller, &jar, String::new(), vec![e.notice])).into_response(),
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
) -> Response {
    let notice = notice_of(log_out(&device.session).await);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.devices.remove(cookie.value());
    }
    let page = login_page(&state, &LoginController::default(), &jar, String::new(), vec![notice]);
    (jar.remove(removal(SESSION_COOKIE, "/")), page).into_response()
}

//=========================================================================================
// All Books
//=========================================================================================

#[derive(Deserialize, Default)]
pub struct ListQuery {
    search: Option<String>,
    status: Option<String>,
    sort: Option<String>,
}

impl ListQuery {
    /// True when the request carries no list controls, i.e. plain navigation.
    fn is_empty(&self) -> bool {
        self.search.is_none() && self.status.is_none() && self.sort.is_none()
    }

    fn to_book_query(&self) -> BookQuery {
        BookQuery {
            search: self.search.clone().unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .and_then(|s| s.parse::<StatusFilter>().ok())
                .unwrap_or_default(),
            sort: self.sort.as_deref().and_then(|s| s.parse::<SortKey>().ok()).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
pub struct NotesForm {
    #[serde(default)]
    notes: String,
}

fn render_all_books(controller: &AllBooksController, jar: &CookieJar, notices: Vec<Notice>) -> Response {
    let query = controller.query();
    render_template(AllBooksTemplate {
        chrome: Chrome::new("All Books", Route::AllBooks, theme_of(jar), true).with_notices(notices),
        search: query.search.clone(),
        filters: filter_options(query.status),
        sorts: sort_options(query.sort),
        books: controller.visible().iter().map(BookRow::from).collect(),
        total: controller.books().len(),
    })
}

fn parse_status(raw: &str, title: &str, description: &str) -> Result<BookStatus, Notice> {
    raw.parse::<BookStatus>().map_err(|e| {
        warn!("Rejected status from form: {}", e);
        Notice::destructive(title, description)
    })
}

pub async fn all_books(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    pages.all_books.set_query(query.to_book_query());
    // Changing the list controls re-filters what the page holds; only plain
    // navigation reloads from the store.
    let loaded = if query.is_empty() {
        pages.all_books.mount(&device.session).await
    } else {
        pages.all_books.ensure_mounted(&device.session).await
    };
    if let Err(e) = loaded {
        notices.push(e.notice);
    }
    render_all_books(&pages.all_books, &jar, notices)
}

pub async fn all_books_status(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.all_books.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    match parse_status(&form.status, "Error updating status", "Unable to update book status.") {
        Ok(status) => notices.push(notice_of(pages.all_books.update_status(&device.session, &id, status).await)),
        Err(notice) => notices.push(notice),
    }
    render_all_books(&pages.all_books, &jar, notices)
}

pub async fn all_books_notes(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<NotesForm>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.all_books.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    notices.push(pages.all_books.jot_notes(&id, &form.notes));
    render_all_books(&pages.all_books, &jar, notices)
}

pub async fn all_books_delete(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.all_books.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    notices.push(notice_of(pages.all_books.delete(&device.session, &id).await));
    render_all_books(&pages.all_books, &jar, notices)
}

//=========================================================================================
// Manage Books
//=========================================================================================

#[derive(Deserialize)]
pub struct AddBookForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    notes: String,
}

fn render_manage(controller: &ManageBooksController, jar: &CookieJar, form: &BookForm, notices: Vec<Notice>) -> Response {
    render_template(ManageTemplate {
        chrome: Chrome::new("Manage Books", Route::ManageBooks, theme_of(jar), true).with_notices(notices),
        title: form.title.clone(),
        author: form.author.clone(),
        notes: form.notes.clone(),
        statuses: status_options(form.status),
        recent: controller.recent().iter().map(BookRow::from).collect(),
    })
}

pub async fn manage(Extension(device): Extension<Arc<DeviceContext>>, jar: CookieJar) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.manage.mount(&device.session).await {
        notices.push(e.notice);
    }
    render_manage(&pages.manage, &jar, &BookForm::default(), notices)
}

pub async fn manage_add(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Form(input): Form<AddBookForm>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.manage.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }

    let status = input.status.parse::<BookStatus>().unwrap_or_else(|_| {
        if !input.status.is_empty() {
            warn!("Unknown status '{}' on the add form, using the default", input.status);
        }
        BookStatus::default()
    });
    let form = BookForm { title: input.title, author: input.author, status, notes: input.notes };

    // A successful add clears the form; a failed one keeps what was typed.
    let form = match pages.manage.add_book(&device.session, &form).await {
        Ok(notice) => {
            notices.push(notice);
            BookForm::default()
        }
        Err(e) => {
            notices.push(e.notice);
            form
        }
    };
    render_manage(&pages.manage, &jar, &form, notices)
}

pub async fn manage_status(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.manage.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    match parse_status(&form.status, "Error", "Failed to update book status. Please try again.") {
        Ok(status) => notices.push(notice_of(pages.manage.update_status(&device.session, &id, status).await)),
        Err(notice) => notices.push(notice),
    }
    render_manage(&pages.manage, &jar, &BookForm::default(), notices)
}

pub async fn manage_notes(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<NotesForm>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.manage.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    notices.push(notice_of(pages.manage.update_notes(&device.session, &id, &form.notes).await));
    render_manage(&pages.manage, &jar, &BookForm::default(), notices)
}

pub async fn manage_delete(
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let mut pages = device.pages.lock().await;
    let mut notices = pages.take_flash();
    if let Err(e) = pages.manage.ensure_mounted(&device.session).await {
        notices.push(e.notice);
    }
    notices.push(notice_of(pages.manage.delete(&device.session, &id).await));
    render_manage(&pages.manage, &jar, &BookForm::default(), notices)
}

//=========================================================================================
// Dashboard
//=========================================================================================

#[derive(Deserialize)]
pub struct ThemeForm {
    #[serde(default)]
    theme: String,
}

async fn render_dashboard(state: &AppState, device: &DeviceContext, jar: CookieJar, notices: Vec<Notice>) -> Response {
    let notices = {
        let mut pages = device.pages.lock().await;
        let mut flashed = pages.take_flash();
        flashed.extend(notices);
        flashed
    };
    let controller = DashboardController::new(state.books.clone());
    let storage = CookieStorage::new(jar.clone());

    let (profile, stats, theme, notices) = match controller.mount(&device.session, &storage).await {
        Ok(view) => (view.profile, view.stats, view.theme, notices),
        Err(e) => {
            let mut notices = notices;
            notices.push(e.notice);
            (device.session.current_user(), BookStats::default(), current_theme(&storage), notices)
        }
    };

    let template = DashboardTemplate {
        chrome: Chrome::new("Dashboard", Route::Dashboard, theme, true).with_notices(notices),
        username: profile.as_ref().map(|u| u.username()).unwrap_or_else(|| "Anonymous User".to_string()),
        email: profile.and_then(|u| u.email).unwrap_or_default(),
        stats,
        themes: theme_views(theme),
    };
    (jar, render_template(template)).into_response()
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
) -> Response {
    render_dashboard(&state, &device, jar, Vec::new()).await
}

pub async fn dashboard_theme(
    State(state): State<Arc<AppState>>,
    Extension(device): Extension<Arc<DeviceContext>>,
    jar: CookieJar,
    Form(form): Form<ThemeForm>,
) -> Response {
    let controller = DashboardController::new(state.books.clone());
    let mut storage = CookieStorage::new(jar);
    let notices = match controller.select_theme(&mut storage, &form.theme) {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.notice],
    };
    render_dashboard(&state, &device, storage.into_jar(), notices).await
}

//=========================================================================================
// Not Found
//=========================================================================================

pub async fn not_found(jar: CookieJar, uri: Uri) -> Response {
    warn!("404 Error: User attempted to access non-existent route: {}", uri.path());
    // Outside /login the gate only lets signed-in devices get this far.
    let signed_in = jar.get(SESSION_COOKIE).is_some();
    let template = NotFoundTemplate {
        chrome: Chrome::new("Page not found", Route::NotFound, theme_of(&jar), signed_in),
        path: uri.path().to_string(),
    };
    (StatusCode::NOT_FOUND, render_template(template)).into_response()
}
