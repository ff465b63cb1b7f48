//! services/web/src/web/rest.rs
//!
//! Contains the Axum handlers for the books REST API and the master
//! definition for the OpenAPI specification.

use crate::web::auth;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use readmate_core::domain::to_iso8601;
use readmate_core::ports::StoreError;
use readmate_core::{AuthSession, Book, BookQuery, BookStats, BookStatus, NewBook, SortKey, StatusFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::reset_password_handler,
        auth::confirm_reset_handler,
        list_books_handler,
        create_book_handler,
        update_status_handler,
        update_notes_handler,
        delete_book_handler,
        stats_handler,
    ),
    components(
        schemas(
            auth::CredentialsRequest,
            auth::AuthResponse,
            auth::ResetPasswordRequest,
            auth::ConfirmResetRequest,
            BookResponse,
            CreateBookRequest,
            UpdateStatusRequest,
            UpdateNotesRequest,
            StatsResponse,
        )
    ),
    tags(
        (name = "auth", description = "Accounts and sessions."),
        (name = "books", description = "The signed-in user's reading list.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A book as the API returns it.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    id: String,
    user_id: String,
    title: String,
    author: String,
    /// One of "To Read", "Reading", "Completed".
    status: String,
    notes: String,
    /// ISO-8601.
    date_added: String,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            user_id: book.owner_id,
            title: book.title,
            author: book.author,
            status: book.status.as_str().to_string(),
            notes: book.notes,
            date_added: book.date_added,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    title: String,
    author: String,
    /// Defaults to "To Read".
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateNotesRequest {
    notes: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ListBooksQuery {
    /// Case-insensitive match on title or author.
    search: Option<String>,
    /// "All", "To Read", "Reading" or "Completed".
    status: Option<String>,
    /// "dateAdded" (newest first, the default) or "title".
    sort: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    to_read: usize,
    reading: usize,
    completed: usize,
    total: usize,
}

impl From<BookStats> for StatsResponse {
    fn from(stats: BookStats) -> Self {
        Self { to_read: stats.to_read, reading: stats.reading, completed: stats.completed, total: stats.total }
    }
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::PermissionDenied => StatusCode::FORBIDDEN,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error!("Store request failed: {}", e);
    (status, e.to_string())
}

fn bad_request(e: impl std::fmt::Display) -> (StatusCode, String) {
    warn!("Rejected API request: {}", e);
    (StatusCode::BAD_REQUEST, e.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's books, filtered and sorted.
#[utoipa::path(
    get,
    path = "/api/books",
    params(ListBooksQuery),
    responses(
        (status = 200, description = "The visible books", body = Vec<BookResponse>),
        (status = 400, description = "Unknown status or sort order"),
        (status = 401, description = "Not signed in")
    ),
    tag = "books"
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<ListBooksQuery>,
) -> Result<Json<Vec<BookResponse>>, (StatusCode, String)> {
    let query = BookQuery {
        search: params.search.unwrap_or_default(),
        status: match params.status.as_deref() {
            Some(s) => s.parse::<StatusFilter>().map_err(bad_request)?,
            None => StatusFilter::All,
        },
        sort: match params.sort.as_deref() {
            Some(s) => s.parse::<SortKey>().map_err(bad_request)?,
            None => SortKey::default(),
        },
    };

    let books = app_state.books.list_by_owner(&session.user.id).await.map_err(store_error)?;
    Ok(Json(query.apply(&books).into_iter().map(BookResponse::from).collect()))
}

/// Add a book to the caller's list.
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Missing title or author, or unknown status"),
        (status = 401, description = "Not signed in")
    ),
    tag = "books"
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = match req.status.as_deref() {
        Some(s) => s.parse::<BookStatus>().map_err(bad_request)?,
        None => BookStatus::default(),
    };
    let new_book = NewBook::from_form(&req.title, &req.author, status, req.notes.as_deref()).map_err(bad_request)?;

    let owner_id = session.user.id;
    let id = app_state.books.add(new_book.clone(), &owner_id).await.map_err(store_error)?;
    info!("Created book {} for user {}", id, owner_id);

    let book = Book {
        id,
        owner_id,
        title: new_book.title,
        author: new_book.author,
        status: new_book.status,
        notes: new_book.notes.unwrap_or_default(),
        date_added: to_iso8601(Utc::now()),
    };
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// Change a book's status.
#[utoipa::path(
    patch,
    path = "/api/books/{id}/status",
    request_body = UpdateStatusRequest,
    params(("id" = String, Path, description = "The book id.")),
    responses(
        (status = 204, description = "Status updated"),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "The book belongs to someone else"),
        (status = 404, description = "No such book")
    ),
    tag = "books"
)]
pub async fn update_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let status = req.status.parse::<BookStatus>().map_err(bad_request)?;
    app_state.books.update_status(&session.user.id, &id, status).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a book's notes.
#[utoipa::path(
    patch,
    path = "/api/books/{id}/notes",
    request_body = UpdateNotesRequest,
    params(("id" = String, Path, description = "The book id.")),
    responses(
        (status = 204, description = "Notes updated"),
        (status = 403, description = "The book belongs to someone else"),
        (status = 404, description = "No such book")
    ),
    tag = "books"
)]
pub async fn update_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNotesRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state.books.update_notes(&session.user.id, &id, &req.notes).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a book.
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "The book id.")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "The book belongs to someone else"),
        (status = 404, description = "No such book")
    ),
    tag = "books"
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state.books.delete(&session.user.id, &id).await.map_err(store_error)?;
    info!("Deleted book {} for user {}", id, session.user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Counts of the caller's books by status.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Reading statistics", body = StatsResponse),
        (status = 401, description = "Not signed in")
    ),
    tag = "books"
)]
pub async fn stats_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let books = app_state.books.list_by_owner(&session.user.id).await.map_err(store_error)?;
    Ok(Json(BookStats::from_books(&books).into()))
}
