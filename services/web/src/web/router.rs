//! services/web/src/web/router.rs
//!
//! Assembles the full application router: the gated HTML pages, the JSON API
//! and the Swagger UI.

use crate::web::auth::{
    confirm_reset_handler, login_handler, logout_handler, reset_password_handler, signup_handler,
};
use crate::web::middleware::{page_gate, require_auth};
use crate::web::pages;
use crate::web::rest::{
    create_book_handler, delete_book_handler, list_books_handler, stats_handler, update_notes_handler,
    update_status_handler, ApiDoc,
};
use crate::web::state::AppState;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            warn!("Ignoring ALLOWED_ORIGIN '{}': {}", allowed_origin, e);
            cors
        }
    }
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    // HTML pages. The gate also covers the fallback, so unknown paths are
    // only shown as "not found" to signed-in devices.
    let page_routes = Router::new()
        .route("/", get(pages::all_books))
        .route("/books/{id}/status", post(pages::all_books_status))
        .route("/books/{id}/notes", post(pages::all_books_notes))
        .route("/books/{id}/delete", post(pages::all_books_delete))
        .route("/manage", get(pages::manage).post(pages::manage_add))
        .route("/manage/books/{id}/status", post(pages::manage_status))
        .route("/manage/books/{id}/notes", post(pages::manage_notes))
        .route("/manage/books/{id}/delete", post(pages::manage_delete))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/theme", post(pages::dashboard_theme))
        .route("/login", get(pages::login).post(pages::login_submit))
        .route("/login/reset", get(pages::reset_request).post(pages::reset_request_submit))
        .route("/login/reset/confirm", get(pages::reset_confirm).post(pages::reset_confirm_submit))
        .route("/login/federated", get(pages::federated_start))
        .route("/login/federated/callback", get(pages::federated_callback))
        .route("/logout", post(pages::logout))
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), page_gate));

    // Public API routes (no auth required)
    let public_api = Router::new()
        .route("/api/auth/signup", post(signup_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/reset-password", post(reset_password_handler))
        .route("/api/auth/reset-password/confirm", post(confirm_reset_handler));

    // Protected API routes (auth required)
    let protected_api = Router::new()
        .route("/api/books", get(list_books_handler).post(create_book_handler))
        .route("/api/books/{id}", delete(delete_book_handler))
        .route("/api/books/{id}/status", patch(update_status_handler))
        .route("/api/books/{id}/notes", patch(update_notes_handler))
        .route("/api/stats", get(stats_handler))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), require_auth));

    let cors = cors_layer(&app_state.config.allowed_origin);
    let app_router = Router::new()
        .merge(page_routes)
        .merge(public_api)
        .merge(protected_api)
        .layer(cors)
        .with_state(app_state);

    // Merge with the Swagger UI router for a complete application.
    Router::new()
        .merge(app_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
