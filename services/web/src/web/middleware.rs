//! services/web/src/web/middleware.rs
//!
//! Authentication middleware for the HTML pages and for the JSON API.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use readmate_core::routing::{guard, Navigation, Route};
use readmate_core::SessionState;
use std::sync::Arc;
use tracing::{debug, error};

use crate::web::cookies::{removal, SESSION_COOKIE};
use crate::web::state::AppState;

/// Gates every page on the device's session.
///
/// A device whose session is still being restored is held until the restore
/// settles; it is never sent to the login page while the answer is unknown.
/// Signed-in requests get the device's `Arc<DeviceContext>` in their
/// extensions.
pub async fn page_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let route = Route::from_path(req.uri().path());
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let device = token.as_deref().map(|t| state.devices.attach(t));

    let mut session = device
        .as_ref()
        .map(|d| d.session.current())
        .unwrap_or(SessionState::SignedOut);
    if let (Navigation::Wait, Some(device)) = (guard(route, &session), &device) {
        session = device.session.settled().await;
    }
    if let SessionState::SignedIn(auth) = &session {
        if auth.expires_at <= Utc::now() {
            debug!("Session for user {} expired", auth.user.id);
            session = SessionState::SignedOut;
        }
    }

    // A cookie that no longer names a live session is dropped on the way out.
    let stale = match (&token, &session) {
        (Some(token), SessionState::SignedOut) => {
            state.devices.remove(token);
            true
        }
        _ => false,
    };
    let jar = if stale { jar.remove(removal(SESSION_COOKIE, "/")) } else { jar };

    match guard(route, &session) {
        Navigation::Render(_) => {
            if let (SessionState::SignedIn(_), Some(device)) = (&session, device) {
                req.extensions_mut().insert(device);
            }
            (jar, next.run(req).await).into_response()
        }
        Navigation::Redirect(to) => (jar, Redirect::to(to.path())).into_response(),
        // `settled` never yields `Unknown`.
        Navigation::Wait => (jar, Redirect::to(req.uri().path())).into_response(),
    }
}

/// Takes the token from `Authorization: Bearer ...`, else from the session cookie.
pub(crate) fn request_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
}

/// Middleware that validates the API caller's token.
///
/// If valid, inserts the `AuthSession` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request_token(req.headers(), &jar).ok_or(StatusCode::UNAUTHORIZED)?;

    let session = state
        .identity
        .resume(&token)
        .await
        .map_err(|e| {
            error!("Failed to validate auth session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
