//! services/web/src/web/auth.rs
//!
//! JSON authentication endpoints: signup, login, logout and password reset.
//! Successful sign-ins return the session token in the body and also set the
//! session cookie, so the same token works as a bearer token or from a browser.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use readmate_core::ports::AuthError;
use readmate_core::AuthSession;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::cookies::{removal, session_cookie, SESSION_COOKIE};
use crate::web::middleware::request_token;
use crate::web::state::AppState;

//=========================================================================================
// Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user_id: session.user.id,
            email: session.user.email,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResetRequest {
    pub token: String,
    pub new_password: String,
}

/// Maps identity failures onto HTTP statuses. The message is the error's own text.
pub(crate) fn auth_error(e: AuthError) -> (StatusCode, String) {
    let status = match &e {
        AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::NotSignedIn => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::InvalidEmail
        | AuthError::WeakPassword(_)
        | AuthError::InvalidResetToken
        | AuthError::Cancelled => StatusCode::BAD_REQUEST,
        AuthError::EmailInUse => StatusCode::CONFLICT,
        AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    if status == StatusCode::BAD_GATEWAY {
        error!("Identity provider failure: {}", e);
    } else {
        warn!("Authentication rejected: {}", e);
    }
    (status, e.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Create an account and sign in.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Malformed email or weak password"),
        (status = 409, description = "An account already exists for that email")
    ),
    tag = "auth"
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state.identity.sign_up(&req.email, &req.password).await.map_err(auth_error)?;
    info!("User {} signed up through the API", session.user.id);

    let jar = jar.add(session_cookie(session.token.clone(), state.config.cookie_secure));
    Ok((StatusCode::CREATED, jar, Json(AuthResponse::from(session))))
}

/// Sign in with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Unknown account or wrong password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state.identity.sign_in(&req.email, &req.password).await.map_err(auth_error)?;

    let jar = jar.add(session_cookie(session.token.clone(), state.config.cookie_secure));
    Ok((jar, Json(AuthResponse::from(session))))
}

/// Revoke the caller's session. Succeeds even without one.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Some(token) = request_token(&headers, &jar) {
        state.identity.sign_out(&token).await.map_err(auth_error)?;
        state.devices.remove(&token);
    }
    Ok((StatusCode::NO_CONTENT, jar.remove(removal(SESSION_COOKIE, "/"))))
}

/// Send a password reset link. Unknown emails get the same answer.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 202, description = "A reset link is on its way if the account exists"),
        (status = 400, description = "Malformed email")
    ),
    tag = "auth"
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.identity.reset_password(&req.email).await.map_err(auth_error)?;
    Ok(StatusCode::ACCEPTED)
}

/// Set a new password with a reset token.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password/confirm",
    request_body = ConfirmResetRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Invalid or expired token, or weak password")
    ),
    tag = "auth"
)]
pub async fn confirm_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmResetRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .identity
        .confirm_password_reset(&req.token, &req.new_password)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}
