//! Shared helpers for driving the full router in memory.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use web_lib::config::Config;
use web_lib::web::{build_router, AppState};

pub fn test_app() -> (Router, Arc<AppState>) {
    let config = Config::from_lookup(|key: &str| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        "COOKIE_SECURE" => Some("false".to_string()),
        _ => None,
    })
    .expect("test configuration is valid");
    let state = Arc::new(AppState::in_memory(config));
    (build_router(state.clone()), state)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub fn get(uri: &str, cookies: &str) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookies: &str, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` for a cookie the response sets, if any.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
        .find(|pair| pair.starts_with(&format!("{name}=")))
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Signs up through the login page and returns the session cookie pair.
pub async fn sign_up(app: &Router, email: &str, password: &str) -> String {
    let form = format!(
        "mode=signup&email={}&password={}",
        urlencoding::encode(email),
        urlencoding::encode(password)
    );
    let response = send(app, post_form("/login", "", &form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    set_cookie(&response, "readmate_session").expect("sign-up sets the session cookie")
}
