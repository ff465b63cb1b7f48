mod common;

use axum::http::StatusCode;
use common::*;

fn first_book_id(body: &str) -> String {
    let start = body.find("action=\"/books/").expect("a book row") + "action=\"/books/".len();
    let rest = &body[start..];
    rest[..rest.find('/').unwrap()].to_string()
}

#[tokio::test]
async fn protected_pages_redirect_to_login_when_signed_out() {
    let (app, _) = test_app();

    for path in ["/", "/manage", "/dashboard", "/no-such-page"] {
        let response = send(&app, get(path, "")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response).as_deref(), Some("/login"), "{path}");
    }

    let response = send(&app, get("/login", "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Welcome Back"));
}

#[tokio::test]
async fn sign_up_then_manage_succeeds() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;

    let response = send(&app, get("/manage", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Manage Books"));
    assert!(body.contains("Account created successfully!"));

    // The flash is shown once.
    let body = body_text(send(&app, get("/manage", &cookie)).await).await;
    assert!(!body.contains("Account created successfully!"));
}

#[tokio::test]
async fn failed_sign_in_shows_the_provider_message() {
    let (app, _) = test_app();
    sign_up(&app, "reader@example.com", "secret1").await;

    let response = send(&app, post_form("/login", "", "mode=signin&email=reader%40example.com&password=nope123")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "readmate_session").is_none());
    let body = body_text(response).await;
    assert!(body.contains("Authentication Failed"));
    assert!(body.contains("The email or password is incorrect."));

    let body = body_text(send(&app, post_form("/login", "", "mode=signin&email=&password=")).await).await;
    assert!(body.contains("Please fill in all fields"));
}

#[tokio::test]
async fn a_session_from_elsewhere_is_restored_before_rendering() {
    let (app, state) = test_app();
    let session = state.identity.sign_up("reader@example.com", "secret1").await.unwrap();
    let cookie = format!("readmate_session={}", session.token);

    let response = send(&app, get("/dashboard", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("reader"));
}

#[tokio::test]
async fn stale_cookies_are_cleared() {
    let (app, _) = test_app();
    let response = send(&app, get("/", "readmate_session=bogus")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/login"));
    assert_eq!(set_cookie(&response, "readmate_session").as_deref(), Some("readmate_session="));
}

#[tokio::test]
async fn added_books_show_up_everywhere() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;

    let response = send(&app, post_form("/manage", &cookie, "title=Dune&author=Frank+Herbert&status=To+Read&notes=")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Book added successfully!"));
    assert!(body.contains("Dune"));

    send(&app, post_form("/manage", &cookie, "title=Foundation&author=Isaac+Asimov&status=Reading&notes=")).await;

    let body = body_text(send(&app, get("/?sort=title", &cookie)).await).await;
    let dune = body.find("Dune").unwrap();
    let foundation = body.find("Foundation").unwrap();
    assert!(dune < foundation);

    let body = body_text(send(&app, get("/?search=asimov", &cookie)).await).await;
    assert!(body.contains("Foundation"));
    assert!(!body.contains("Dune"));

    let body = body_text(send(&app, get("/dashboard", &cookie)).await).await;
    assert!(body.contains("Total: <strong>2</strong>"));
    assert!(body.contains("Reading: <strong>1</strong>"));
}

#[tokio::test]
async fn missing_title_keeps_the_form() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;

    let body = body_text(send(&app, post_form("/manage", &cookie, "title=+&author=Frank+Herbert&status=To+Read&notes=")).await).await;
    assert!(body.contains("Missing details"));
    assert!(body.contains("value=\"Frank Herbert\""));
}

#[tokio::test]
async fn status_updates_persist_but_scratch_notes_do_not() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;
    send(&app, post_form("/manage", &cookie, "title=Dune&author=Frank+Herbert&status=To+Read&notes=")).await;

    let body = body_text(send(&app, get("/", &cookie)).await).await;
    let id = first_book_id(&body);

    let body = body_text(send(&app, post_form(&format!("/books/{id}/status"), &cookie, "status=Completed")).await).await;
    assert!(body.contains("Status updated!"));

    let body = body_text(send(&app, post_form(&format!("/books/{id}/notes"), &cookie, "notes=only+here")).await).await;
    assert!(body.contains("Scratch note saved"));
    assert!(body.contains("only here"));

    // Mounting again reloads from the store.
    let body = body_text(send(&app, get("/", &cookie)).await).await;
    assert!(!body.contains("only here"));
    assert!(body.contains("badge completed"));

    let body = body_text(send(&app, post_form(&format!("/books/{id}/delete"), &cookie, "")).await).await;
    assert!(body.contains("Book deleted"));
    assert!(body.contains("Showing 0 of 0 books"));
}

#[tokio::test]
async fn theme_choice_persists_in_a_cookie() {
    let (app, _) = test_app();
    let session = sign_up(&app, "reader@example.com", "secret1").await;

    let body = body_text(send(&app, get("/dashboard", &session)).await).await;
    assert!(body.contains("theme-sunset"));

    let response = send(&app, post_form("/dashboard/theme", &session, "theme=forest")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let theme = set_cookie(&response, "readmate-theme").expect("theme cookie");
    assert_eq!(theme, "readmate-theme=forest");
    assert!(body_text(response).await.contains("theme-forest"));

    // A reload with the cookie keeps the theme.
    let cookies = format!("{session}; {theme}");
    let body = body_text(send(&app, get("/dashboard", &cookies)).await).await;
    assert!(body.contains("theme-forest"));

    let body = body_text(send(&app, post_form("/dashboard/theme", &cookies, "theme=neon")).await).await;
    assert!(body.contains("That theme is not available."));
}

#[tokio::test]
async fn unknown_paths_render_not_found() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;

    let response = send(&app, get("/nowhere", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("Nothing lives at"));
    assert!(body.contains("nowhere"));
}

#[tokio::test]
async fn logout_revokes_access_immediately() {
    let (app, state) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;
    assert_eq!(state.devices.len(), 1);

    let response = send(&app, post_form("/logout", &cookie, "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("You have been logged out successfully."));
    assert!(state.devices.is_empty());

    let response = send(&app, get("/manage", &cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/login"));
}

#[tokio::test]
async fn password_reset_pages() {
    let (app, _) = test_app();
    sign_up(&app, "reader@example.com", "secret1").await;

    let body = body_text(send(&app, post_form("/login/reset", "", "email=reader%40example.com")).await).await;
    assert!(body.contains("Check your inbox"));

    let body = body_text(send(&app, post_form("/login/reset/confirm", "", "token=made-up&password=another1")).await).await;
    assert!(body.contains("That password reset link is invalid or has expired."));
}

#[tokio::test]
async fn federated_sign_in_reports_missing_configuration() {
    let (app, _) = test_app();
    let body = body_text(send(&app, get("/login/federated", "")).await).await;
    assert!(body.contains("Authentication Failed"));
    assert!(body.contains("federated sign-in is not configured"));
}

#[tokio::test]
async fn scratch_notes_survive_list_control_changes() {
    let (app, _) = test_app();
    let cookie = sign_up(&app, "reader@example.com", "secret1").await;
    send(&app, post_form("/manage", &cookie, "title=Dune&author=Frank+Herbert&status=To+Read&notes=")).await;

    let id = first_book_id(&body_text(send(&app, get("/", &cookie)).await).await);
    send(&app, post_form(&format!("/books/{id}/notes"), &cookie, "notes=scratchpad")).await;

    let body = body_text(send(&app, get("/?sort=title", &cookie)).await).await;
    assert!(body.contains("scratchpad"));
    let body = body_text(send(&app, get("/?search=dune&status=All&sort=dateAdded", &cookie)).await).await;
    assert!(body.contains("scratchpad"));

    let body = body_text(send(&app, get("/", &cookie)).await).await;
    assert!(!body.contains("scratchpad"));
}

#[tokio::test]
async fn signing_in_again_retires_the_previous_session() {
    let (app, state) = test_app();
    let old = sign_up(&app, "reader@example.com", "secret1").await;
    assert_eq!(state.devices.len(), 1);

    let response = send(&app, post_form("/login", &old, "mode=signin&email=reader%40example.com&password=secret1")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let new = set_cookie(&response, "readmate_session").expect("a fresh session cookie");
    assert_ne!(new, old);
    assert_eq!(state.devices.len(), 1);

    let response = send(&app, get("/manage", &old)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/login"));

    let response = send(&app, get("/manage", &new)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
