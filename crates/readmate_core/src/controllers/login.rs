//! crates/readmate_core/src/controllers/login.rs
//!
//! The login page: email/password sign-in and sign-up, federated sign-in, and
//! password reset.

use super::{ActionError, Notice};
use crate::domain::{User, ValidationError};
use crate::ports::FederatedCallback;
use crate::routing::Route;
use crate::session::SessionManager;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMode {
    #[default]
    SignIn,
    SignUp,
}

impl LoginMode {
    pub fn toggled(self) -> Self {
        match self {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMode::SignIn => "signin",
            LoginMode::SignUp => "signup",
        }
    }
}

impl FromStr for LoginMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signin" => Ok(LoginMode::SignIn),
            "signup" => Ok(LoginMode::SignUp),
            other => Err(ValidationError::Invalid { field: "login mode", value: other.to_string() }),
        }
    }
}

/// A completed sign-in: who, what to tell them, and where to go next.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub user: User,
    pub notice: Notice,
    pub redirect: Route,
}

#[derive(Debug, Clone, Default)]
pub struct LoginController {
    mode: LoginMode,
}

impl LoginController {
    pub fn new(mode: LoginMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LoginMode {
        self.mode
    }

    pub fn toggle(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            LoginMode::SignIn => "Welcome Back",
            LoginMode::SignUp => "Create Account",
        }
    }

    pub fn subheading(&self) -> &'static str {
        match self.mode {
            LoginMode::SignIn => "Sign in to your reading companion",
            LoginMode::SignUp => "Join ReadMate today",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            LoginMode::SignIn => "Sign In",
            LoginMode::SignUp => "Create Account",
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            LoginMode::SignIn => "Don't have an account? Sign up",
            LoginMode::SignUp => "Already have an account? Sign in",
        }
    }

    /// Signs in or signs up depending on the mode. Provider errors are shown
    /// to the user word for word.
    pub async fn submit(
        &self,
        session: &SessionManager,
        email: &str,
        password: &str,
    ) -> Result<LoginSuccess, ActionError> {
        if email.is_empty() || password.is_empty() {
            let field = if email.is_empty() { "Email" } else { "Password" };
            return Err(ActionError::new(
                ValidationError::Required(field),
                Notice::destructive("Error", "Please fill in all fields"),
            ));
        }

        let (result, done) = match self.mode {
            LoginMode::SignIn => (session.sign_in(email, password).await, "Logged in successfully!"),
            LoginMode::SignUp => (session.sign_up(email, password).await, "Account created successfully!"),
        };

        let user = result.map_err(authentication_failed)?;
        Ok(LoginSuccess { user, notice: Notice::info("Success!", done), redirect: Route::AllBooks })
    }

    /// The provider URL that starts federated sign-in.
    pub async fn federated_url(&self, session: &SessionManager, state: &str) -> Result<String, ActionError> {
        session.federated_authorize_url(state).await.map_err(authentication_failed)
    }

    pub async fn complete_federated(
        &self,
        session: &SessionManager,
        callback: &FederatedCallback,
    ) -> Result<LoginSuccess, ActionError> {
        let user = session.sign_in_federated(callback).await.map_err(authentication_failed)?;
        Ok(LoginSuccess {
            user,
            notice: Notice::info("Success!", "Logged in successfully!"),
            redirect: Route::AllBooks,
        })
    }

    pub async fn request_reset(&self, session: &SessionManager, email: &str) -> Result<Notice, ActionError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ActionError::new(
                ValidationError::Required("Email"),
                Notice::destructive("Error", "Please enter your email address"),
            ));
        }
        session.reset_password(email).await.map_err(|e| {
            let description = e.to_string();
            ActionError::new(e, Notice::destructive("Password reset failed", description))
        })?;
        Ok(Notice::info(
            "Check your inbox",
            format!("If an account exists for {email}, a password reset link is on its way."),
        ))
    }

    pub async fn confirm_reset(
        &self,
        session: &SessionManager,
        token: &str,
        new_password: &str,
    ) -> Result<Notice, ActionError> {
        if new_password.is_empty() {
            return Err(ActionError::new(
                ValidationError::Required("Password"),
                Notice::destructive("Error", "Please fill in all fields"),
            ));
        }
        session.confirm_password_reset(token, new_password).await.map_err(|e| {
            let description = e.to_string();
            ActionError::new(e, Notice::destructive("Password reset failed", description))
        })?;
        Ok(Notice::info("Password updated", "You can now sign in with your new password."))
    }
}

fn authentication_failed(e: crate::ports::AuthError) -> ActionError {
    let description = e.to_string();
    ActionError::new(e, Notice::destructive("Authentication Failed", description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::AppError;
    use crate::ports::AuthError;
    use crate::session::tests::FakeIdentity;
    use std::sync::Arc;

    fn session_with(email: &str, password: &str) -> SessionManager {
        SessionManager::signed_out(Arc::new(FakeIdentity::with_account(email, password)))
    }

    #[tokio::test]
    async fn sign_in_goes_to_the_book_list() {
        let session = session_with("a@b.co", "secret1");
        let ok = LoginController::default().submit(&session, "a@b.co", "secret1").await.unwrap();

        assert_eq!(ok.redirect, Route::AllBooks);
        assert_eq!(ok.notice.description, "Logged in successfully!");
        assert_eq!(session.current_user(), Some(ok.user));
    }

    #[tokio::test]
    async fn provider_message_is_shown_verbatim() {
        let session = session_with("a@b.co", "secret1");
        let err = LoginController::default().submit(&session, "a@b.co", "nope").await.unwrap_err();

        assert_eq!(err.notice.title, "Authentication Failed");
        assert_eq!(err.notice.description, AuthError::InvalidCredentials.to_string());
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn empty_fields_never_reach_the_provider() {
        let session = session_with("a@b.co", "secret1");
        let err = LoginController::default().submit(&session, "", "secret1").await.unwrap_err();

        assert_eq!(err.notice.description, "Please fill in all fields");
        assert!(matches!(err.error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn sign_up_mode_creates_the_account() {
        let session = session_with("a@b.co", "secret1");
        let mut page = LoginController::default();
        page.toggle();
        assert_eq!(page.mode(), LoginMode::SignUp);

        let ok = page.submit(&session, "new@b.co", "secret2").await.unwrap();
        assert_eq!(ok.notice.description, "Account created successfully!");

        let dup = page.submit(&session, "a@b.co", "whatever").await.unwrap_err();
        assert!(matches!(dup.error, AppError::Auth(AuthError::EmailInUse)));
    }

    #[tokio::test]
    async fn cancelled_federated_flow_is_an_auth_error() {
        let session = session_with("a@b.co", "secret1");
        let err = LoginController::default()
            .complete_federated(&session, &FederatedCallback { code: None, error: Some("access_denied".into()) })
            .await
            .unwrap_err();

        assert!(matches!(err.error, AppError::Auth(AuthError::Cancelled)));
    }

    #[test]
    fn modes_parse_and_toggle() {
        assert_eq!("signup".parse::<LoginMode>().unwrap(), LoginMode::SignUp);
        assert!("register".parse::<LoginMode>().is_err());
        assert_eq!(LoginMode::SignUp.toggled(), LoginMode::SignIn);
    }
}
