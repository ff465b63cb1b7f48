//! crates/readmate_core/src/routing.rs
//!
//! The navigation shell: which page a path names, and whether the current
//! session may see it.

use crate::controllers::{ActionError, Notice};
use crate::session::{SessionManager, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    AllBooks,
    ManageBooks,
    Dashboard,
    NotFound,
}

/// One entry of the navigation bar.
#[derive(Debug, Clone, Copy)]
pub struct NavItem {
    pub route: Route,
    pub label: &'static str,
}

pub const NAV_ITEMS: [NavItem; 3] = [
    NavItem { route: Route::AllBooks, label: "All Books" },
    NavItem { route: Route::ManageBooks, label: "Manage Books" },
    NavItem { route: Route::Dashboard, label: "Dashboard" },
];

impl Route {
    /// `/login` and everything under it is the login page; any other unknown
    /// path is `NotFound`.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::AllBooks,
            "/manage" => Route::ManageBooks,
            "/dashboard" => Route::Dashboard,
            "/login" => Route::Login,
            p if p.starts_with("/login/") => Route::Login,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::AllBooks => "/",
            Route::ManageBooks => "/manage",
            Route::Dashboard => "/dashboard",
            Route::NotFound => "/404",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }
}

/// What the shell should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The session check is still running; ask again once it settles.
    Wait,
    Render(Route),
    Redirect(Route),
}

/// Decides between rendering, redirecting to the login page, and waiting.
pub fn guard(route: Route, session: &SessionState) -> Navigation {
    if route.is_public() {
        return Navigation::Render(route);
    }
    match session {
        SessionState::Unknown => Navigation::Wait,
        SessionState::SignedOut => Navigation::Redirect(Route::Login),
        SessionState::SignedIn(_) => Navigation::Render(route),
    }
}

/// The navigation bar's log out button.
pub async fn log_out(session: &SessionManager) -> Result<Notice, ActionError> {
    session.logout().await.map_err(|e| {
        ActionError::new(e, Notice::destructive("Error", "Could not log out. Please try again."))
    })?;
    Ok(Notice::info("Logged out", "You have been logged out successfully."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthSession, User};
    use chrono::Utc;

    fn signed_in() -> SessionState {
        SessionState::SignedIn(AuthSession {
            token: "t".into(),
            user: User { id: "u1".into(), email: None },
            expires_at: Utc::now(),
        })
    }

    #[test]
    fn paths_map_to_routes() {
        assert_eq!(Route::from_path("/"), Route::AllBooks);
        assert_eq!(Route::from_path("/manage"), Route::ManageBooks);
        assert_eq!(Route::from_path("/manage/"), Route::ManageBooks);
        assert_eq!(Route::from_path("/dashboard"), Route::Dashboard);
        assert_eq!(Route::from_path("/login"), Route::Login);
        assert_eq!(Route::from_path("/login/reset"), Route::Login);
        assert_eq!(Route::from_path("/loginx"), Route::NotFound);
        assert_eq!(Route::from_path("/nowhere"), Route::NotFound);
    }

    #[test]
    fn protected_pages_redirect_when_signed_out() {
        for route in [Route::AllBooks, Route::ManageBooks, Route::Dashboard, Route::NotFound] {
            assert_eq!(guard(route, &SessionState::SignedOut), Navigation::Redirect(Route::Login));
            assert_eq!(guard(route, &signed_in()), Navigation::Render(route));
        }
    }

    #[test]
    fn unknown_session_waits_instead_of_redirecting() {
        assert_eq!(guard(Route::ManageBooks, &SessionState::Unknown), Navigation::Wait);
        assert_eq!(guard(Route::Login, &SessionState::Unknown), Navigation::Render(Route::Login));
    }
}
