//! services/web/src/web/cookies.rs
//!
//! Cookie names and builders, and the cookie-backed device storage.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use readmate_core::ports::DeviceStorage;

pub const SESSION_COOKIE: &str = "readmate_session";
pub const OAUTH_STATE_COOKIE: &str = "readmate_oauth_state";

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn oauth_state_cookie(state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/login")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// A cookie that, passed to `CookieJar::remove`, clears `name`.
pub fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build(name).path(path).build()
}

/// Device storage kept in the browser's cookies. Values written here reach the
/// browser once the jar is returned with the response.
pub struct CookieStorage {
    jar: CookieJar,
}

impl CookieStorage {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl DeviceStorage for CookieStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.jar.get(key).map(|c| c.value().to_string())
    }

    fn set(&mut self, key: &str, value: &str) {
        let jar = std::mem::take(&mut self.jar);
        self.jar = jar.add(
            Cookie::build((key.to_string(), value.to_string()))
                .path("/")
                .same_site(SameSite::Lax)
                .permanent()
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmate_core::controllers::{current_theme, THEME_STORAGE_KEY};
    use readmate_core::Theme;

    #[test]
    fn theme_round_trips_through_the_jar() {
        let mut storage = CookieStorage::new(CookieJar::new());
        assert_eq!(current_theme(&storage), Theme::Sunset);

        storage.set(THEME_STORAGE_KEY, "forest");
        let jar = storage.into_jar();
        assert_eq!(jar.get(THEME_STORAGE_KEY).map(|c| c.value().to_string()), Some("forest".to_string()));
        assert_eq!(current_theme(&CookieStorage::new(jar)), Theme::Forest);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".into(), false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
