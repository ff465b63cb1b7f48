//! services/web/src/adapters/federated.rs
//!
//! Federated sign-in through an OAuth2 authorization-code provider. The
//! provider only has to tell us a verified email address; the local identity
//! provider takes it from there.

use crate::config::FederatedSettings;
use async_trait::async_trait;
use readmate_core::ports::{AuthError, AuthResult};
use serde::Deserialize;
use tracing::{debug, warn};

/// What a federated provider vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub email: String,
}

#[async_trait]
pub trait FederatedProvider: Send + Sync {
    /// The provider page that starts the flow; `state` comes back on the callback.
    fn authorize_url(&self, state: &str) -> String;

    /// Trades an authorization code for the identity behind it.
    async fn exchange(&self, code: &str) -> AuthResult<FederatedIdentity>;
}

//=========================================================================================
// OAuth2 Client
//=========================================================================================

pub struct OAuthClient {
    http: reqwest::Client,
    settings: FederatedSettings,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

impl OAuthClient {
    pub fn new(settings: FederatedSettings) -> Self {
        Self { http: reqwest::Client::new(), settings }
    }
}

fn provider_error(e: reqwest::Error) -> AuthError {
    warn!("Federated provider request failed: {}", e);
    AuthError::Provider(e.to_string())
}

#[async_trait]
impl FederatedProvider for OAuthClient {
    fn authorize_url(&self, state: &str) -> String {
        let separator = if self.settings.authorize_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.settings.authorize_url,
            separator,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_url),
            urlencoding::encode("openid email"),
            urlencoding::encode(state),
        )
    }

    async fn exchange(&self, code: &str) -> AuthResult<FederatedIdentity> {
        debug!("Exchanging federated authorization code");
        let token: TokenResponse = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.settings.redirect_url.as_str()),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        let info: UserInfo = self
            .http
            .get(&self.settings.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        if info.email_verified == Some(false) {
            return Err(AuthError::Provider("the account's email address is not verified".to_string()));
        }
        let email = info
            .email
            .ok_or_else(|| AuthError::Provider("the provider did not share an email address".to_string()))?;
        Ok(FederatedIdentity { email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FederatedSettings {
        FederatedSettings {
            client_id: "readmate app".to_string(),
            client_secret: "secret".to_string(),
            authorize_url: "https://id.example.com/authorize".to_string(),
            token_url: "https://id.example.com/token".to_string(),
            userinfo_url: "https://id.example.com/userinfo".to_string(),
            redirect_url: "http://localhost:3000/login/federated/callback".to_string(),
        }
    }

    #[test]
    fn authorize_url_encodes_every_parameter() {
        let client = OAuthClient::new(settings());
        let url = client.authorize_url("abc 123");

        assert!(url.starts_with("https://id.example.com/authorize?response_type=code"));
        assert!(url.contains("client_id=readmate%20app"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Flogin%2Ffederated%2Fcallback"));
        assert!(url.contains("scope=openid%20email"));
        assert!(url.ends_with("state=abc%20123"));
    }

    #[test]
    fn authorize_url_appends_to_an_existing_query() {
        let mut settings = settings();
        settings.authorize_url = "https://id.example.com/authorize?prompt=select_account".to_string();
        let url = OAuthClient::new(settings).authorize_url("s");

        assert!(url.starts_with("https://id.example.com/authorize?prompt=select_account&response_type=code"));
    }
}
