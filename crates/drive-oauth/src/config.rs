//! OAuth2 client configuration for the Drive app-data scope

use crate::error::{OAuthError, Result};

/// Scope granting access to the application-private Drive folder only
pub const DRIVE_APPDATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.appdata";

/// Environment variable holding the OAuth client ID
pub const CLIENT_ID_ENV: &str = "DRIVE_CLIENT_ID";
/// Environment variable holding the OAuth client secret
pub const CLIENT_SECRET_ENV: &str = "DRIVE_CLIENT_SECRET";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
// Loopback redirect for installed apps; the code is read from the address bar.
const DEFAULT_REDIRECT_URL: &str = "http://127.0.0.1";

/// OAuth2 client configuration shared by the store and the setup command.
///
/// Built once and passed by value to whatever needs it. Nothing in this
/// crate keeps a process-wide copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scope: String,
}

impl OAuthConfig {
    /// Configuration for Google's endpoints and the Drive app-data scope
    pub fn drive(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            scope: DRIVE_APPDATA_SCOPE.to_string(),
        }
    }

    /// Read client credentials from `DRIVE_CLIENT_ID` and `DRIVE_CLIENT_SECRET`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| OAuthError::Config(format!("missing {}", key)))
        };
        let client_id = required(CLIENT_ID_ENV)?;
        let client_secret = required(CLIENT_SECRET_ENV)?;
        Ok(Self::drive(client_id, client_secret))
    }

    /// Point code exchange and refresh at a different token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Redirect target registered for the OAuth client
    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    /// URL the user opens to grant offline access and obtain an authorization code
    pub fn auth_code_url(&self, state: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", &self.scope)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .finish();
        let separator = if self.auth_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.auth_url, separator, query)
    }
}
