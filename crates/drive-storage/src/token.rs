//! Access token holder that refreshes on expiry

use drive_oauth::{OAuthConfig, OAuthToken};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::BackendError;

/// Supplies `Authorization` header values, refreshing the token when it expires
pub struct TokenSource {
    oauth: OAuthConfig,
    client: reqwest::Client,
    token: Mutex<OAuthToken>,
}

impl TokenSource {
    pub fn new(oauth: OAuthConfig, token: OAuthToken, client: reqwest::Client) -> Self {
        Self {
            oauth,
            client,
            token: Mutex::new(token),
        }
    }

    pub async fn authorization(&self) -> Result<String, BackendError> {
        // Held across the refresh so concurrent callers refresh once.
        let mut token = self.token.lock().await;
        if token.is_expired() && !token.refresh_token.is_empty() {
            debug!(expiry = %token.expiry, "Refreshing expired Drive access token");
            let refreshed = self
                .oauth
                .refresh(&self.client, &token.refresh_token)
                .await?;
            *token = refreshed;
        }
        Ok(token.authorization())
    }

    /// Current token, which may have been refreshed since construction
    pub async fn token(&self) -> OAuthToken {
        self.token.lock().await.clone()
    }
}
