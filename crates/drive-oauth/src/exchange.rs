//! Token endpoint calls: authorization code exchange and refresh

use chrono::{Duration, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::token::OAuthToken;

// Used when the endpoint omits `expires_in`; Google always sends it.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl OAuthConfig {
    /// Exchange an authorization code for an access/refresh token pair
    pub async fn exchange(&self, http: &reqwest::Client, code: &str) -> Result<OAuthToken> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish();

        let response = self.request_token(http, form).await?;
        let refresh_token = response.refresh_token.clone().ok_or_else(|| {
            OAuthError::Config("token endpoint did not return a refresh token".to_string())
        })?;
        Ok(into_token(response, refresh_token))
    }

    /// Obtain a fresh access token. The refresh token is kept when the
    /// endpoint does not rotate it.
    pub async fn refresh(&self, http: &reqwest::Client, refresh_token: &str) -> Result<OAuthToken> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish();

        let response = self.request_token(http, form).await?;
        let refresh_token = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| refresh_token.to_string());
        Ok(into_token(response, refresh_token))
    }

    async fn request_token(&self, http: &reqwest::Client, form: String) -> Result<TokenResponse> {
        debug!(url = %self.token_url, "Requesting OAuth2 token");

        let response = http
            .post(&self.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

fn into_token(response: TokenResponse, refresh_token: String) -> OAuthToken {
    let lifetime = response.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
    OAuthToken {
        access_token: response.access_token,
        token_type: response.token_type,
        refresh_token,
        expiry: Utc::now() + Duration::seconds(lifetime),
    }
}
