//! OAuth2 token as persisted in the store configuration

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// Tokens are treated as expired slightly early so a request never races expiry.
const EXPIRY_DELTA_SECS: i64 = 10;

/// Access/refresh token pair with its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl OAuthToken {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_DELTA_SECS) >= self.expiry
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token)
    }

    /// `key=value` lines understood by the Drive store options parser
    pub fn store_config(&self) -> Vec<String> {
        vec![
            "backend=Drive".to_string(),
            format!("accessToken={}", self.access_token),
            format!("tokenType={}", self.token_type),
            format!("refreshToken={}", self.refresh_token),
            format!(
                "expiry={}",
                self.expiry.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        ]
    }
}
