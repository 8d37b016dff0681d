//! Store construction options
//!
//! The store is configured with four string-valued credential fields, either
//! as a key/value map or as the `key=value` lines the setup command writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use drive_oauth::OAuthToken;

use crate::error::{Result, StorageError};

pub const BACKEND: &str = "backend";
pub const ACCESS_TOKEN: &str = "accessToken";
pub const TOKEN_TYPE: &str = "tokenType";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const EXPIRY: &str = "expiry";

/// Name under which this backend is selected in a store configuration
pub const BACKEND_NAME: &str = "Drive";

/// Validated options for a Drive store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    token: OAuthToken,
}

impl StoreOptions {
    pub fn from_map(opts: &HashMap<String, String>) -> Result<Self> {
        if let Some(backend) = opts.get(BACKEND) {
            if backend != BACKEND_NAME {
                return Err(StorageError::Invalid(format!(
                    "unsupported backend {:?}",
                    backend
                )));
            }
        }

        let field = |key: &str| {
            opts.get(key)
                .cloned()
                .ok_or_else(|| StorageError::Invalid(format!("missing {}", key)))
        };

        let access_token = field(ACCESS_TOKEN)?;
        let token_type = field(TOKEN_TYPE)?;
        let refresh_token = field(REFRESH_TOKEN)?;
        let raw_expiry = field(EXPIRY)?;
        let expiry = DateTime::parse_from_rfc3339(&raw_expiry)
            .map_err(|e| {
                StorageError::Invalid(format!("invalid expiry {:?}: {}", raw_expiry, e))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            token: OAuthToken {
                access_token,
                token_type,
                refresh_token,
                expiry,
            },
        })
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are ignored.
    pub fn parse_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut opts = HashMap::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                StorageError::Invalid(format!("malformed option {:?}, want key=value", line))
            })?;
            opts.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self::from_map(&opts)
    }

    pub fn token(&self) -> &OAuthToken {
        &self.token
    }

    pub fn into_token(self) -> OAuthToken {
        self.token
    }
}

impl From<OAuthToken> for StoreOptions {
    fn from(token: OAuthToken) -> Self {
        Self { token }
    }
}
