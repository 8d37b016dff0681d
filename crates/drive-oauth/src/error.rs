//! Error types for OAuth2 configuration and token endpoint calls

use std::fmt;

#[derive(Debug)]
pub enum OAuthError {
    /// Transport failure talking to the token endpoint
    Http(Box<reqwest::Error>),
    /// Token endpoint answered with a non-success status
    Status { status: u16, body: String },
    /// Missing or unusable configuration
    Config(String),
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Status { status, body } => {
                write!(f, "token endpoint returned status {status}: {body}")
            }
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OAuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, OAuthError>;
