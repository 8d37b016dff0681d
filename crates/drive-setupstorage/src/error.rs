//! Error types for the setup command

use std::fmt;

#[derive(Debug)]
pub enum SetupError {
    Config(String),
    OAuth(drive_oauth::OAuthError),
    Storage(drive_storage::StorageError),
    Http(Box<reqwest::Error>),
    Io(std::io::Error),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "{msg}"),
            Self::OAuth(err) => write!(f, "unable to retrieve token: {err}"),
            Self::Storage(err) => write!(f, "unusable store configuration: {err}"),
            Self::Http(err) => write!(f, "HTTP client error: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OAuth(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Http(err) => Some(err.as_ref()),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<drive_oauth::OAuthError> for SetupError {
    fn from(err: drive_oauth::OAuthError) -> Self {
        Self::OAuth(err)
    }
}

impl From<drive_storage::StorageError> for SetupError {
    fn from(err: drive_storage::StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<reqwest::Error> for SetupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl From<std::io::Error> for SetupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for SetupError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(format!("invalid log filter: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;
