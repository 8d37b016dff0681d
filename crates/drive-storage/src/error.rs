//! Error types for the Drive store

use std::fmt;

/// Failure reported by a [`DriveFiles`](crate::DriveFiles) backend
#[derive(Debug)]
pub enum BackendError {
    /// Transport failure
    Http(Box<reqwest::Error>),
    /// Drive answered with a non-success status
    Status { status: u16, message: String },
    /// The access token could not be refreshed
    Token(drive_oauth::OAuthError),
    /// Backend refused the call without an HTTP exchange
    Unavailable(String),
}

impl BackendError {
    /// Whether the backend reported that the addressed file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Status { status, message } => {
                write!(f, "Drive API returned status {status}: {message}")
            }
            Self::Token(err) => write!(f, "token error: {err}"),
            Self::Unavailable(msg) => write!(f, "backend unavailable: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err.as_ref()),
            Self::Token(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl From<drive_oauth::OAuthError> for BackendError {
    fn from(err: drive_oauth::OAuthError) -> Self {
        Self::Token(err)
    }
}

/// Coarse classification of a [`StorageError`], for hosts mapping errors
/// onto their own taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    NotFound,
    NotSupported,
    Io,
    Timeout,
}

/// Errors returned by the storage interface
#[derive(Debug)]
pub enum StorageError {
    /// Bad or missing construction options
    Invalid(String),
    /// No Drive file carries the reference name
    NotFound {
        op: &'static str,
        reference: String,
    },
    /// The capability is absent on this backend
    NotSupported { op: &'static str },
    /// Backend or transport failure
    Io {
        op: &'static str,
        source: BackendError,
    },
    /// The operation's deadline passed before the backend answered
    Timeout { op: &'static str },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Io { .. } => ErrorKind::Io,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn not_found(op: &'static str, reference: &str) -> Self {
        Self::NotFound {
            op,
            reference: reference.to_string(),
        }
    }

    /// Backend 404 for a specific file ID, as opposed to a failed name lookup
    pub(crate) fn is_missing_object(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.is_not_found())
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
            Self::NotFound { op, reference } => {
                write!(f, "{op} {reference}: item does not exist")
            }
            Self::NotSupported { op } => write!(f, "{op}: not supported"),
            Self::Io { op, source } => write!(f, "{op}: I/O error: {source}"),
            Self::Timeout { op } => write!(f, "{op}: deadline exceeded"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
