//! The Drive Files API surface the store is written against

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer};

use crate::error::BackendError;

/// Application-private folder; files there are invisible in the user's Drive
pub const APP_DATA_FOLDER: &str = "appDataFolder";

/// Content type blobs are uploaded with
pub const OCTET_STREAM: &str = "application/octet-stream";

const ID_FIELDS: &str = "files(id)";
const LIST_FIELDS: &str = "nextPageToken, files(id, quotaBytesUsed)";

/// Parameters of a `files.list` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Exact file name to match
    pub name: Option<String>,
    /// Drive space to search
    pub space: String,
    /// Partial-response field mask
    pub fields: String,
    pub page_token: Option<String>,
}

impl FileQuery {
    /// Look up files named `name`, asking only for their IDs
    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            space: APP_DATA_FOLDER.to_string(),
            fields: ID_FIELDS.to_string(),
            page_token: None,
        }
    }

    /// One page of the whole app-data folder, with sizes. An empty token
    /// starts from the beginning.
    pub fn page(token: &str) -> Self {
        Self {
            name: None,
            space: APP_DATA_FOLDER.to_string(),
            fields: LIST_FIELDS.to_string(),
            page_token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    /// The `q` search expression, if the query filters at all
    pub fn expression(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|name| format!("name = {}", quote_literal(name)))
    }
}

/// Render `value` as a Drive query string literal
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// File resource, reduced to the fields the store asks for
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "int64")]
    pub quota_bytes_used: i64,
}

/// Response of `files.list`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Drive encodes int64 fields as JSON strings.
fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(de::Error::custom),
    }
}

/// Create, fetch, delete and query Drive files.
///
/// Names are not unique: several files may share one, and `list` returns
/// every match in whatever order the backend chooses.
#[async_trait]
pub trait DriveFiles: Send + Sync {
    /// Upload `content` as a new file and return its resource
    async fn create(
        &self,
        name: &str,
        parent: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<DriveFile, BackendError>;

    /// Full content of the file with the given ID
    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;

    async fn list(&self, query: &FileQuery) -> Result<FileList, BackendError>;
}
