//! Drive v3 REST implementation of [`DriveFiles`]

use std::time::Duration;

use async_trait::async_trait;
use drive_oauth::{OAuthConfig, OAuthToken};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::backend::{DriveFile, DriveFiles, FileList, FileQuery};
use crate::error::BackendError;
use crate::token::TokenSource;

const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const CONNECT_TIMEOUT_SECS: u64 = 30;
const BOUNDARY_PREFIX: &str = "drive_storage_boundary_";

/// Talks to the Drive v3 REST API with an OAuth2 bearer token
pub struct HttpDriveFiles {
    client: Client,
    api_url: String,
    upload_url: String,
    tokens: TokenSource,
}

impl HttpDriveFiles {
    pub fn new(oauth: OAuthConfig, token: OAuthToken) -> Result<Self, BackendError> {
        // No overall timeout: blobs can be large, deadlines belong to the caller.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        let tokens = TokenSource::new(oauth, token, client.clone());

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            tokens,
        })
    }

    /// Use different base URLs for metadata and upload requests
    pub fn with_endpoints(
        mut self,
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        self.api_url = api_url.into();
        self.upload_url = upload_url.into();
        self
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(id))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let authorization = self.tokens.authorization().await?;
        let response = request.header(AUTHORIZATION, authorization).send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }
}

#[async_trait]
impl DriveFiles for HttpDriveFiles {
    async fn create(
        &self,
        name: &str,
        parent: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<DriveFile, BackendError> {
        let metadata = serde_json::json!({ "name": name, "parents": [parent] }).to_string();
        let boundary = boundary_for(&content);
        let size = content.len();
        let body = multipart_related(&boundary, &metadata, &content, content_type);

        let url = format!("{}/files?uploadType=multipart&fields=id", self.upload_url);
        debug!(name, size, "Creating Drive file");

        let request = self
            .client
            .post(&url)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        let response = self.send(request).await?;

        let mut file: DriveFile = response.json().await?;
        if file.name.is_none() {
            file.name = Some(name.to_string());
        }
        Ok(file)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}?alt=media", self.file_url(id));
        debug!(id, "Downloading Drive file");

        let response = self.send(self.client.get(&url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        debug!(id, "Deleting Drive file");
        self.send(self.client.delete(self.file_url(id))).await?;
        Ok(())
    }

    async fn list(&self, query: &FileQuery) -> Result<FileList, BackendError> {
        // The serializer is not Send; finish it before awaiting.
        let url = {
            let mut params = url::form_urlencoded::Serializer::new(String::new());
            params
                .append_pair("spaces", &query.space)
                .append_pair("fields", &query.fields);
            if let Some(expression) = query.expression() {
                params.append_pair("q", &expression);
            }
            if let Some(token) = &query.page_token {
                params.append_pair("pageToken", token);
            }
            format!("{}/files?{}", self.api_url, params.finish())
        };
        debug!(url = %url, "Listing Drive files");

        let response = self.send(self.client.get(&url)).await?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Prefer Drive's `error.message`; fall back to the raw body.
async fn status_error(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body);
    BackendError::Status { status, message }
}

/// A multipart boundary that does not occur in `content`
fn boundary_for(content: &[u8]) -> String {
    let mut n: u32 = 0;
    loop {
        let boundary = format!("{}{}", BOUNDARY_PREFIX, n);
        let needle = boundary.as_bytes();
        if !content.windows(needle.len()).any(|w| w == needle) {
            return boundary;
        }
        n += 1;
    }
}

/// `multipart/related` upload body: JSON metadata part, then the media part
fn multipart_related(boundary: &str, metadata: &str, content: &[u8], content_type: &str) -> Vec<u8> {
    let head = format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{b}\r\nContent-Type: {content_type}\r\n\r\n",
        b = boundary,
    );
    let tail = format!("\r\n--{}--\r\n", boundary);

    let mut body = Vec::with_capacity(head.len() + content.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(tail.as_bytes());
    body
}
