//! In-memory [`DriveFiles`] backend
//!
//! Behaves like Drive where the store cares: names are not unique, queries
//! return every match in creation order, listings are paginated with opaque
//! tokens, and unknown IDs answer 404. Intended for tests and embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{DriveFile, DriveFiles, FileList, FileQuery};
use crate::error::BackendError;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Backend operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    Create,
    Download,
    Delete,
    List,
}

#[derive(Debug, Clone)]
struct StoredFile {
    id: String,
    name: String,
    parent: String,
    content: Vec<u8>,
}

#[derive(Default)]
struct State {
    files: Vec<StoredFile>,
    next_id: u64,
    calls: HashMap<FileOp, usize>,
    failures: HashMap<FileOp, usize>,
}

/// Drive stand-in that keeps every file in memory
pub struct InMemoryDriveFiles {
    state: Mutex<State>,
    page_size: usize,
    latency: Option<Duration>,
}

impl InMemoryDriveFiles {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: DEFAULT_PAGE_SIZE,
            latency: None,
        }
    }

    /// Maximum number of files per list page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every call, before it takes effect
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `op` fail without touching any file
    pub fn fail_next(&self, op: FileOp) {
        *self.state().failures.entry(op).or_default() += 1;
    }

    /// Number of calls of `op` so far, failed ones included
    pub fn calls(&self, op: FileOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs of the files named `name`, oldest first
    pub fn ids_named(&self, name: &str) -> Vec<String> {
        self.state()
            .files
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.id.clone())
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, wait out the latency, then consume an injected failure
    async fn begin(&self, op: FileOp) -> Result<(), BackendError> {
        *self.state().calls.entry(op).or_default() += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state();
        match state.failures.get_mut(&op) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                Err(BackendError::Unavailable(format!("injected {:?} failure", op)))
            }
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryDriveFiles {
    fn default() -> Self {
        Self::new()
    }
}

fn file_not_found(id: &str) -> BackendError {
    BackendError::Status {
        status: 404,
        message: format!("File not found: {}.", id),
    }
}

#[async_trait]
impl DriveFiles for InMemoryDriveFiles {
    async fn create(
        &self,
        name: &str,
        parent: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<DriveFile, BackendError> {
        self.begin(FileOp::Create).await?;

        let mut state = self.state();
        state.next_id += 1;
        let id = format!("file-{:04}", state.next_id);
        let size = content.len() as i64;
        state.files.push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.to_string(),
            content,
        });

        Ok(DriveFile {
            id,
            name: Some(name.to_string()),
            quota_bytes_used: size,
        })
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, BackendError> {
        self.begin(FileOp::Download).await?;

        self.state()
            .files
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.content.clone())
            .ok_or_else(|| file_not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.begin(FileOp::Delete).await?;

        let mut state = self.state();
        let index = state
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| file_not_found(id))?;
        state.files.remove(index);
        Ok(())
    }

    async fn list(&self, query: &FileQuery) -> Result<FileList, BackendError> {
        self.begin(FileOp::List).await?;

        let offset = match &query.page_token {
            Some(token) => token.parse::<usize>().map_err(|_| BackendError::Status {
                status: 400,
                message: format!("Invalid Value: pageToken {:?}", token),
            })?,
            None => 0,
        };

        let state = self.state();
        let matches: Vec<&StoredFile> = state
            .files
            .iter()
            .filter(|f| f.parent == query.space)
            .filter(|f| query.name.as_deref().map_or(true, |name| f.name == name))
            .collect();

        let end = (offset + self.page_size).min(matches.len());
        let files = matches
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|f| DriveFile {
                id: f.id.clone(),
                name: Some(f.name.clone()),
                quota_bytes_used: f.content.len() as i64,
            })
            .collect();
        let next_page_token = (end < matches.len()).then(|| end.to_string());

        Ok(FileList {
            files,
            next_page_token,
        })
    }
}
