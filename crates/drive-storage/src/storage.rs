//! Storage interface offered to the host server

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Blob storage addressed by opaque reference strings
#[async_trait]
pub trait Storage: Send + Sync {
    /// Base URL under which references can be fetched directly, when the
    /// backend offers one
    fn link_base(&self) -> Result<String>;

    /// Complete contents stored under `reference`
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>>;

    /// Store `contents` under `reference`, replacing what was there
    async fn store(&self, reference: &str, contents: Vec<u8>) -> Result<()>;

    /// Remove `reference`. Removing something that does not exist succeeds.
    async fn delete(&self, reference: &str) -> Result<()>;
}

/// Storage that can enumerate what it holds
#[async_trait]
pub trait Lister: Send + Sync {
    /// One page of stored items. Start with an empty token and pass each
    /// returned `next_token` back until it comes back empty.
    async fn list(&self, token: &str) -> Result<ListPage>;
}

/// A stored item as reported by [`Lister::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRefsItem {
    pub reference: String,
    pub size: i64,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListPage {
    pub refs: Vec<ListRefsItem>,
    /// Empty on the final page
    pub next_token: String,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }
}
