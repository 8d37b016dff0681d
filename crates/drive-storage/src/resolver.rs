//! Reference name to Drive file ID resolution

use std::sync::Arc;

use tokio::time::Instant;

use crate::backend::{DriveFiles, FileQuery};
use crate::cache::NameCache;
use crate::deadline::call;
use crate::error::StorageError;

/// A file ID found for a reference name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    /// Served from the name cache rather than a fresh Drive query
    pub cached: bool,
}

/// Looks names up in the cache, then in Drive.
///
/// Drive may hold several files under one name; the first one the query
/// returns wins. Nothing here tries to break that tie.
pub struct Resolver<F> {
    files: Arc<F>,
    cache: Arc<dyn NameCache>,
}

impl<F: DriveFiles> Resolver<F> {
    pub fn new(files: Arc<F>, cache: Arc<dyn NameCache>) -> Self {
        Self { files, cache }
    }

    /// `Ok(None)` when no file carries the name. The cache is filled only
    /// after the query completes, so a timed-out lookup leaves it untouched.
    pub async fn resolve(
        &self,
        op: &'static str,
        name: &str,
        deadline: Option<Instant>,
    ) -> Result<Option<Resolved>, StorageError> {
        if let Some(id) = self.cache.get(name) {
            return Ok(Some(Resolved { id, cached: true }));
        }

        let list = call(op, deadline, self.files.list(&FileQuery::by_name(name))).await?;
        let Some(first) = list.files.into_iter().next() else {
            return Ok(None);
        };

        self.cache.insert(name, &first.id);
        Ok(Some(Resolved {
            id: first.id,
            cached: false,
        }))
    }

    /// Drop the cached ID for `name`
    pub fn forget(&self, name: &str) {
        self.cache.remove(name);
    }
}
