//! Drive-backed [`Storage`]
//!
//! Drive identifies files by server-assigned IDs and lets any number of files
//! share a name. The store maps reference names onto that model:
//!
//! - a name resolves to the first file Drive returns for it, cached in a
//!   bounded LRU so repeated fetches skip the query;
//! - `store` deletes the existing file for the name before creating the new
//!   one, so at most one file per name is left behind;
//! - `delete` evicts the cached ID only after Drive confirms the delete.
//!
//! Writers to the same name are serialized within this process. Two
//! processes writing one name can still both create a file; the next
//! resolve then picks whichever Drive lists first. Callers needing strict
//! single-writer semantics across processes must coordinate externally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drive_oauth::OAuthConfig;
use tokio::time::Instant;

use crate::backend::{DriveFiles, FileQuery, APP_DATA_FOLDER, OCTET_STREAM};
use crate::cache::{LruNameCache, NameCache};
use crate::deadline::call;
use crate::error::{Result, StorageError};
use crate::http::HttpDriveFiles;
use crate::locks::NameLocks;
use crate::options::StoreOptions;
use crate::resolver::Resolver;
use crate::storage::{ListPage, ListRefsItem, Lister, Storage};

const OP_NEW: &str = "new";
const OP_RESOLVE: &str = "resolve";
const OP_FETCH: &str = "fetch";
const OP_STORE: &str = "store";
const OP_DELETE: &str = "delete";
const OP_LIST: &str = "list";
const OP_LINK_BASE: &str = "link_base";

/// Blob store kept in the Drive app-data folder
pub struct DriveStore<F = HttpDriveFiles> {
    files: Arc<F>,
    resolver: Resolver<F>,
    locks: NameLocks,
    timeout: Option<Duration>,
}

impl DriveStore<HttpDriveFiles> {
    /// Connect to Drive with the credentials in `options`
    pub fn new(options: &StoreOptions, oauth: OAuthConfig) -> Result<Self> {
        let files = HttpDriveFiles::new(oauth, options.token().clone())
            .map_err(|source| StorageError::Io { op: OP_NEW, source })?;
        Ok(Self::with_backend(Arc::new(files)))
    }

    /// Like [`DriveStore::new`], from raw key/value options
    pub fn from_options(opts: &HashMap<String, String>, oauth: OAuthConfig) -> Result<Self> {
        Self::new(&StoreOptions::from_map(opts)?, oauth)
    }
}

impl<F: DriveFiles> DriveStore<F> {
    pub fn with_backend(files: Arc<F>) -> Self {
        let cache: Arc<dyn NameCache> = Arc::new(LruNameCache::new());
        Self {
            resolver: Resolver::new(files.clone(), cache),
            files,
            locks: NameLocks::new(),
            timeout: None,
        }
    }

    /// Replace the default LRU name cache
    pub fn with_cache(mut self, cache: Arc<dyn NameCache>) -> Self {
        self.resolver = Resolver::new(self.files.clone(), cache);
        self
    }

    /// Bound every operation's backend calls by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn backend(&self) -> &F {
        &self.files
    }

    /// Drive file ID currently answering for `reference`
    pub async fn resolve(&self, reference: &str) -> Result<String> {
        self.resolver
            .resolve(OP_RESOLVE, reference, self.deadline())
            .await?
            .map(|resolved| resolved.id)
            .ok_or_else(|| StorageError::not_found(OP_RESOLVE, reference))
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    /// Delete the file currently answering for `reference`, if any, and
    /// forget its ID. A cached ID Drive no longer knows is dropped and the
    /// name looked up again, since another file may carry it by now.
    async fn remove_current(
        &self,
        op: &'static str,
        reference: &str,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let mut rechecked = false;
        loop {
            let Some(existing) = self.resolver.resolve(op, reference, deadline).await? else {
                return Ok(());
            };
            match call(op, deadline, self.files.delete(&existing.id)).await {
                Ok(()) => break,
                Err(err) if err.is_missing_object() => {
                    self.resolver.forget(reference);
                    if !existing.cached || rechecked {
                        return Ok(());
                    }
                    rechecked = true;
                }
                Err(err) => return Err(err),
            }
        }
        self.resolver.forget(reference);
        Ok(())
    }
}

#[async_trait]
impl<F: DriveFiles + 'static> Storage for DriveStore<F> {
    /// Drive links address file IDs, not names, so there is no usable base.
    fn link_base(&self) -> Result<String> {
        Err(StorageError::NotSupported { op: OP_LINK_BASE })
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let deadline = self.deadline();
        let resolved = self
            .resolver
            .resolve(OP_FETCH, reference, deadline)
            .await?
            .ok_or_else(|| StorageError::not_found(OP_FETCH, reference))?;

        match call(OP_FETCH, deadline, self.files.download(&resolved.id)).await {
            Err(err) if resolved.cached && err.is_missing_object() => {
                // Cached ID is gone from Drive; look the name up again.
                self.resolver.forget(reference);
                let fresh = self
                    .resolver
                    .resolve(OP_FETCH, reference, deadline)
                    .await?
                    .ok_or_else(|| StorageError::not_found(OP_FETCH, reference))?;
                call(OP_FETCH, deadline, self.files.download(&fresh.id)).await
            }
            outcome => outcome,
        }
    }

    async fn store(&self, reference: &str, contents: Vec<u8>) -> Result<()> {
        let _guard = self.locks.lock(reference).await;
        let deadline = self.deadline();

        // Drive would happily keep both files under the same name.
        self.remove_current(OP_STORE, reference, deadline).await?;

        call(
            OP_STORE,
            deadline,
            self.files
                .create(reference, APP_DATA_FOLDER, contents, OCTET_STREAM),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let _guard = self.locks.lock(reference).await;
        let deadline = self.deadline();

        self.remove_current(OP_DELETE, reference, deadline).await
    }
}

#[async_trait]
impl<F: DriveFiles + 'static> Lister for DriveStore<F> {
    /// Items carry Drive file IDs in `reference`, not the names they were
    /// stored under.
    async fn list(&self, token: &str) -> Result<ListPage> {
        let page = call(
            OP_LIST,
            self.deadline(),
            self.files.list(&FileQuery::page(token)),
        )
        .await?;

        let refs = page
            .files
            .into_iter()
            .map(|file| ListRefsItem {
                reference: file.id,
                size: file.quota_bytes_used,
            })
            .collect();

        Ok(ListPage {
            refs,
            next_token: page.next_page_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, ErrorKind};
    use crate::memory::{FileOp, InMemoryDriveFiles};
    use std::collections::HashSet;

    fn store_with(files: InMemoryDriveFiles) -> (DriveStore<InMemoryDriveFiles>, Arc<LruNameCache>) {
        let cache = Arc::new(LruNameCache::new());
        let store = DriveStore::with_backend(Arc::new(files)).with_cache(cache.clone());
        (store, cache)
    }

    fn new_store() -> (DriveStore<InMemoryDriveFiles>, Arc<LruNameCache>) {
        store_with(InMemoryDriveFiles::new())
    }

    #[tokio::test]
    async fn test_store_fetch_overwrite_delete() {
        let (store, _) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.fetch("doc1").await.unwrap(), b"hello");

        store.store("doc1", b"world".to_vec()).await.unwrap();
        assert_eq!(store.fetch("doc1").await.unwrap(), b"world");

        store.delete("doc1").await.unwrap();
        let err = store.fetch("doc1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "fetch doc1: item does not exist");
    }

    #[tokio::test]
    async fn test_distinct_references_do_not_mix() {
        let (store, _) = new_store();
        let refs: Vec<String> = (0..10).map(|i| format!("ref-{i}")).collect();

        for r in &refs {
            store.store(r, r.as_bytes().to_vec()).await.unwrap();
        }
        for r in &refs {
            assert_eq!(store.fetch(r).await.unwrap(), r.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_overwrite_leaves_single_file() {
        let (store, _) = new_store();

        store.store("doc1", b"v1".to_vec()).await.unwrap();
        let old_id = store.resolve("doc1").await.unwrap();
        store.store("doc1", b"v2".to_vec()).await.unwrap();

        let ids = store.backend().ids_named("doc1");
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], old_id);
        assert!(store.backend().download(&old_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_never_stored_is_noop() {
        let (store, _) = new_store();

        store.delete("ghost").await.unwrap();
        assert_eq!(store.backend().calls(FileOp::Delete), 0);
        assert!(store.fetch("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_evicts_cached_id() {
        let (store, cache) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        store.fetch("doc1").await.unwrap();
        assert!(cache.get("doc1").is_some());

        store.delete("doc1").await.unwrap();
        assert_eq!(cache.get("doc1"), None);

        let queries = store.backend().calls(FileOp::List);
        let err = store.resolve("doc1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.backend().calls(FileOp::List), queries + 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_query() {
        let (store, _) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        // store's existence probe
        assert_eq!(store.backend().calls(FileOp::List), 1);

        store.fetch("doc1").await.unwrap();
        store.fetch("doc1").await.unwrap();
        store.fetch("doc1").await.unwrap();
        assert_eq!(store.backend().calls(FileOp::List), 2);
        assert_eq!(store.backend().calls(FileOp::Download), 3);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_cache_entry() {
        let (store, cache) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        let id = store.resolve("doc1").await.unwrap();

        store.backend().fail_next(FileOp::Delete);
        let err = store.delete("doc1").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Io {
                op: "delete",
                source: BackendError::Unavailable(_)
            }
        ));
        assert_eq!(cache.get("doc1"), Some(id));
        assert_eq!(store.fetch("doc1").await.unwrap(), b"hello");

        store.delete("doc1").await.unwrap();
        assert!(store.fetch("doc1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_create_is_io_error() {
        let (store, _) = new_store();
        store.backend().fail_next(FileOp::Create);

        let err = store.store("doc1", b"hello".to_vec()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { op: "store", .. }));
        assert!(store.backend().is_empty());
    }

    #[tokio::test]
    async fn test_failed_probe_stops_store() {
        let (store, _) = new_store();
        store.backend().fail_next(FileOp::List);

        let err = store.store("doc1", b"hello".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.backend().calls(FileOp::Create), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_download() {
        let (store, _) = new_store();
        store.store("doc1", b"hello".to_vec()).await.unwrap();
        store.backend().fail_next(FileOp::Download);

        let err = store.fetch("doc1").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { op: "fetch", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_names_resolve_to_first() {
        let (store, _) = new_store();
        let files = store.backend();
        files
            .create("doc1", APP_DATA_FOLDER, b"first".to_vec(), OCTET_STREAM)
            .await
            .unwrap();
        files
            .create("doc1", APP_DATA_FOLDER, b"second".to_vec(), OCTET_STREAM)
            .await
            .unwrap();

        assert_eq!(store.fetch("doc1").await.unwrap(), b"first");

        // Overwriting removes only the winner; the other file becomes visible.
        store.store("doc1", b"third".to_vec()).await.unwrap();
        assert_eq!(store.backend().ids_named("doc1").len(), 2);
        assert_eq!(store.fetch("doc1").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_stale_cache_entry_is_re_resolved() {
        let (store, cache) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        let old_id = store.resolve("doc1").await.unwrap();

        // Another writer replaces the file without going through this store.
        let files = store.backend();
        files.delete(&old_id).await.unwrap();
        let new_id = files
            .create("doc1", APP_DATA_FOLDER, b"replaced".to_vec(), OCTET_STREAM)
            .await
            .unwrap()
            .id;

        assert_eq!(store.fetch("doc1").await.unwrap(), b"replaced");
        assert_eq!(cache.get("doc1"), Some(new_id));
    }

    #[tokio::test]
    async fn test_stale_cache_entry_without_replacement() {
        let (store, cache) = new_store();

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        let id = store.resolve("doc1").await.unwrap();
        store.backend().delete(&id).await.unwrap();

        assert!(store.fetch("doc1").await.unwrap_err().is_not_found());
        assert_eq!(cache.get("doc1"), None);

        // Deleting a name whose cached file vanished still succeeds.
        store.store("doc2", b"x".to_vec()).await.unwrap();
        let id = store.resolve("doc2").await.unwrap();
        store.backend().delete(&id).await.unwrap();
        store.delete("doc2").await.unwrap();
        assert_eq!(cache.get("doc2"), None);
    }

    /// Replace the file behind `name` directly in the backend, leaving the
    /// store's cached ID pointing at a deleted file.
    async fn replace_behind_cache(store: &DriveStore<InMemoryDriveFiles>, name: &str, content: &[u8]) {
        let old_id = store.resolve(name).await.unwrap();
        let files = store.backend();
        files.delete(&old_id).await.unwrap();
        files
            .create(name, APP_DATA_FOLDER, content.to_vec(), OCTET_STREAM)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_over_stale_entry_replaces_live_file() {
        let (store, _) = new_store();
        store.store("doc1", b"v1".to_vec()).await.unwrap();
        replace_behind_cache(&store, "doc1", b"v2").await;

        store.store("doc1", b"v3".to_vec()).await.unwrap();

        assert_eq!(store.backend().ids_named("doc1").len(), 1);
        assert_eq!(store.fetch("doc1").await.unwrap(), b"v3");
    }

    #[tokio::test]
    async fn test_delete_over_stale_entry_removes_live_file() {
        let (store, cache) = new_store();
        store.store("doc1", b"v1".to_vec()).await.unwrap();
        replace_behind_cache(&store, "doc1", b"v2").await;

        store.delete("doc1").await.unwrap();

        assert!(store.backend().ids_named("doc1").is_empty());
        assert_eq!(cache.get("doc1"), None);
        assert!(store.fetch("doc1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_walks_every_file_once() {
        let (store, _) = store_with(InMemoryDriveFiles::new().with_page_size(3));
        for i in 0..10 {
            store
                .store(&format!("ref-{i}"), vec![0u8; i])
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut token = String::new();
        let mut pages = 0;
        loop {
            let page = store.list(&token).await.unwrap();
            pages += 1;
            seen.extend(page.refs.iter().cloned());
            if page.is_last() {
                break;
            }
            token = page.next_token;
        }

        assert_eq!(pages, 4);
        assert_eq!(seen.len(), 10);
        let ids: HashSet<_> = seen.iter().map(|item| item.reference.clone()).collect();
        assert_eq!(ids.len(), 10);

        // References in a listing are file IDs, not names.
        for i in 0..10 {
            let id = store.resolve(&format!("ref-{i}")).await.unwrap();
            let item = seen.iter().find(|item| item.reference == id).unwrap();
            assert_eq!(item.size, i as i64);
        }
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (store, _) = new_store();
        let page = store.list("").await.unwrap();
        assert!(page.refs.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_link_base_not_supported() {
        let (store, _) = new_store();
        let err = store.link_base().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }

    #[tokio::test]
    async fn test_timeout_leaves_cache_and_backend_untouched() {
        let (store, cache) =
            store_with(InMemoryDriveFiles::new().with_latency(Duration::from_millis(200)));
        let store = store.with_timeout(Duration::from_millis(20));

        let err = store.store("doc1", b"hello".to_vec()).await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { op: "store" }));
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = store.fetch("doc1").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { op: "fetch" }));

        assert!(cache.is_empty());
        assert!(store.backend().is_empty());
    }

    #[tokio::test]
    async fn test_generous_timeout_succeeds() {
        let (store, _) =
            store_with(InMemoryDriveFiles::new().with_latency(Duration::from_millis(5)));
        let store = store.with_timeout(Duration::from_secs(5));

        store.store("doc1", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.fetch("doc1").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_concurrent_stores_to_one_name_leave_one_file() {
        let (store, _) =
            store_with(InMemoryDriveFiles::new().with_latency(Duration::from_millis(2)));
        let store = Arc::new(store);

        let writers = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.store("doc1", vec![i as u8]).await })
        });
        for result in futures::future::join_all(writers).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.backend().ids_named("doc1").len(), 1);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_usable_as_trait_objects() {
        let (store, _) = new_store();
        let store = Arc::new(store);
        let storage: Arc<dyn Storage> = store.clone();
        let lister: Arc<dyn Lister> = store;

        storage.store("doc1", b"hello".to_vec()).await.unwrap();
        assert_eq!(storage.fetch("doc1").await.unwrap(), b"hello");
        assert_eq!(lister.list("").await.unwrap().refs.len(), 1);
    }

    #[test]
    fn test_new_rejects_incomplete_options() {
        let mut opts = HashMap::new();
        opts.insert("accessToken".to_string(), "ya29".to_string());
        let err = DriveStore::from_options(&opts, OAuthConfig::drive("id", "secret")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(err.to_string().contains("missing tokenType"));
    }

    #[test]
    fn test_new_with_valid_options() {
        let opts = StoreOptions::parse_lines([
            "backend=Drive",
            "accessToken=ya29",
            "tokenType=Bearer",
            "refreshToken=1//r",
            "expiry=2030-01-01T00:00:00Z",
        ])
        .unwrap();
        assert!(DriveStore::new(&opts, OAuthConfig::drive("id", "secret")).is_ok());
    }
}
