//! Blob storage on Google Drive
//!
//! Stores opaque blobs as files in the Drive app-data folder, keyed by a
//! reference name. Drive addresses files by ID and allows duplicate names,
//! so the store resolves names through a bounded LRU cache and emulates
//! overwrite by deleting the old file before creating the new one.
//!
//! # Example
//!
//! ```no_run
//! use drive_oauth::OAuthConfig;
//! use drive_storage::{DriveStore, Storage, StoreOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = std::fs::read_to_string("storeconfig")?;
//! let options = StoreOptions::parse_lines(config.lines())?;
//! let store = DriveStore::new(&options, OAuthConfig::from_env()?)?;
//!
//! store.store("doc1", b"hello".to_vec()).await?;
//! assert_eq!(store.fetch("doc1").await?, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
mod deadline;
pub mod error;
pub mod http;
pub mod locks;
pub mod memory;
pub mod options;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod token;

pub use backend::{DriveFile, DriveFiles, FileList, FileQuery};
pub use cache::{LruNameCache, NameCache};
pub use error::{BackendError, ErrorKind, Result, StorageError};
pub use http::HttpDriveFiles;
pub use memory::InMemoryDriveFiles;
pub use options::StoreOptions;
pub use storage::{ListPage, ListRefsItem, Lister, Storage};
pub use store::DriveStore;
pub use token::TokenSource;
