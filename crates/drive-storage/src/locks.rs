//! Per-name mutual exclusion for writers
//!
//! Drive has no create-or-replace primitive, so `store` is resolve, delete,
//! create. Two writers on one name interleaving those steps can leave two
//! files behind. Writers in this process take the name's lock first; writers
//! in other processes are not covered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Table of async locks keyed by reference name
#[derive(Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`
    pub async fn lock(&self, name: &str) -> NameGuard<'_> {
        let lock = self.table().entry(name.to_string()).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        NameGuard {
            locks: self,
            name: name.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of names currently locked or waited on
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to one name; released on drop
pub struct NameGuard<'a> {
    locks: &'a NameLocks,
    name: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.locks.table();
        // Table and this guard hold the only references: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.name);
        }
    }
}
