//! Running backend calls against an operation deadline

use std::future::Future;

use tokio::time::{timeout_at, Instant};

use crate::error::{BackendError, StorageError};

/// Await one backend call, tagging failures with the operation name.
///
/// When the deadline passes first the call's future is dropped, which
/// aborts an in-flight HTTP request.
pub(crate) async fn call<T, F>(op: &'static str, deadline: Option<Instant>, request: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    let outcome = match deadline {
        Some(deadline) => timeout_at(deadline, request)
            .await
            .map_err(|_| StorageError::Timeout { op })?,
        None => request.await,
    };
    outcome.map_err(|source| StorageError::Io { op, source })
}
