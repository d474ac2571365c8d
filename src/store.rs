use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Operation, RemoteError};
use crate::flag::FeatureFlag;
use crate::pagination::Pagination;

/// One page of the remote flag set.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub flags: Vec<FeatureFlag>,
    pub pagination: Pagination,
}

/// The remote flag-management service, as seen by the reconciler.
///
/// Implementations must be safe to call from many tasks at once: pages are
/// fetched and operations applied concurrently.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn list_page(&self, page: u32, per_page: u32) -> Result<Page, RemoteError>;

    /// Fails unless the service reports the flag as created.
    async fn create(&self, flag: &FeatureFlag) -> Result<(), RemoteError>;

    /// Succeeds when the flag was deleted or did not exist.
    async fn delete_by_name(&self, name: &str) -> Result<(), RemoteError>;
}

/// Runs a remote call unless `token` fires first.
///
/// A token that is already cancelled wins over a ready call, so operations
/// that have not started yet fail without touching the remote.
pub async fn cancellable<T, F>(
    token: &CancellationToken,
    op: Operation,
    call: F,
) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RemoteError::Cancelled { op }),
        result = call => result,
    }
}
