//! Bounded-concurrency application of homogeneous operations.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::BatchError;

/// Maximum number of remote operations in flight at once within a stage.
pub const MAX_APPLY_CONCURRENCY: usize = 5;

/// Applies `operation` to every item, at most `limit` at a time.
///
/// Each item gets its own task once an admission permit is free. Failures
/// do not stop the batch: every item is attempted and every task is joined
/// before the result is decided. If any operation failed, one of the
/// errors is returned together with the failure count. Side effects of the
/// operations that succeeded are kept.
pub async fn apply_all<T, E, F, Fut>(
    items: Vec<T>,
    operation: F,
    limit: usize,
) -> Result<(), BatchError<E>>
where
    T: Send + 'static,
    E: std::error::Error + Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(());
    }

    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();

    for item in items {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => {
                while join_set.join_next().await.is_some() {}
                return Err(BatchError::Aborted(err.to_string()));
            }
        };
        let task = operation(item);
        join_set.spawn(async move {
            let result = task.await;
            drop(permit);
            result
        });
    }

    let mut first_error = None;
    let mut failed = 0;
    let mut aborted = None;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                failed += 1;
                debug!("Batch operation failed: {}", err);
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                warn!("Batch task did not complete: {}", join_err);
                aborted.get_or_insert(join_err.to_string());
            }
        }
    }

    match (first_error, aborted) {
        (Some(source), _) => Err(BatchError::Failed {
            failed,
            total,
            source,
        }),
        (None, Some(reason)) => Err(BatchError::Aborted(reason)),
        (None, None) => Ok(()),
    }
}
