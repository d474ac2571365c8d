//! Concurrent retrieval of the complete remote flag set.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{AggregationError, Operation, RemoteError};
use crate::flag::FeatureFlag;
use crate::store::{cancellable, FlagStore};

/// Maximum number of page requests in flight at once.
pub const MAX_FETCH_CONCURRENCY: usize = 5;

/// Fetches every page of the remote flag set.
///
/// Page 1 is requested first to learn the page count and page size; it is
/// reused as the first page of the result. The remaining pages are fetched
/// concurrently, at most `concurrency` at a time, using the page size the
/// probe reported. Flags come back in no particular order. If any page
/// fails, the first failure observed is returned and nothing else.
pub async fn fetch_all<S>(
    store: Arc<S>,
    per_page: u32,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<FeatureFlag>, AggregationError>
where
    S: FlagStore + ?Sized + 'static,
{
    let probe = cancellable(
        cancel,
        Operation::ListPage { page: 1 },
        store.list_page(1, per_page),
    )
    .await?;

    let total_pages = probe.pagination.total_pages;
    if total_pages <= 1 {
        debug!("Remote flag set fits in a single page ({} flags)", probe.flags.len());
        return Ok(probe.flags);
    }

    // Keep the page size the server settled on so page numbering stays stable.
    let per_page = match probe.pagination.per_page {
        0 => per_page,
        reported => reported,
    };
    info!(
        "Fetching {} pages of feature flags ({} per page, {} total)",
        total_pages, per_page, probe.pagination.total
    );

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set: JoinSet<(u32, Result<Vec<FeatureFlag>, RemoteError>)> = JoinSet::new();
    let mut task_pages = HashMap::new();

    for page in 2..=total_pages {
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();

        let handle = join_set.spawn(async move {
            let op = Operation::ListPage { page };
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return (page, Err(RemoteError::Cancelled { op }));
            };

            let result = cancellable(&cancel, op, store.list_page(page, per_page))
                .await
                .map(|page| page.flags);
            (page, result)
        });
        task_pages.insert(handle.id(), page);
    }

    let mut flags = probe.flags;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((page, Ok(page_flags))) => {
                debug!("Fetched page {} with {} flags", page, page_flags.len());
                flags.extend(page_flags);
            }
            Ok((page, Err(err))) => {
                debug!("Page {} failed, discarding remaining pages", page);
                join_set.abort_all();
                return Err(err.into());
            }
            Err(join_err) => {
                join_set.abort_all();
                let page = task_pages.get(&join_err.id()).copied().unwrap_or_default();
                match join_err.try_into_panic() {
                    Ok(reason) => std::panic::resume_unwind(reason),
                    Err(_) => {
                        return Err(RemoteError::Cancelled {
                            op: Operation::ListPage { page },
                        }
                        .into())
                    }
                }
            }
        }
    }

    Ok(flags)
}
