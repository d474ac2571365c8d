//! Reconciliation of the desired flag set against the remote service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::batch::apply_all;
use crate::config::Config;
use crate::diff::{diff, Plan};
use crate::error::{Operation, RemoteError, SyncError};
use crate::fetch::fetch_all;
use crate::flag::FeatureFlag;
use crate::store::{cancellable, FlagStore};
use crate::Client;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub deleted: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn synced(&self) -> usize {
        self.deleted + self.added + self.updated
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    page_size: u32,
    fetch_concurrency: usize,
    apply_concurrency: usize,
}

pub struct Reconciler<S: ?Sized> {
    store: Arc<S>,
    limits: Limits,
}

impl Reconciler<Client> {
    /// Builds a reconciler talking to the GitLab project named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .with_base_url(&config.base_url)
            .with_token(&config.token)
            .with_project_id(&config.project_id)
            .with_timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(Arc::new(client), config))
    }
}

impl<S> Reconciler<S>
where
    S: FlagStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            limits: Limits {
                page_size: config.page_size,
                fetch_concurrency: config.fetch_concurrency,
                apply_concurrency: config.apply_concurrency,
            },
        }
    }

    /// Fetches the remote flag set and diffs it against `desired`.
    pub async fn plan(
        &self,
        desired: &[FeatureFlag],
        cancel: &CancellationToken,
    ) -> Result<Plan, SyncError> {
        info!("Total flags in config: {}", desired.len());

        let remote = fetch_all(
            Arc::clone(&self.store),
            self.limits.page_size,
            self.limits.fetch_concurrency,
            cancel,
        )
        .await
        .map_err(SyncError::Fetch)?;
        info!("Total flags found remotely: {}", remote.len());

        let plan = diff(desired, &remote);
        info!("Flags to delete: {}", plan.to_delete.len());
        info!("Flags to add: {}", plan.to_add.len());
        info!("Flags to update: {}", plan.to_update.len());
        debug!("Flags unchanged: {}", plan.unchanged.len());

        Ok(plan)
    }

    /// Applies a plan stage by stage: deletes, then adds, then updates.
    ///
    /// A stage only starts once the previous one has fully finished, and the
    /// first failing stage ends the run. Updates replace the remote flag by
    /// deleting it and creating the desired version; if the create fails the
    /// flag stays deleted.
    pub async fn apply(&self, plan: Plan, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        self.apply_since(plan, cancel, Utc::now()).await
    }

    async fn apply_since(
        &self,
        plan: Plan,
        cancel: &CancellationToken,
        started_at: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        let limit = self.limits.apply_concurrency;
        let deleted = plan.to_delete.len();
        let added = plan.to_add.len();
        let updated = plan.to_update.len();

        info!("Synchronization process started");

        let store = Arc::clone(&self.store);
        let token = cancel.clone();
        apply_all(
            plan.to_delete,
            move |name: String| delete_flag(Arc::clone(&store), token.clone(), name),
            limit,
        )
        .await
        .map_err(SyncError::Delete)?;

        let store = Arc::clone(&self.store);
        let token = cancel.clone();
        apply_all(
            plan.to_add,
            move |flag: FeatureFlag| create_flag(Arc::clone(&store), token.clone(), flag),
            limit,
        )
        .await
        .map_err(SyncError::Add)?;

        let store = Arc::clone(&self.store);
        let token = cancel.clone();
        apply_all(
            plan.to_update,
            move |flag: FeatureFlag| replace_flag(Arc::clone(&store), token.clone(), flag),
            limit,
        )
        .await
        .map_err(SyncError::Update)?;

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            deleted,
            added,
            updated,
            unchanged: plan.unchanged.len(),
        };
        info!("Synced {} flags successfully", report.synced());
        Ok(report)
    }

    /// Converges the remote flag set onto `desired`.
    pub async fn sync(
        &self,
        desired: &[FeatureFlag],
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let plan = self.plan(desired, cancel).await?;
        self.apply_since(plan, cancel, started_at).await
    }
}

async fn delete_flag<S>(store: Arc<S>, cancel: CancellationToken, name: String) -> Result<(), RemoteError>
where
    S: FlagStore + ?Sized,
{
    let op = Operation::Delete { name: name.clone() };
    cancellable(&cancel, op, store.delete_by_name(&name)).await
}

async fn create_flag<S>(
    store: Arc<S>,
    cancel: CancellationToken,
    flag: FeatureFlag,
) -> Result<(), RemoteError>
where
    S: FlagStore + ?Sized,
{
    let op = Operation::Create {
        name: flag.name.clone(),
    };
    cancellable(&cancel, op, store.create(&flag)).await
}

async fn replace_flag<S>(
    store: Arc<S>,
    cancel: CancellationToken,
    flag: FeatureFlag,
) -> Result<(), RemoteError>
where
    S: FlagStore + ?Sized,
{
    let delete_op = Operation::Delete {
        name: flag.name.clone(),
    };
    cancellable(&cancel, delete_op, store.delete_by_name(&flag.name)).await?;
    create_flag(store, cancel, flag).await
}
