//! flagman: converge a GitLab project's feature flags onto a YAML file.
//!
//! ```text
//! flagman --gitlab-token <token> --gitlab-project-id <id> [--flags-file feature_flags.yaml] [--dry-run]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use flagman::batch::MAX_APPLY_CONCURRENCY;
use flagman::config::{read_flags_from_yaml, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use flagman::{Config, Reconciler};

#[derive(Parser, Debug)]
#[command(
    name = "flagman",
    version,
    about = "Synchronize GitLab feature flags with a YAML definition file",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML file with the desired feature flags.
    #[arg(long, env = "FLAGMAN_FLAGS_FILE", default_value = "feature_flags.yaml")]
    flags_file: PathBuf,

    /// Base URL of the GitLab API.
    #[arg(long = "gitlab-base", env = "GITLAB_BASE", default_value = DEFAULT_BASE_URL)]
    gitlab_base: String,

    /// GitLab access token.
    #[arg(long = "gitlab-token", env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: String,

    /// GitLab project ID or URL-encoded path.
    #[arg(long = "gitlab-project-id", env = "GITLAB_PROJECT_ID")]
    gitlab_project_id: String,

    /// Timeout for a single GitLab request, in seconds.
    #[arg(long = "gitlab-request-timeout", env = "GITLAB_REQUEST_TIMEOUT", default_value_t = 10)]
    gitlab_request_timeout: u64,

    /// Number of flags requested per page.
    #[arg(long, env = "FLAGMAN_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Maximum number of GitLab requests in flight at once.
    #[arg(long, env = "FLAGMAN_CONCURRENCY", default_value_t = MAX_APPLY_CONCURRENCY)]
    concurrency: usize,

    /// Compute and log the changes without applying them.
    #[arg(long, env = "FLAGMAN_DRY_RUN")]
    dry_run: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            base_url: self.gitlab_base.clone(),
            token: self.gitlab_token.clone(),
            project_id: self.gitlab_project_id.clone(),
            request_timeout: Duration::from_secs(self.gitlab_request_timeout),
            page_size: self.page_size,
            fetch_concurrency: self.concurrency,
            apply_concurrency: self.concurrency,
        }
    }

    fn log_args(&self) {
        info!(
            "Using parameters: flags_file={:?} gitlab_base={:?} gitlab_project_id={:?} gitlab_request_timeout={}s dry_run={}",
            self.flags_file,
            self.gitlab_base,
            self.gitlab_project_id,
            self.gitlab_request_timeout,
            self.dry_run,
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    cli.log_args();

    let config = cli.config();
    config.validate()?;

    let flags = read_flags_from_yaml(&cli.flags_file).with_context(|| {
        format!("Error reading feature flags from file {:?}", cli.flags_file)
    })?;

    let reconciler = Reconciler::from_config(&config).context("Error creating GitLab client")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            ctrl_c_cancel.cancel();
        }
    });

    if cli.dry_run {
        let plan = reconciler
            .plan(&flags, &cancel)
            .await
            .context("Error planning feature flag sync")?;
        for name in &plan.to_delete {
            info!("Would delete {}", name);
        }
        for flag in &plan.to_add {
            info!("Would add {}", flag.name);
        }
        for flag in &plan.to_update {
            info!("Would update {}", flag.name);
        }
        info!("Dry run: {} changes, {} flags unchanged", plan.len(), plan.unchanged.len());
        return Ok(());
    }

    let report = reconciler
        .sync(&flags, &cancel)
        .await
        .context("Error syncing feature flags")?;
    info!(
        "Finished in {} ms: {} deleted, {} added, {} updated, {} unchanged",
        (report.finished_at - report.started_at).num_milliseconds(),
        report.deleted,
        report.added,
        report.updated,
        report.unchanged,
    );

    Ok(())
}
