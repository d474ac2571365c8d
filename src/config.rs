use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::batch::MAX_APPLY_CONCURRENCY;
use crate::error::ConfigError;
use crate::fetch::MAX_FETCH_CONCURRENCY;
use crate::flag::FeatureFlag;

pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Settings for one reconciliation run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub token: String,
    pub project_id: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub fetch_concurrency: usize,
    pub apply_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            project_id: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_concurrency: MAX_FETCH_CONCURRENCY,
            apply_concurrency: MAX_APPLY_CONCURRENCY,
        }
    }
}

impl Config {
    pub fn new(token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::Invalid("GitLab token is required".to_string()));
        }
        if self.project_id.is_empty() {
            return Err(ConfigError::Invalid("GitLab project ID is required".to_string()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Reads the desired flag set from a YAML document holding a list of flags.
pub fn read_flags_from_yaml(path: impl AsRef<Path>) -> Result<Vec<FeatureFlag>, ConfigError> {
    let path = path.as_ref();
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml");
    if !is_yaml {
        return Err(ConfigError::Extension(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let flags = parse_flags(&content)?;
    debug!("Loaded {} flags from {}", flags.len(), path.display());
    Ok(flags)
}

pub fn parse_flags(content: &str) -> Result<Vec<FeatureFlag>, ConfigError> {
    // An empty document is an empty flag set.
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let flags: Vec<FeatureFlag> = serde_yaml::from_str(content)?;

    let mut seen = HashSet::new();
    for flag in &flags {
        if !seen.insert(flag.name.as_str()) {
            return Err(ConfigError::DuplicateFlag(flag.name.clone()));
        }
    }
    Ok(flags)
}
