use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The remote call a [`RemoteError`] belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListPage { page: u32 },
    Create { name: String },
    Delete { name: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ListPage { page } => write!(f, "listing feature flags page {}", page),
            Operation::Create { name } => write!(f, "creating feature flag {}", name),
            Operation::Delete { name } => write!(f, "deleting feature flag {}", name),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error while {op}")]
    Http {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error while {op}: unexpected status code {status}")]
    Status {
        op: Operation,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response while {op}")]
    Decode {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse {header} header while {op}: {value:?}")]
    Pagination {
        op: Operation,
        header: &'static str,
        value: String,
    },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("invalid request URL while {op}: {url}")]
    Url { op: Operation, url: String },

    #[error("cancelled while {op}")]
    Cancelled { op: Operation },
}

impl RemoteError {
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            RemoteError::Http { op, .. }
            | RemoteError::Status { op, .. }
            | RemoteError::Decode { op, .. }
            | RemoteError::Pagination { op, .. }
            | RemoteError::Url { op, .. }
            | RemoteError::Cancelled { op } => Some(op),
            RemoteError::Auth(_) | RemoteError::Build(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RemoteError::Cancelled { .. })
    }
}

/// The first page failure seen while retrieving the remote flag set.
#[derive(Debug, Error)]
#[error("failed to retrieve remote feature flags")]
pub struct AggregationError {
    #[from]
    pub source: RemoteError,
}

#[derive(Debug, Error)]
pub enum BatchError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{failed} of {total} operations failed")]
    Failed {
        failed: usize,
        total: usize,
        #[source]
        source: E,
    },

    #[error("batch task did not complete: {0}")]
    Aborted(String),
}

impl<E> BatchError<E>
where
    E: std::error::Error + 'static,
{
    /// The operation error surfaced for the batch, if any task reported one.
    pub fn error(&self) -> Option<&E> {
        match self {
            BatchError::Failed { source, .. } => Some(source),
            BatchError::Aborted(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Delete,
    Add,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Delete => "delete",
            Stage::Add => "add",
            Stage::Update => "update",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to retrieve existing feature flags")]
    Fetch(#[source] AggregationError),

    #[error("failed to delete feature flags")]
    Delete(#[source] BatchError<RemoteError>),

    #[error("failed to add feature flags")]
    Add(#[source] BatchError<RemoteError>),

    #[error("failed to update feature flags")]
    Update(#[source] BatchError<RemoteError>),
}

impl SyncError {
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Fetch(_) => Stage::Fetch,
            SyncError::Delete(_) => Stage::Delete,
            SyncError::Add(_) => Stage::Add,
            SyncError::Update(_) => Stage::Update,
        }
    }

    /// The remote call failure behind this stage error, when one was reported.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            SyncError::Fetch(err) => Some(&err.source),
            SyncError::Delete(err) | SyncError::Add(err) | SyncError::Update(err) => err.error(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("flags file must have .yaml extension: {0}")]
    Extension(PathBuf),

    #[error("error reading file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error unmarshalling YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate feature flag name in desired state: {0}")]
    DuplicateFlag(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
