// src/lib.rs
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;

pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod flag;
pub mod pagination;
pub mod store;
pub mod sync;
mod diff_tests;

pub use crate::config::Config;
pub use crate::diff::Plan;
pub use crate::error::{AggregationError, BatchError, ConfigError, Operation, RemoteError, Stage, SyncError};
pub use crate::flag::{FeatureFlag, Scope, Strategy, Value};
pub use crate::pagination::Pagination;
pub use crate::store::{FlagStore, Page};
pub use crate::sync::{Reconciler, SyncReport};

use crate::config::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};

const PRIVATE_TOKEN_HEADER: HeaderName = HeaderName::from_static("private-token");

/// HTTP gateway to the GitLab feature flags API of a single project.
pub struct Client {
    base_url: String,
    http_client: reqwest::Client,
    token: String,
    project_id: String,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn debug_info(&self) -> String {
        format!(
            "Client {{ base_url: {}, project_id: {} }}",
            self.base_url, self.project_id
        )
    }

    fn flags_url(&self) -> String {
        format!("{}/projects/{}/feature_flags", self.base_url, self.project_id)
    }

    // The name is pushed as a single path segment so `/`, spaces and the
    // like are percent-encoded.
    fn flag_url(&self, name: &str, op: &Operation) -> Result<reqwest::Url, RemoteError> {
        let invalid = || RemoteError::Url {
            op: op.clone(),
            url: self.flags_url(),
        };
        let mut url = reqwest::Url::parse(&self.flags_url()).map_err(|_| invalid())?;
        url.path_segments_mut().map_err(|_| invalid())?.push(name);
        Ok(url)
    }

    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Flagman-Rust"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token = HeaderValue::from_str(&self.token)
            .map_err(|_| RemoteError::Auth("token contains characters not allowed in a header".to_string()))?;
        headers.insert(PRIVATE_TOKEN_HEADER, token);
        Ok(headers)
    }
}

#[async_trait]
impl FlagStore for Client {
    async fn list_page(&self, page: u32, per_page: u32) -> Result<Page, RemoteError> {
        let op = Operation::ListPage { page };
        let url = format!("{}?page={}&per_page={}", self.flags_url(), page, per_page);
        debug!("GET {}", url);

        let response = self.http_client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|source| RemoteError::Http { op: op.clone(), source })?;

        if response.status() != StatusCode::OK {
            return Err(RemoteError::Status {
                op,
                status: response.status(),
            });
        }

        let pagination = Pagination::from_headers(response.headers(), page)?;
        let flags = response
            .json::<Vec<FeatureFlag>>()
            .await
            .map_err(|source| RemoteError::Decode { op, source })?;

        Ok(Page { flags, pagination })
    }

    async fn create(&self, flag: &FeatureFlag) -> Result<(), RemoteError> {
        let op = Operation::Create { name: flag.name.clone() };
        debug!("POST {} name={}", self.flags_url(), flag.name);

        let response = self.http_client
            .post(self.flags_url())
            .headers(self.headers()?)
            .json(flag)
            .send()
            .await
            .map_err(|source| RemoteError::Http { op: op.clone(), source })?;

        if response.status() != StatusCode::CREATED {
            return Err(RemoteError::Status {
                op,
                status: response.status(),
            });
        }

        Ok(())
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), RemoteError> {
        let op = Operation::Delete { name: name.to_string() };
        let url = self.flag_url(name, &op)?;
        debug!("DELETE {}", url);

        let response = self.http_client
            .delete(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|source| RemoteError::Http { op: op.clone(), source })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("Feature flag {} already absent", name);
                Ok(())
            }
            status => Err(RemoteError::Status { op, status }),
        }
    }
}

pub struct ClientBuilder {
    base_url: String,
    token: String,
    project_id: String,
    timeout: Duration,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            project_id: String::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn with_project_id(mut self, project_id: &str) -> Self {
        self.project_id = project_id.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client, RemoteError> {
        if self.token.is_empty() {
            return Err(RemoteError::Auth("GitLab token is required".to_string()));
        }
        if self.project_id.is_empty() {
            return Err(RemoteError::Auth("GitLab project ID is required".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(RemoteError::Build)?;

        Ok(Client {
            base_url: self.base_url,
            http_client,
            token: self.token,
            project_id: self.project_id,
        })
    }
}
