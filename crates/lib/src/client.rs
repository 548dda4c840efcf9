//! # HTTP Fetcher
//!
//! One GET per URL with no retry and no rate limiting, but with an
//! explicit status check and a per-request timeout.

use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::errors::IdsError;
use crate::types::RawApiResponse;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, info};

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_EXCERPT: usize = 200;

/// Issues GET requests for the pipeline and the metadata resolver.
///
/// Implemented by [`IdsClient`] for live requests; tests substitute a stub.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, failing on transport errors and non-success statuses.
    async fn fetch(&self, url: &str) -> Result<RawApiResponse, IdsError>;
}

/// The live HTTP client.
#[derive(Clone, Debug)]
pub struct IdsClient {
    client: ReqwestClient,
}

impl IdsClient {
    /// Creates a client with the default request timeout.
    pub fn new() -> Result<Self, IdsError> {
        IdsClientBuilder::new().build()
    }

    /// Returns a builder for custom timeouts and user agents.
    pub fn builder() -> IdsClientBuilder {
        IdsClientBuilder::new()
    }
}

/// A builder for creating `IdsClient` instances.
#[derive(Debug, Clone)]
pub struct IdsClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for IdsClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
        }
    }
}

impl IdsClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the `IdsClient`.
    pub fn build(self) -> Result<IdsClient, IdsError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|e| IdsError::Client(e.to_string()))?;
        Ok(IdsClient { client })
    }
}

fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl Fetcher for IdsClient {
    async fn fetch(&self, url: &str) -> Result<RawApiResponse, IdsError> {
        info!("Fetching: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IdsError::network(url, describe_transport_error(e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdsError::network(url, describe_transport_error(e)))?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(IdsError::network(
                url,
                format!("Request failed with status {status}: {excerpt}"),
            ));
        }

        debug!(url, bytes = body.len(), "Received response");
        Ok(RawApiResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
