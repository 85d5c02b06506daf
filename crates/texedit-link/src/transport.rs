//! Network seam between the monitor and the backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use texedit_config::{BackendEndpoint, Config};

use crate::error::TransportError;

/// `User-Agent` header sent with every backend request.
pub const USER_AGENT: &str = concat!("texedit/", env!("CARGO_PKG_VERSION"));

const HEALTH_PATH: &str = "/health";

/// Operations the monitor needs from the backend.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Issues one health probe. Any success status counts as healthy.
    async fn probe_health(&self) -> Result<(), TransportError>;

    /// Posts `body` as JSON to `endpoint` and returns the raw response body
    /// of a success response.
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Vec<u8>, TransportError>;
}

/// [`BackendTransport`] speaking HTTP via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: BackendEndpoint,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the HTTP client cannot be
    /// initialised.
    pub fn new(
        endpoint: BackendEndpoint,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| TransportError::Client { source })?;
        Ok(Self {
            client,
            endpoint,
            probe_timeout,
            request_timeout,
        })
    }

    /// Builds a transport from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the HTTP client cannot be
    /// initialised.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(
            config.backend_url().clone(),
            config.probe_timeout(),
            config.request_timeout(),
        )
    }
}

fn ensure_success(url: &str, status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn probe_health(&self) -> Result<(), TransportError> {
        let url = self.endpoint.url_for(HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|source| TransportError::Send {
                url: url.clone(),
                source,
            })?;
        ensure_success(&url, response.status())
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint.url_for(endpoint);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Send {
                url: url.clone(),
                source,
            })?;
        ensure_success(&url, response.status())?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Body { url, source })?;
        Ok(bytes.to_vec())
    }
}
