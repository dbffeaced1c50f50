//! Request transport for the exchange loop.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::{Certificate, Client};
use thiserror::Error;
use url::Url;

use crate::authority::{RATELIMIT_REMAINING, USER};
use crate::config::ClientConfig;
use crate::identity::AUTHORIZATION;
use crate::quota::RequestDescriptor;

/// Failure of a single request. Never fatal to the loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// The transport itself could not be built.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// The parts of a response the exchange loop cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeResponse {
    pub status: u16,
    /// Value of the `user` header, if present.
    pub user: Option<String>,
    /// Raw value of the `ratelimit-remaining` header, if present.
    pub remaining: Option<String>,
    /// Informational only, never parsed.
    pub body: String,
}

/// Sends one request and returns the server's answer.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<ExchangeResponse, TransportError>> + Send;
}

/// HTTP(S) transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use a preconfigured client.
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Build from client configuration, trusting `ca_cert_path` if set.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(&config.server_url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(path) = &config.ca_cert_path {
            builder = builder.add_root_certificate(load_certificate(Path::new(path))?);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        tracing::info!(server = %base_url, "HTTP transport ready");
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a request. Each segment is percent-encoded, so `/`,
    /// `?` and `#` inside a principal stay inside its segment.
    pub fn request_url(&self, request: &RequestDescriptor) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .clear()
            .extend(&request.segments);
        Ok(url)
    }
}

fn load_certificate(path: &Path) -> Result<Certificate, TransportError> {
    let pem = std::fs::read(path)
        .map_err(|e| TransportError::Setup(format!("reading {}: {}", path.display(), e)))?;
    Certificate::from_pem(&pem).map_err(|e| TransportError::Setup(e.to_string()))
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ExchangeResponse, TransportError> {
        let url = self.request_url(request)?;

        let response = self
            .client
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, &request.authorization)
            .send()
            .await?;

        let status = response.status().as_u16();
        let user = header_string(&response, USER);
        let remaining = header_string(&response, RATELIMIT_REMAINING);
        let body = response.text().await?;

        Ok(ExchangeResponse {
            status,
            user,
            remaining,
            body,
        })
    }
}
