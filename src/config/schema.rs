//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server
//! and the exchange client. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct QuotaGateConfig {
    /// Echo server settings.
    pub server: ServerConfig,

    /// Quota policy reported by the server.
    pub authority: AuthorityConfig,

    /// Exchange client settings.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Echo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            tls: None,
            request_timeout_secs: 30,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Which quota policy the server runs.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Uniform random value in `[0, max_remaining]`.
    #[default]
    Random,
    /// Always `fixed_remaining`.
    Fixed,
    /// `max_remaining` requests per `window_secs` window.
    Counter,
}

/// Quota authority configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub policy: PolicyKind,

    /// Upper bound for `random`, per-window limit for `counter`.
    pub max_remaining: i64,

    /// Value reported by `fixed`.
    pub fixed_remaining: i64,

    /// Window length in seconds for `counter`.
    pub window_secs: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Random,
            max_remaining: 5,
            fixed_remaining: 5,
            window_secs: 1,
        }
    }
}

/// How admission reads quota within a batch.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Admit the whole batch first, then send and absorb responses.
    #[default]
    StaleBatch,
    /// Absorb each response before admitting the next request.
    Live,
}

/// Exchange client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the echo server.
    pub server_url: String,

    /// PEM certificate to trust in addition to system roots.
    pub ca_cert_path: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Number of principals, named "0", "1", ...
    pub principals: usize,

    /// Requests admitted per batch.
    pub batch_size: usize,

    /// Run duration in seconds.
    pub duration_secs: u64,

    /// Run a fixed number of batches instead of a duration.
    pub batches: Option<u32>,

    pub staleness: StalenessPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "https://localhost:8443".to_string(),
            ca_cert_path: None,
            request_timeout_secs: 5,
            principals: 3,
            batch_size: 10,
            duration_secs: 2,
            batches: None,
            staleness: StalenessPolicy::StaleBatch,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
