//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before anything binds or connects
//! - Validate value ranges (timeouts > 0, batch size > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: QuotaGateConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{PolicyKind, QuotaGateConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &QuotaGateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("not a socket address: {}", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if let Some(tls) = &config.server.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::new("server.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::new("server.tls.key_path", "must not be empty"));
        }
    }

    if config.authority.policy == PolicyKind::Counter && config.authority.window_secs == 0 {
        errors.push(ValidationError::new("authority.window_secs", "must be > 0"));
    }

    match Url::parse(&config.client.server_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "client.server_url",
            format!("unsupported scheme: {}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("client.server_url", e.to_string())),
    }
    if config.client.request_timeout_secs == 0 {
        errors.push(ValidationError::new("client.request_timeout_secs", "must be > 0"));
    }
    if config.client.principals == 0 {
        errors.push(ValidationError::new("client.principals", "must be > 0"));
    }
    if config.client.batch_size == 0 {
        errors.push(ValidationError::new("client.batch_size", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&QuotaGateConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = QuotaGateConfig::default();
        config.server.bind_address = "not-an-addr".into();
        config.server.tls = Some(TlsConfig {
            cert_path: String::new(),
            key_path: "rsa.key".into(),
        });
        config.client.server_url = "ftp://localhost".into();
        config.client.batch_size = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "server.tls.cert_path",
                "client.server_url",
                "client.batch_size"
            ]
        );
    }

    #[test]
    fn test_counter_window() {
        let mut config = QuotaGateConfig::default();
        config.authority.window_secs = 0;
        // only checked for the counter policy
        assert!(validate_config(&config).is_ok());

        config.authority.policy = PolicyKind::Counter;
        assert_eq!(validate_config(&config).unwrap_err()[0].field, "authority.window_secs");
    }
}
