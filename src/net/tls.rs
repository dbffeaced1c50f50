//! Certificate loading for the HTTPS listener.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::http::ServerError;

/// Load the PEM certificate and key named in `config`.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, ServerError> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    for (kind, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(ServerError::Tls(format!("{} not found: {}", kind, path.display())));
        }
    }

    let rustls = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| ServerError::Tls(e.to_string()))?;
    tracing::info!(cert = %cert_path.display(), "TLS certificate loaded");
    Ok(rustls)
}
