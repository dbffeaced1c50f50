//! quota-gate echo server.
//!
//! Answers `GET /echo/{eid}` with status 200, identifying the caller from its
//! basic `authorization` header and reporting the caller's remaining quota in
//! the `user` and `ratelimit-remaining` headers.

use std::path::PathBuf;

use clap::Parser;

use quota_gate::config::{load_or_default, validate_config, ConfigError, TlsConfig};
use quota_gate::http::EchoServer;
use quota_gate::lifecycle::{trigger_on_signal, Shutdown};
use quota_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "quota-gate")]
#[command(about = "Echo server reporting per-principal remaining quota", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// PEM certificate; enables TLS together with `--key`.
    #[arg(long, requires = "key")]
    cert: Option<String>,

    /// PEM private key.
    #[arg(long, requires = "cert")]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let (Some(cert_path), Some(key_path)) = (cli.cert, cli.key) {
        config.server.tls = Some(TlsConfig {
            cert_path,
            key_path,
        });
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("quota-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        tls = config.server.tls.is_some(),
        policy = ?config.authority.policy,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    trigger_on_signal(shutdown.clone());

    EchoServer::from_config(&config)
        .serve(shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
