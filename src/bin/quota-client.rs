//! quota-client: drives the quota-gated exchange against a quota-gate server
//! and prints the run report as JSON.

use std::path::PathBuf;

use clap::Parser;

use quota_gate::config::{load_or_default, validate_config, ConfigError, StalenessPolicy};
use quota_gate::exchange::{numbered_principals, ExchangeLoop, ExchangeSettings, HttpTransport};
use quota_gate::lifecycle::{trigger_on_signal, Shutdown};
use quota_gate::observability::{logging, metrics};
use quota_gate::quota::QuotaStore;

const DEFAULT_PORT: u16 = 8443;

#[derive(Parser)]
#[command(name = "quota-client")]
#[command(about = "Send quota-gated requests to a quota-gate server", long_about = None)]
struct Cli {
    /// Server host ("localhost") or base URL ("https://host:8443").
    server: Option<String>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra PEM certificate to trust (e.g. the server's self-signed cert).
    #[arg(long)]
    ca_cert: Option<String>,

    /// Run for this many seconds.
    #[arg(short, long, conflicts_with = "batches")]
    duration: Option<u64>,

    /// Run exactly this many batches.
    #[arg(short, long)]
    batches: Option<u32>,

    /// Requests admitted per batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of principals, named 0..n.
    #[arg(short, long)]
    principals: Option<usize>,

    /// Absorb each response before admitting the next request.
    #[arg(long)]
    live: bool,
}

fn server_url(server: &str) -> String {
    if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{}:{}", server, DEFAULT_PORT)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    let client = &mut config.client;
    if let Some(server) = cli.server {
        client.server_url = server_url(&server);
    }
    if cli.ca_cert.is_some() {
        client.ca_cert_path = cli.ca_cert;
    }
    if let Some(duration) = cli.duration {
        client.duration_secs = duration;
        client.batches = None;
    }
    if cli.batches.is_some() {
        client.batches = cli.batches;
    }
    if let Some(batch_size) = cli.batch_size {
        client.batch_size = batch_size;
    }
    if let Some(principals) = cli.principals {
        client.principals = principals;
    }
    if cli.live {
        client.staleness = StalenessPolicy::Live;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_tracing(&config.observability.log_level);
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let transport = HttpTransport::from_config(&config.client)?;
    let mut exchange = ExchangeLoop::new(
        QuotaStore::new(),
        transport,
        numbered_principals(config.client.principals),
        ExchangeSettings::from_config(&config.client),
    );

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    trigger_on_signal(shutdown);

    let report = exchange.run_until(Some(stop)).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
