//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (principal, outcome, status)
//! - Request ID flows from the server layers into its trace spans
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
