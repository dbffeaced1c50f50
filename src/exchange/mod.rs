//! Client-side exchange subsystem.
//!
//! # Data Flow
//! ```text
//! runner.rs (ExchangeLoop, one batch at a time)
//!     → quota::RequestScheduler (admit or refill each principal)
//!     → transport.rs (send admitted requests)
//!     → runner.rs (read `user` + `ratelimit-remaining`)
//!     → quota::QuotaStore (set_remaining)
//!     → report.rs (per-batch and per-run counters)
//! ```
//!
//! # Design Decisions
//! - Failures stay local: a failed request never stops its batch or the run
//! - Unparsable quota reports are dropped, the previous value stays
//! - Stale-batch admission is the default; live admission is opt-in

pub mod report;
pub mod runner;
pub mod transport;

pub use report::{BatchReport, RunReport};
pub use runner::{numbered_principals, ExchangeLoop, ExchangeSettings, Termination};
pub use transport::{ExchangeResponse, HttpTransport, Transport, TransportError};
