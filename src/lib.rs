//! Quota-gated request exchange.
//!
//! A client paces requests per principal against a locally tracked quota; the
//! echo server identifies the principal from its `authorization` header and
//! reports the remaining quota, which the client absorbs before admitting the
//! next requests.
//!
//! ```text
//!   quota-client                                   quota-gate (server)
//!  ┌──────────────────────────────┐               ┌──────────────────────────┐
//!  │ exchange::ExchangeLoop       │  GET /echo/p  │ http::EchoServer         │
//!  │   quota::RequestScheduler ───┼──────────────▶│   authority::engine      │
//!  │   quota::QuotaStore       ◀──┼───────────────┤     identity::codec      │
//!  │                              │ user,         │     authority::policy    │
//!  │                              │ ratelimit-    │                          │
//!  │                              │ remaining     │                          │
//!  └──────────────────────────────┘               └──────────────────────────┘
//! ```

pub mod authority;
pub mod config;
pub mod exchange;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod quota;

pub use authority::{QuotaAuthority, QuotaPolicy};
pub use config::QuotaGateConfig;
pub use exchange::{ExchangeLoop, HttpTransport};
pub use http::EchoServer;
pub use lifecycle::Shutdown;
pub use quota::{QuotaStore, RequestScheduler};
