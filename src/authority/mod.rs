//! Server-side quota authority.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → engine.rs (authenticate: decode `authorization`, fail open)
//!     → policy.rs / counter.rs (remaining quota for the principal)
//!     → QuotaDecision rendered by the HTTP layer as
//!       `user` + `ratelimit-remaining` headers
//! ```
//!
//! # Design Decisions
//! - The policy is pluggable; the HTTP layer never knows which one runs
//! - Every request gets an answer, anonymous callers included
//! - Header names are part of the wire contract and never change

pub mod counter;
pub mod engine;
pub mod policy;

pub use counter::CounterPolicy;
pub use engine::{QuotaAuthority, QuotaDecision, RATELIMIT_REMAINING, USER};
pub use policy::{FixedPolicy, QuotaPolicy, RandomPolicy};
