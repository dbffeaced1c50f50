//! Client-side quota tracking.
//!
//! # Data Flow
//! ```text
//! scheduler.rs (should_send / schedule)
//!     → store.rs (has_quota, reset on exhaustion)
//!     → RequestDescriptor handed to the exchange loop
//!
//! Server response:
//!     → store.rs (set_remaining with the reported value)
//! ```
//!
//! # Design Decisions
//! - Unknown principals are assumed to have a full quota
//! - Writes are verbatim; values are only interpreted at admission time
//! - Exhaustion triggers an immediate refill (no time window)

pub mod scheduler;
pub mod store;

pub use scheduler::{Admission, RequestDescriptor, RequestScheduler};
pub use store::{parse_remaining, QuotaParseError, QuotaStore, DEFAULT_QUOTA};
