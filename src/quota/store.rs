//! Per-principal remaining-quota store.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Remaining count assumed for principals never seen before, and restored by
/// `reset`.
pub const DEFAULT_QUOTA: i64 = 5;

/// A server-reported remaining count that is not a decimal integer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid remaining quota {value:?}")]
pub struct QuotaParseError {
    pub value: String,
}

/// Parse a `ratelimit-remaining` header value.
pub fn parse_remaining(value: &str) -> Result<i64, QuotaParseError> {
    value.trim().parse().map_err(|_| QuotaParseError {
        value: value.to_string(),
    })
}

/// Thread-safe handle to the remaining quota of each principal.
///
/// Cloning shares the underlying map, so the scheduler and the exchange loop
/// observe the same state.
#[derive(Debug, Clone, Default)]
pub struct QuotaStore {
    inner: Arc<DashMap<String, i64>>,
}

impl QuotaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining count for a principal, `DEFAULT_QUOTA` if unseen.
    pub fn remaining(&self, principal: &str) -> i64 {
        self.inner
            .get(principal)
            .map(|r| *r.value())
            .unwrap_or(DEFAULT_QUOTA)
    }

    /// Whether the principal may send another request.
    pub fn has_quota(&self, principal: &str) -> bool {
        self.remaining(principal) > 0
    }

    /// Refill the principal to `DEFAULT_QUOTA`.
    pub fn reset(&self, principal: &str) {
        self.inner.insert(principal.to_string(), DEFAULT_QUOTA);
    }

    /// Replace the principal's remaining count. Negative values are kept as-is.
    pub fn set_remaining(&self, principal: &str, value: i64) {
        self.inner.insert(principal.to_string(), value);
    }

    /// Number of principals with a recorded entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copy of all recorded entries, ordered by principal.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }
}
