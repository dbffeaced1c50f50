//! Authentication and quota decisions for incoming requests.

use std::sync::Arc;
use std::time::Duration;

use crate::authority::counter::CounterPolicy;
use crate::authority::policy::{FixedPolicy, QuotaPolicy, RandomPolicy};
use crate::config::{AuthorityConfig, PolicyKind};
use crate::identity::{principal_from_header, Principal};
use crate::observability::metrics;

/// Response header carrying the remaining quota as a decimal integer.
pub const RATELIMIT_REMAINING: &str = "ratelimit-remaining";

/// Response header carrying the resolved principal.
pub const USER: &str = "user";

/// What the server reports back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    pub principal: Principal,
    pub remaining: i64,
}

/// Resolves principals and asks the configured policy for their quota.
#[derive(Debug, Clone)]
pub struct QuotaAuthority {
    policy: Arc<dyn QuotaPolicy>,
}

impl QuotaAuthority {
    pub fn new(policy: Arc<dyn QuotaPolicy>) -> Self {
        Self { policy }
    }

    /// Build the authority with the policy selected in configuration.
    pub fn from_config(config: &AuthorityConfig) -> Self {
        let policy: Arc<dyn QuotaPolicy> = match config.policy {
            PolicyKind::Random => Arc::new(RandomPolicy::new(config.max_remaining)),
            PolicyKind::Fixed => Arc::new(FixedPolicy(config.fixed_remaining)),
            PolicyKind::Counter => Arc::new(CounterPolicy::new(
                config.max_remaining.max(0) as u64,
                Duration::from_secs(config.window_secs),
            )),
        };
        tracing::info!(policy = ?config.policy, "Quota authority initialized");
        Self::new(policy)
    }

    /// Principal behind an `authorization` header; empty when absent or
    /// malformed.
    pub fn authenticate(&self, authorization: Option<&str>) -> Principal {
        principal_from_header(authorization)
    }

    pub fn remaining_quota(&self, principal: &str) -> i64 {
        self.policy.remaining(principal)
    }

    /// Authenticate and decide in one step.
    pub fn evaluate(&self, authorization: Option<&str>) -> QuotaDecision {
        let principal = self.authenticate(authorization);
        let remaining = self.remaining_quota(&principal);
        metrics::record_authority_decision(remaining);
        tracing::debug!(principal = %principal, remaining, "Quota decision");
        QuotaDecision {
            principal,
            remaining,
        }
    }
}
