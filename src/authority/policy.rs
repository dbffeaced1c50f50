//! Quota policies.

use rand::Rng;

/// Decides the remaining quota reported for a principal.
///
/// Called once per request, after authentication. The empty principal stands
/// for anonymous callers.
pub trait QuotaPolicy: Send + Sync + std::fmt::Debug {
    fn remaining(&self, principal: &str) -> i64;
}

/// Reports a uniformly random remaining count in `[0, max]`, ignoring usage.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    max: i64,
}

impl RandomPolicy {
    pub fn new(max: i64) -> Self {
        Self { max: max.max(0) }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new(crate::quota::DEFAULT_QUOTA)
    }
}

impl QuotaPolicy for RandomPolicy {
    fn remaining(&self, _principal: &str) -> i64 {
        rand::thread_rng().gen_range(0..=self.max)
    }
}

/// Always reports the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub i64);

impl QuotaPolicy for FixedPolicy {
    fn remaining(&self, _principal: &str) -> i64 {
        self.0
    }
}
