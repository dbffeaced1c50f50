//! Admission decisions for outbound requests.

use reqwest::Method;

use crate::identity::{encode_credential, Principal};
use crate::quota::store::QuotaStore;

/// A request ready to be sent for a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub principal: Principal,
    pub method: Method,
    /// Unencoded path segments below the server base URL, e.g.
    /// `["echo", "alice"]`. The transport percent-encodes each one.
    pub segments: Vec<String>,
    /// Value of the `authorization` header.
    pub authorization: String,
}

impl RequestDescriptor {
    pub fn for_principal(principal: &str) -> Self {
        Self {
            principal: principal.to_string(),
            method: Method::GET,
            segments: vec!["echo".to_string(), principal.to_string()],
            authorization: encode_credential(principal),
        }
    }

    /// Human-readable path, for logs only.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The principal has quota; send this request.
    Dispatch(RequestDescriptor),
    /// The principal was exhausted and has been refilled; nothing is sent
    /// this round.
    Skipped,
}

/// Decides whether a principal may send, based on the shared `QuotaStore`.
///
/// Exhaustion is answered with an immediate reset rather than waiting for a
/// time boundary, so a skipped principal is admitted again on its next turn.
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    store: QuotaStore,
}

impl RequestScheduler {
    pub fn new(store: QuotaStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &QuotaStore {
        &self.store
    }

    pub fn should_send(&self, principal: &str) -> bool {
        self.store.has_quota(principal)
    }

    /// Admit the principal or refill it.
    pub fn schedule(&self, principal: &str) -> Admission {
        if !self.should_send(principal) {
            tracing::info!(
                principal = %principal,
                remaining = self.store.remaining(principal),
                "Skipping principal over quota"
            );
            self.store.reset(principal);
            return Admission::Skipped;
        }

        Admission::Dispatch(RequestDescriptor::for_principal(principal))
    }
}
