//! The quota-gated exchange loop.
//!
//! Each batch walks the principals in round-robin order. Admission consults
//! the shared `QuotaStore`; admitted requests go to the transport and every
//! response's `user` / `ratelimit-remaining` pair is written back to the
//! store. How admission and absorption interleave is set by
//! `StalenessPolicy`.

use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::config::{ClientConfig, StalenessPolicy};
use crate::exchange::report::{BatchReport, RunReport};
use crate::exchange::transport::{ExchangeResponse, Transport, TransportError};
use crate::identity::Principal;
use crate::observability::metrics;
use crate::quota::{parse_remaining, Admission, QuotaStore, RequestDescriptor, RequestScheduler};

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Start no new batch once this much wall-clock time has passed.
    Duration(Duration),
    /// Run exactly this many batches.
    Batches(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub batch_size: usize,
    pub staleness: StalenessPolicy,
    pub termination: Termination,
}

impl ExchangeSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        let termination = match config.batches {
            Some(n) => Termination::Batches(n),
            None => Termination::Duration(Duration::from_secs(config.duration_secs)),
        };
        Self {
            batch_size: config.batch_size,
            staleness: config.staleness,
            termination,
        }
    }
}

/// Principals named "0", "1", ... "n-1".
pub fn numbered_principals(count: usize) -> Vec<Principal> {
    (0..count).map(|i| i.to_string()).collect()
}

/// Drives batches of quota-gated requests against a transport.
pub struct ExchangeLoop<T> {
    scheduler: RequestScheduler,
    transport: T,
    principals: Vec<Principal>,
    cursor: usize,
    settings: ExchangeSettings,
}

impl<T: Transport> ExchangeLoop<T> {
    pub fn new(
        store: QuotaStore,
        transport: T,
        principals: Vec<Principal>,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            scheduler: RequestScheduler::new(store),
            transport,
            principals,
            cursor: 0,
            settings,
        }
    }

    pub fn store(&self) -> &QuotaStore {
        self.scheduler.store()
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run until the configured termination is reached.
    pub async fn run(&mut self) -> RunReport {
        self.run_until(None).await
    }

    /// Like `run`, but also stops before the next batch once `shutdown` fires.
    pub async fn run_until(&mut self, mut shutdown: Option<broadcast::Receiver<()>>) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();

        if self.principals.is_empty() || self.settings.batch_size == 0 {
            tracing::warn!("No principals or empty batch size, nothing to exchange");
            report.final_quota = self.store().snapshot();
            return report;
        }

        tracing::info!(
            principals = self.principals.len(),
            batch_size = self.settings.batch_size,
            staleness = ?self.settings.staleness,
            termination = ?self.settings.termination,
            "Exchange starting"
        );

        loop {
            let finished = match self.settings.termination {
                Termination::Duration(limit) => started.elapsed() >= limit,
                Termination::Batches(limit) => report.batches >= limit,
            };
            if finished {
                break;
            }
            if shutdown_requested(&mut shutdown) {
                tracing::info!("Shutdown requested, stopping exchange");
                break;
            }

            let batch = self.run_batch().await;
            report.totals.merge(&batch);
            report.batches += 1;
        }

        report.elapsed_ms = started.elapsed().as_millis();
        report.final_quota = self.store().snapshot();

        tracing::info!(
            batches = report.batches,
            dispatched = report.totals.dispatched,
            skipped = report.totals.skipped,
            failed = report.totals.failed,
            elapsed_ms = report.elapsed_ms as u64,
            "Exchange finished"
        );
        report
    }

    /// Admit, send and absorb one batch of `batch_size` turns.
    pub async fn run_batch(&mut self) -> BatchReport {
        let round: Vec<Principal> = (0..self.settings.batch_size)
            .filter_map(|_| self.next_principal())
            .collect();

        tracing::info!(requests = round.len(), "Sending batch");
        let report = match self.settings.staleness {
            StalenessPolicy::StaleBatch => self.exchange_stale(&round).await,
            StalenessPolicy::Live => self.exchange_live(&round).await,
        };
        tracing::info!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            absorbed = report.absorbed,
            discarded = report.discarded,
            failed = report.failed,
            "Batch complete"
        );
        report
    }

    fn next_principal(&mut self) -> Option<Principal> {
        if self.principals.is_empty() {
            return None;
        }
        let principal = self.principals[self.cursor % self.principals.len()].clone();
        self.cursor = (self.cursor + 1) % self.principals.len();
        Some(principal)
    }

    /// Gather every admission first, then resolve responses as they arrive.
    async fn exchange_stale(&self, round: &[Principal]) -> BatchReport {
        let mut report = BatchReport::default();
        let pending: Vec<RequestDescriptor> = round
            .iter()
            .filter_map(|principal| self.admit(principal, &mut report))
            .collect();

        let mut in_flight: FuturesUnordered<_> =
            pending.iter().map(|request| self.dispatch(request)).collect();
        while let Some((request, result)) = in_flight.next().await {
            self.absorb(request, result, &mut report);
        }
        report
    }

    /// Absorb each response before the next admission.
    async fn exchange_live(&self, round: &[Principal]) -> BatchReport {
        let mut report = BatchReport::default();
        for principal in round {
            if let Some(request) = self.admit(principal, &mut report) {
                let (request, result) = self.dispatch(&request).await;
                self.absorb(request, result, &mut report);
            }
        }
        report
    }

    fn admit(&self, principal: &str, report: &mut BatchReport) -> Option<RequestDescriptor> {
        match self.scheduler.schedule(principal) {
            Admission::Dispatch(request) => {
                report.dispatched += 1;
                metrics::record_admission("dispatched");
                Some(request)
            }
            Admission::Skipped => {
                report.skipped += 1;
                metrics::record_admission("skipped");
                None
            }
        }
    }

    async fn dispatch<'a>(
        &self,
        request: &'a RequestDescriptor,
    ) -> (&'a RequestDescriptor, Result<ExchangeResponse, TransportError>) {
        let start = Instant::now();
        tracing::debug!(principal = %request.principal, path = %request.path(), "Dispatching request");
        let result = self.transport.send(request).await;
        metrics::record_round_trip(start);
        (request, result)
    }

    fn absorb(
        &self,
        request: &RequestDescriptor,
        result: Result<ExchangeResponse, TransportError>,
        report: &mut BatchReport,
    ) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(principal = %request.principal, error = %e, "Request failed");
                report.failed += 1;
                metrics::record_admission("failed");
                return;
            }
        };

        tracing::debug!(
            principal = %request.principal,
            status = response.status,
            body = %response.body,
            "Response received"
        );

        let Some(user) = response.user.as_deref() else {
            tracing::warn!(principal = %request.principal, "Response has no user header, ignoring");
            report.discarded += 1;
            metrics::record_update("discarded");
            return;
        };

        match response.remaining.as_deref().map(parse_remaining) {
            Some(Ok(remaining)) => {
                self.store().set_remaining(user, remaining);
                report.absorbed += 1;
                metrics::record_update("absorbed");
                tracing::debug!(user = %user, remaining, "Quota updated");
            }
            Some(Err(e)) => {
                tracing::warn!(user = %user, error = %e, "Discarding quota update");
                report.discarded += 1;
                metrics::record_update("discarded");
            }
            None => {
                tracing::warn!(user = %user, "Response has no remaining quota, ignoring");
                report.discarded += 1;
                metrics::record_update("discarded");
            }
        }
    }
}

fn shutdown_requested(shutdown: &mut Option<broadcast::Receiver<()>>) -> bool {
    match shutdown {
        Some(rx) => matches!(rx.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_))),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::quota::DEFAULT_QUOTA;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Reply = fn(&str) -> Result<ExchangeResponse, TransportError>;

    /// Answers from a fixed function and records who was sent.
    struct StubTransport {
        reply: Reply,
        sent: Mutex<Vec<Principal>>,
    }

    impl StubTransport {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<Principal> {
            self.sent.lock().unwrap().clone()
        }

        fn counts(&self) -> HashMap<Principal, usize> {
            let mut counts = HashMap::new();
            for p in self.sent() {
                *counts.entry(p).or_insert(0) += 1;
            }
            counts
        }
    }

    impl Transport for StubTransport {
        async fn send(
            &self,
            request: &RequestDescriptor,
        ) -> Result<ExchangeResponse, TransportError> {
            self.sent.lock().unwrap().push(request.principal.clone());
            (self.reply)(&request.principal)
        }
    }

    fn reply_with(user: &str, remaining: &str) -> Result<ExchangeResponse, TransportError> {
        Ok(ExchangeResponse {
            status: 200,
            user: Some(user.to_string()),
            remaining: Some(remaining.to_string()),
            body: format!("Hello World {user}"),
        })
    }

    fn exhausting(principal: &str) -> Result<ExchangeResponse, TransportError> {
        reply_with(principal, "0")
    }

    fn generous(principal: &str) -> Result<ExchangeResponse, TransportError> {
        reply_with(principal, "3")
    }

    fn settings(batch_size: usize, staleness: StalenessPolicy) -> ExchangeSettings {
        ExchangeSettings {
            batch_size,
            staleness,
            termination: Termination::Batches(1),
        }
    }

    fn three_principals(
        reply: Reply,
        staleness: StalenessPolicy,
    ) -> ExchangeLoop<StubTransport> {
        ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(reply),
            numbered_principals(3),
            settings(10, staleness),
        )
    }

    #[tokio::test]
    async fn test_alice_exhaustion_and_reset() {
        let mut exchange = ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(exhausting),
            vec!["alice".to_string()],
            settings(1, StalenessPolicy::StaleBatch),
        );
        assert!(exchange.scheduler().should_send("alice"));

        let first = exchange.run_batch().await;
        assert_eq!(first.dispatched, 1);
        assert_eq!(first.absorbed, 1);
        assert_eq!(exchange.store().remaining("alice"), 0);
        assert!(!exchange.scheduler().should_send("alice"));

        let second = exchange.run_batch().await;
        assert_eq!(second.skipped, 1);
        assert_eq!(second.dispatched, 0);
        assert_eq!(exchange.store().remaining("alice"), DEFAULT_QUOTA);
        assert!(exchange.scheduler().should_send("alice"));
        assert_eq!(exchange.transport().sent(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_batch_dispatches_whole_batch() {
        let mut exchange = three_principals(exhausting, StalenessPolicy::StaleBatch);

        let report = exchange.run_batch().await;
        assert_eq!(report.dispatched, 10);
        assert_eq!(report.skipped, 0);
        // every response reported 0, yet no principal was held back mid-batch
        for count in exchange.transport().counts().values() {
            assert!(*count >= 3);
        }
        assert!(!exchange.scheduler().should_send("0"));

        // next batch: each principal's first turn refills it, the rest go out
        let report = exchange.run_batch().await;
        assert_eq!(report.skipped, 3);
        assert_eq!(report.dispatched, 7);
    }

    #[tokio::test]
    async fn test_live_sees_each_response() {
        let mut exchange = three_principals(exhausting, StalenessPolicy::Live);

        let report = exchange.run_batch().await;
        // turns: 0 1 2 send, 0 1 2 skip, 0 1 2 send, 0 skip
        assert_eq!(report.dispatched, 6);
        assert_eq!(report.skipped, 4);
        let counts = exchange.transport().counts();
        assert_eq!(counts["0"], 2);
        assert_eq!(counts["1"], 2);
        assert_eq!(counts["2"], 2);
    }

    #[tokio::test]
    async fn test_live_with_quota_left_sends_everything() {
        let mut exchange = three_principals(generous, StalenessPolicy::Live);
        let report = exchange.run_batch().await;
        assert_eq!(report.dispatched, 10);
        for count in exchange.transport().counts().values() {
            assert!(*count >= 3);
        }
        assert_eq!(exchange.store().remaining("1"), 3);
    }

    #[tokio::test]
    async fn test_cycle_continues_across_batches() {
        let mut exchange = ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(generous),
            numbered_principals(3),
            settings(2, StalenessPolicy::Live),
        );
        exchange.run_batch().await;
        exchange.run_batch().await;
        assert_eq!(exchange.transport().sent(), vec!["0", "1", "2", "0"]);
    }

    #[tokio::test]
    async fn test_unparsable_remaining_keeps_prior_value() {
        fn bogus(principal: &str) -> Result<ExchangeResponse, TransportError> {
            reply_with(principal, "lots")
        }
        let mut exchange = ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(bogus),
            vec!["alice".to_string()],
            settings(1, StalenessPolicy::StaleBatch),
        );
        exchange.store().set_remaining("alice", 2);

        let report = exchange.run_batch().await;
        assert_eq!(report.discarded, 1);
        assert_eq!(report.absorbed, 0);
        assert_eq!(exchange.store().remaining("alice"), 2);
    }

    #[tokio::test]
    async fn test_missing_headers_are_ignored() {
        fn no_user(_: &str) -> Result<ExchangeResponse, TransportError> {
            Ok(ExchangeResponse {
                status: 200,
                remaining: Some("0".into()),
                ..Default::default()
            })
        }
        fn no_remaining(principal: &str) -> Result<ExchangeResponse, TransportError> {
            Ok(ExchangeResponse {
                status: 200,
                user: Some(principal.to_string()),
                ..Default::default()
            })
        }

        for reply in [no_user as Reply, no_remaining as Reply] {
            let mut exchange = ExchangeLoop::new(
                QuotaStore::new(),
                StubTransport::new(reply),
                vec!["alice".to_string()],
                settings(3, StalenessPolicy::StaleBatch),
            );
            let report = exchange.run_batch().await;
            assert_eq!(report.dispatched, 3);
            assert_eq!(report.discarded, 3);
            assert!(exchange.store().is_empty());
        }
    }

    #[tokio::test]
    async fn test_update_goes_to_reported_user() {
        fn renamed(_: &str) -> Result<ExchangeResponse, TransportError> {
            reply_with("bob", "-1")
        }
        let mut exchange = ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(renamed),
            vec!["alice".to_string()],
            settings(1, StalenessPolicy::StaleBatch),
        );
        exchange.run_batch().await;
        assert_eq!(exchange.store().remaining("alice"), DEFAULT_QUOTA);
        assert_eq!(exchange.store().remaining("bob"), -1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_isolated() {
        fn flaky(principal: &str) -> Result<ExchangeResponse, TransportError> {
            if principal == "1" {
                Err(TransportError::Timeout)
            } else {
                reply_with(principal, "4")
            }
        }

        for staleness in [StalenessPolicy::StaleBatch, StalenessPolicy::Live] {
            let mut exchange = three_principals(flaky, staleness);
            let report = exchange.run_batch().await;
            assert_eq!(report.dispatched, 10);
            assert_eq!(report.failed, 3);
            assert_eq!(report.absorbed, 7);
            assert_eq!(exchange.store().remaining("0"), 4);
            assert_eq!(exchange.store().remaining("1"), DEFAULT_QUOTA);
        }
    }

    #[tokio::test]
    async fn test_run_stops_after_batches() {
        let mut exchange = three_principals(generous, StalenessPolicy::StaleBatch);
        exchange.settings.termination = Termination::Batches(3);
        let report = exchange.run().await;
        assert_eq!(report.batches, 3);
        assert_eq!(report.totals.dispatched, 30);
        assert_eq!(report.final_quota.len(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_after_duration() {
        let mut exchange = three_principals(generous, StalenessPolicy::StaleBatch);
        exchange.settings.termination = Termination::Duration(Duration::ZERO);
        assert_eq!(exchange.run().await.batches, 0);

        exchange.settings.termination = Termination::Duration(Duration::from_millis(20));
        let report = exchange.run().await;
        assert!(report.batches >= 1);
        assert!(report.elapsed_ms >= 20);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        shutdown.trigger();

        let mut exchange = three_principals(generous, StalenessPolicy::StaleBatch);
        exchange.settings.termination = Termination::Batches(100);
        let report = exchange.run_until(Some(rx)).await;
        assert_eq!(report.batches, 0);
        assert!(exchange.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_no_principals() {
        let mut exchange = ExchangeLoop::new(
            QuotaStore::new(),
            StubTransport::new(generous),
            Vec::new(),
            settings(10, StalenessPolicy::StaleBatch),
        );
        assert_eq!(exchange.run().await.batches, 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = ClientConfig::default();
        assert_eq!(
            ExchangeSettings::from_config(&config).termination,
            Termination::Duration(Duration::from_secs(2))
        );
        config.batches = Some(5);
        assert_eq!(
            ExchangeSettings::from_config(&config).termination,
            Termination::Batches(5)
        );
    }
}
