//! Counters describing what a run did.

use std::collections::BTreeMap;

use serde::Serialize;

/// Outcome counts for one batch (or a whole run when accumulated).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Requests admitted and handed to the transport.
    pub dispatched: usize,
    /// Principals found exhausted and refilled instead of sent.
    pub skipped: usize,
    /// Responses whose remaining quota was written to the store.
    pub absorbed: usize,
    /// Responses whose update was dropped (no user, missing or bad value).
    pub discarded: usize,
    /// Requests lost to transport errors.
    pub failed: usize,
}

impl BatchReport {
    pub fn merge(&mut self, other: &BatchReport) {
        self.dispatched += other.dispatched;
        self.skipped += other.skipped;
        self.absorbed += other.absorbed;
        self.discarded += other.discarded;
        self.failed += other.failed;
    }
}

/// Summary of a complete exchange run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub batches: u32,
    pub totals: BatchReport,
    pub elapsed_ms: u128,
    /// Store contents when the run ended.
    pub final_quota: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut total = BatchReport::default();
        let batch = BatchReport {
            dispatched: 7,
            skipped: 3,
            absorbed: 6,
            discarded: 0,
            failed: 1,
        };
        total.merge(&batch);
        total.merge(&batch);
        assert_eq!(total.dispatched, 14);
        assert_eq!(total.skipped, 6);
        assert_eq!(total.absorbed, 12);
        assert_eq!(total.failed, 2);
    }

    #[test]
    fn test_run_report_serializes() {
        let mut report = RunReport::default();
        report.final_quota.insert("0".into(), 2);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["final_quota"]["0"], 2);
        assert_eq!(json["totals"]["dispatched"], 0);
    }
}
