//! Fixed-window request counter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::authority::policy::QuotaPolicy;

/// Usage of one principal within the current window.
#[derive(Debug)]
struct Window {
    started: Instant,
    used: u64,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, used: 0 }
    }

    fn hit(&mut self, now: Instant, length: Duration) -> u64 {
        if now.duration_since(self.started) >= length {
            self.started = now;
            self.used = 0;
        }
        self.used += 1;
        self.used
    }
}

/// Counts requests per principal in fixed windows and reports what is left.
///
/// Each call to `remaining` records one request. Once the limit is reached
/// the policy reports `0` until the window rolls over.
#[derive(Debug)]
pub struct CounterPolicy {
    limit: u64,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl CounterPolicy {
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn record_at(&self, principal: &str, now: Instant) -> i64 {
        let mut windows = self.windows.lock().expect("counter policy mutex poisoned");
        if !windows.contains_key(principal) {
            // Expired windows would restart from zero anyway.
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }
        let used = windows
            .entry(principal.to_string())
            .or_insert_with(|| Window::new(now))
            .hit(now, self.window);

        self.limit.saturating_sub(used) as i64
    }
}

impl QuotaPolicy for CounterPolicy {
    fn remaining(&self, principal: &str) -> i64 {
        self.record_at(principal, Instant::now())
    }
}
