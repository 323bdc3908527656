//! Curation counters.
//!
//! Lock-free `AtomicU64` counters bumped on every attempt; latency samples
//! sit behind a `parking_lot::Mutex` and are only read on export.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::FailureKind;

/// Latency samples kept for the rolling average.
const LATENCY_WINDOW: usize = 64;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Counters shared by every `curate` call on one client.
#[derive(Debug)]
pub struct CurationCounters {
    /// `curate` calls started.
    pub calls: AtomicU64,
    /// HTTP attempts sent.
    pub attempts: AtomicU64,
    /// Attempts followed by a retry.
    pub retries: AtomicU64,
    /// Calls that returned a digest.
    pub successes: AtomicU64,
    /// Entries delivered across successful calls.
    pub items_delivered: AtomicU64,
    /// Attempts that hit a rate limit.
    pub rate_limited: AtomicU64,
    /// Attempts whose search tool failed.
    pub upstream_failures: AtomicU64,
    /// Attempts with an unreadable or off-schema answer.
    pub parse_failures: AtomicU64,
    /// Attempts that timed out.
    pub timeouts: AtomicU64,
    /// Calls that ended in failure.
    pub failures: AtomicU64,
    latencies_ms: Mutex<VecDeque<u64>>,
}

impl CurationCounters {
    /// Create a zeroed set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            items_delivered: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
        }
    }

    /// Record the cause of a failed attempt.
    pub fn record_attempt_failure(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::RateLimited => &self.rate_limited,
            FailureKind::UpstreamToolFailure => &self.upstream_failures,
            FailureKind::MalformedResponse | FailureKind::SchemaValidationFailure => {
                &self.parse_failures
            }
            FailureKind::Timeout => &self.timeouts,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished call's wall-clock latency.
    pub fn record_latency(&self, latency_ms: u64) {
        let mut samples = self.latencies_ms.lock();
        if samples.len() == LATENCY_WINDOW {
            samples.pop_front();
        }
        samples.push_back(latency_ms);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let avg_latency_ms = {
            let samples = self.latencies_ms.lock();
            if samples.is_empty() {
                0
            } else {
                samples.iter().sum::<u64>() / samples.len() as u64
            }
        };

        CounterSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            items_delivered: self.items_delivered.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}

impl Default for CurationCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// `curate` calls started.
    pub calls: u64,
    /// HTTP attempts sent.
    pub attempts: u64,
    /// Retries scheduled.
    pub retries: u64,
    /// Successful calls.
    pub successes: u64,
    /// Entries delivered.
    pub items_delivered: u64,
    /// Rate-limited attempts.
    pub rate_limited: u64,
    /// Upstream tool failures.
    pub upstream_failures: u64,
    /// Parse or schema failures.
    pub parse_failures: u64,
    /// Timed-out attempts.
    pub timeouts: u64,
    /// Failed calls.
    pub failures: u64,
    /// Mean latency over the recent window.
    pub avg_latency_ms: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 10] = [
            ("calls", "Curate calls started", self.calls),
            ("attempts", "HTTP attempts sent", self.attempts),
            ("retries", "Retries scheduled", self.retries),
            ("successes", "Calls that returned a digest", self.successes),
            ("items_delivered", "Digest entries delivered", self.items_delivered),
            ("rate_limited", "Rate-limited attempts", self.rate_limited),
            ("upstream_failures", "Search tool failures", self.upstream_failures),
            ("parse_failures", "Unreadable or off-schema answers", self.parse_failures),
            ("timeouts", "Timed-out attempts", self.timeouts),
            ("failures", "Calls that ended in failure", self.failures),
        ];

        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP newsdigest_{name}_total {help}\n\
                 # TYPE newsdigest_{name}_total counter\n\
                 newsdigest_{name}_total {value}\n"
            ));
        }
        out.push_str(&format!(
            "# HELP newsdigest_avg_latency_ms Mean curate latency\n\
             # TYPE newsdigest_avg_latency_ms gauge\n\
             newsdigest_avg_latency_ms {}\n",
            self.avg_latency_ms
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_failures_are_bucketed() {
        let counters = CurationCounters::new();
        counters.record_attempt_failure(FailureKind::RateLimited);
        counters.record_attempt_failure(FailureKind::MalformedResponse);
        counters.record_attempt_failure(FailureKind::SchemaValidationFailure);
        counters.record_attempt_failure(FailureKind::TransportError);

        let snap = counters.snapshot();
        assert_eq!(snap.rate_limited, 1);
        assert_eq!(snap.parse_failures, 2);
        assert_eq!(snap.timeouts, 0);
    }

    #[test]
    fn latency_window_is_bounded() {
        let counters = CurationCounters::new();
        for _ in 0..LATENCY_WINDOW {
            counters.record_latency(1_000);
        }
        counters.record_latency(1_000 + LATENCY_WINDOW as u64);
        assert_eq!(counters.snapshot().avg_latency_ms, 1_001);
    }

    #[test]
    fn latency_window_drops_oldest_first() {
        let counters = CurationCounters::new();
        counters.record_latency(64_000);
        for _ in 1..LATENCY_WINDOW {
            counters.record_latency(0);
        }
        assert_eq!(counters.snapshot().avg_latency_ms, 1_000);
        counters.record_latency(0);
        assert_eq!(counters.snapshot().avg_latency_ms, 0);
    }

    #[test]
    fn prometheus_export() {
        let snap = CounterSnapshot {
            calls: 2,
            attempts: 5,
            ..CounterSnapshot::default()
        };
        let text = snap.to_prometheus();
        assert!(text.contains("newsdigest_calls_total 2"));
        assert!(text.contains("newsdigest_attempts_total 5"));
        assert!(text.contains("# TYPE newsdigest_avg_latency_ms gauge"));
    }
}
