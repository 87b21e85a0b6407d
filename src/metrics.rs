//! Ambient in-process counters (SPEC_FULL §B), exposed read-only via the
//! alert webhook's `GET /metrics`. Not a tracing/OTel pipeline — just enough
//! to answer "is this thing doing anything" without a log grep.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub utterances_captured: AtomicU64,
    pub tasks_dispatched: AtomicU64,
    pub tasks_cancelled: AtomicU64,
    pub tasks_completed: AtomicU64,
    pub tasks_errored: AtomicU64,
    pub sentences_synthesized: AtomicU64,
    pub alerts_received: AtomicU64,
    pub alerts_delivered: AtomicU64,
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub utterances_captured: u64,
    pub tasks_dispatched: u64,
    pub tasks_cancelled: u64,
    pub tasks_completed: u64,
    pub tasks_errored: u64,
    pub sentences_synthesized: u64,
    pub alerts_received: u64,
    pub alerts_delivered: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            utterances_captured: self.utterances_captured.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_errored: self.tasks_errored.load(Ordering::Relaxed),
            sentences_synthesized: self.sentences_synthesized.load(Ordering::Relaxed),
            alerts_received: self.alerts_received.load(Ordering::Relaxed),
            alerts_delivered: self.alerts_delivered.load(Ordering::Relaxed),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = Metrics::default();
        Metrics::incr(&m.tasks_dispatched);
        Metrics::incr(&m.tasks_dispatched);
        let snap = m.snapshot();
        assert_eq!(snap.tasks_dispatched, 2);
        assert_eq!(snap.tasks_completed, 0);
    }
}
