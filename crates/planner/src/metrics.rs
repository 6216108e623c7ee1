use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Protocol traffic and state-machine counters
#[derive(Clone)]
pub struct ProtocolMetrics {
    inner: Arc<ProtocolMetricsInner>,
}

#[derive(Default)]
struct ProtocolMetricsInner {
    /// Ticks executed
    ticks: AtomicU64,

    /// Downstream announcements sent unicast
    announces_sent: AtomicU64,

    /// Downstream announcements sent as broadcast
    broadcasts_sent: AtomicU64,

    /// Upstream status acks sent
    acks_sent: AtomicU64,

    /// Sends rejected by the channel
    send_failures: AtomicU64,

    /// Inbound payloads that failed to decode
    malformed: AtomicU64,

    /// Announcements older than the one already held
    stale: AtomicU64,

    /// Cursor advances across all agents
    advances: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub announces_sent: u64,
    pub broadcasts_sent: u64,
    pub acks_sent: u64,
    pub send_failures: u64,
    pub malformed: u64,
    pub stale: u64,
    pub advances: u64,
}

impl ProtocolMetrics {
    pub fn new() -> Self {
        Self { inner: Arc::new(ProtocolMetricsInner::default()) }
    }

    pub fn tick(&self) {
        self.inner.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn announce_sent(&self, broadcast: bool) {
        if broadcast {
            self.inner.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.announces_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn ack_sent(&self) {
        self.inner.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.inner.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed(&self) {
        self.inner.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale(&self) {
        self.inner.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn advanced(&self) {
        self.inner.advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let i = &self.inner;
        MetricsSnapshot {
            ticks: i.ticks.load(Ordering::Relaxed),
            announces_sent: i.announces_sent.load(Ordering::Relaxed),
            broadcasts_sent: i.broadcasts_sent.load(Ordering::Relaxed),
            acks_sent: i.acks_sent.load(Ordering::Relaxed),
            send_failures: i.send_failures.load(Ordering::Relaxed),
            malformed: i.malformed.load(Ordering::Relaxed),
            stale: i.stale.load(Ordering::Relaxed),
            advances: i.advances.load(Ordering::Relaxed),
        }
    }

    /// Print current metrics summary
    pub fn print_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            ticks = s.ticks,
            announces = s.announces_sent,
            broadcasts = s.broadcasts_sent,
            acks = s.acks_sent,
            send_failures = s.send_failures,
            malformed = s.malformed,
            stale = s.stale,
            advances = s.advances,
            "Protocol metrics summary"
        );
    }
}

impl Default for ProtocolMetrics {
    fn default() -> Self {
        Self::new()
    }
}
