//! Host-level counters for the messaging layer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one [`Host`](crate::host::Host).
///
/// These are updated atomically on the hot path and snapshotted into a
/// [`MetricsSnapshot`] for reporting and tests. They feed observability,
/// never control flow.
pub struct HostMetrics {
    /// Outbound streams that completed negotiation.
    pub streams_opened: AtomicU64,
    /// Inbound streams that completed negotiation.
    pub streams_accepted: AtomicU64,
    /// Outbound negotiations the remote answered as unsupported.
    pub negotiation_rejects: AtomicU64,
    /// Inbound offers with no installed identifier.
    pub unsupported_offers: AtomicU64,
    /// Inbound requests dropped before the handler ran (read or decode failure).
    pub decode_failures: AtomicU64,
    /// Inbound requests a handler ran to completion for.
    pub requests_handled: AtomicU64,
    /// Handler completions that carried a local error verdict.
    pub handler_errors: AtomicU64,
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self {
            streams_opened: AtomicU64::new(0),
            streams_accepted: AtomicU64::new(0),
            negotiation_rejects: AtomicU64::new(0),
            unsupported_offers: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            requests_handled: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
        }
    }
}

impl HostMetrics {
    /// Snapshot the atomic counters into a plain struct.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_accepted: self.streams_accepted.load(Ordering::Relaxed),
            negotiation_rejects: self.negotiation_rejects.load(Ordering::Relaxed),
            unsupported_offers: self.unsupported_offers.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            requests_handled: self.requests_handled.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`HostMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub streams_opened: u64,
    pub streams_accepted: u64,
    pub negotiation_rejects: u64,
    pub unsupported_offers: u64,
    pub decode_failures: u64,
    pub requests_handled: u64,
    pub handler_errors: u64,
}
