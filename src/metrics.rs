//! Delivery counters and the pluggable metrics observer.
//!
//! Counters are monotonic atomics updated without locks from any thread.
//! [`Stats::snapshot`] reads them without synchronizing against in-flight
//! updates, so a snapshot taken while logging is concurrent is approximate.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{error::LogError, level::Level};

/// Receives one callback per write attempt.
///
/// Implementations must be cheap and thread-safe; they run on the thread that
/// performed the write (the caller in sync mode, the worker in async mode).
pub trait MetricsObserver: Send + Sync {
    /// `duration_ms` covers rendering plus the sink write. `bytes` is the size
    /// of the rendered record (zero if rendering failed). `error` is set when
    /// the attempt failed.
    fn record_write(&self, level: Level, duration_ms: f64, bytes: usize, error: Option<&LogError>);
}

/// Point-in-time copy of the delivery counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct StatsSnapshot {
    /// Write, render and backpressure failures.
    pub errors: u64,
    /// Records discarded by the overflow policy.
    pub dropped: u64,
}

/// Shared counters behind a logger family.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    errors: AtomicU64,
    dropped: AtomicU64,
}

impl Stats {
    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            errors: self.errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }
}
