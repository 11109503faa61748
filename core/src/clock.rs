//! Clock seam — wall-clock and monotonic readings consumed by evaluation.

use crate::types::{ElapsedMs, TimestampMs};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Supplies the two time readings every evaluation needs. The pair must
/// come from the same instant for tamper detection to be meaningful.
pub trait Clock: Send + Sync {
    fn now_utc_ms(&self) -> TimestampMs;
    fn elapsed_monotonic_ms(&self) -> ElapsedMs;
}

/// Production clock: system wall time plus an `Instant` anchored at
/// construction for the monotonic reading.
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_utc_ms(&self) -> TimestampMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn elapsed_monotonic_ms(&self) -> ElapsedMs {
        self.started.elapsed().as_millis() as i64
    }
}

/// Settable clock for tests and offline tooling. Shareable through `Arc`
/// so callers can advance time after handing the clock to a manager.
pub struct ManualClock {
    now_utc: AtomicI64,
    elapsed: AtomicI64,
}

impl ManualClock {
    pub fn new(now_utc: TimestampMs, elapsed: ElapsedMs) -> Self {
        Self {
            now_utc: AtomicI64::new(now_utc),
            elapsed: AtomicI64::new(elapsed),
        }
    }

    pub fn set(&self, now_utc: TimestampMs, elapsed: ElapsedMs) {
        self.now_utc.store(now_utc, Ordering::SeqCst);
        self.elapsed.store(elapsed, Ordering::SeqCst);
    }

    /// Move both clocks forward in lockstep, as real time would.
    pub fn advance(&self, ms: i64) {
        self.now_utc.fetch_add(ms, Ordering::SeqCst);
        self.elapsed.fetch_add(ms, Ordering::SeqCst);
    }

    /// Move only the wall clock, simulating manual clock manipulation.
    pub fn skew_wall(&self, ms: i64) {
        self.now_utc.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_utc_ms(&self) -> TimestampMs {
        self.now_utc.load(Ordering::SeqCst)
    }

    fn elapsed_monotonic_ms(&self) -> ElapsedMs {
        self.elapsed.load(Ordering::SeqCst)
    }
}

impl Clock for std::sync::Arc<ManualClock> {
    fn now_utc_ms(&self) -> TimestampMs {
        self.as_ref().now_utc_ms()
    }

    fn elapsed_monotonic_ms(&self) -> ElapsedMs {
        self.as_ref().elapsed_monotonic_ms()
    }
}
