//! Time source seam
//!
//! The engine never reads the wall clock directly; it goes through a
//! `TimeSource` so creation-time arithmetic is deterministic in tests.

use std::sync::atomic::{AtomicI64, Ordering};

/// Supplier of the current time in nanoseconds since the Unix epoch
pub trait TimeSource: Send + Sync {
    fn now_nanos(&self) -> i64;
}

/// Wall-clock time source backed by chrono
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_nanos(&self) -> i64 {
        // Saturates far in the future rather than failing (year 2262)
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Manually advanced time source for tests
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, nanos: i64) {
        self.now.fetch_add(nanos, Ordering::Relaxed);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source() {
        let time = ManualTimeSource::new(100);
        assert_eq!(time.now_nanos(), 100);

        time.advance(50);
        assert_eq!(time.now_nanos(), 150);

        time.set(10);
        assert_eq!(time.now_nanos(), 10);
    }

    #[test]
    fn test_system_time_source_is_positive() {
        assert!(SystemTimeSource.now_nanos() > 0);
    }
}
