//! Wall-clock time and blocking waits, injectable for tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/// Source of "now" (Unix seconds) and of the blocking delay used between
/// vault retries.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
    fn sleep(&self, duration: Duration);
}

/// `chrono::Utc::now()` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Settable clock. `sleep` returns immediately and records the request.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Every delay requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_near_chrono_now() {
        let now = SystemClock.now();
        assert!((now - chrono::Utc::now().timestamp()).abs() <= 1);
    }

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(25);
        assert_eq!(clock.now(), 1_025);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn manual_clock_records_sleeps() {
        let clock = ManualClock::new(0);
        clock.sleep(Duration::from_millis(250));
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.sleeps().len(), 2);
        assert_eq!(clock.total_slept(), Duration::from_millis(500));
        assert_eq!(clock.now(), 0);
    }
}
