// src/watch/throttle.rs

//! Leading-edge rate limiter used by every watcher.
//!
//! A [`Throttle`] runs the action it is given at most once per window and
//! drops everything in between. Nothing is queued and nothing is replayed
//! once the window closes: the next call after the window is simply accepted
//! again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Sentinel for "no call accepted yet".
const NEVER: u64 = u64::MAX;

/// Rate limiter holding a single "last accepted" timestamp.
///
/// The timestamp is stored as nanoseconds since the throttle was created and
/// claimed with a compare-and-swap, so two racing callers can never both be
/// accepted for the same window.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    origin: Instant,
    last_accepted: AtomicU64,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            origin: Instant::now(),
            last_accepted: AtomicU64::new(NEVER),
        }
    }

    /// Minimum time between two accepted calls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `action` if no call was accepted within the last `interval`.
    ///
    /// Returns `true` if the action ran, `false` if it was dropped.
    pub fn call<F: FnOnce()>(&self, action: F) -> bool {
        if !self.try_acquire() {
            return false;
        }
        action();
        true
    }

    fn try_acquire(&self) -> bool {
        let now = self.elapsed_nanos();
        let window = u64::try_from(self.interval.as_nanos()).unwrap_or(NEVER);

        let mut last = self.last_accepted.load(Ordering::Acquire);
        loop {
            if last != NEVER && now.saturating_sub(last) < window {
                return false;
            }
            match self.last_accepted.compare_exchange_weak(
                last,
                now,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => last = actual,
            }
        }
    }

    fn elapsed_nanos(&self) -> u64 {
        // NEVER is reserved for the sentinel.
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(NEVER - 1)
    }
}
