//! Monotonic time sources.
//!
//! Components that measure elapsed time (the token bucket, the error window,
//! cooldowns) read it through [`Clock`] so a session can run against
//! simulation time instead of the wall clock.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic time source measured from an arbitrary origin.
pub trait Clock: Debug + Send + Sync {
    /// Time elapsed since this clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so one handle can drive the time seen by
/// every component holding another.
///
/// # Examples
///
/// ```
/// use chronicler_core::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let view = clock.clone();
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!(view.now(), Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute reading. Readings never move backwards.
    pub fn set(&self, now: Duration) {
        let target = u64::try_from(now.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_max(target, Ordering::SeqCst);
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
