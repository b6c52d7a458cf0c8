//! Time source abstraction.
//!
//! Every expiry decision in MarketDash (cache freshness, lockout windows,
//! session lifetimes) reads the current time through a [`Clock`]. Production
//! code uses [`SystemClock`]; tests drive a [`ManualClock`] forward instead
//! of sleeping.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use marketdash_core::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let t0 = clock.now();
//! clock.advance(Duration::from_secs(90));
//! assert_eq!(clock.now() - t0, time::Duration::seconds(90));
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Shared handle to a clock implementation.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Returns a shared [`SystemClock`].
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Clock that only moves when told to.
///
/// Starts at a fixed instant so test assertions are reproducible.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Creates a clock positioned at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::starting_at(time::macros::datetime!(2024-01-01 00:00:00 UTC))
    }

    /// Creates a clock positioned at `start`.
    pub fn starting_at(start: OffsetDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }

    /// Positions the clock at `at`.
    pub fn set(&self, at: OffsetDateTime) {
        *self.current.lock() = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.current.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}
