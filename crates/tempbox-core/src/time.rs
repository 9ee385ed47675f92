//! Wall-clock abstraction for testability.
//!
//! Expiry deadlines come from the server as absolute timestamps, so the
//! countdown reads a wall clock rather than a monotonic one. The [`Clock`]
//! trait lets tests drive that clock deterministically.
//!
//! # Example
//!
//! ```
//! use tempbox_core::time::{Clock, MockClock};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! clock.advance(Duration::from_secs(5));
//!
//! assert_eq!((clock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Abstraction over wall-clock time.
///
/// In production, use [`SystemClock`]. In tests, use [`MockClock`].
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the time remaining until `deadline`, or zero if it has passed.
    fn until(&self, deadline: DateTime<Utc>) -> TimeDelta {
        (deadline - self.now()).max(TimeDelta::zero())
    }
}

/// Shared, dynamically dispatched clock.
pub type SharedClock = Arc<dyn Clock>;

/// System clock that uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Returns the system clock as a [`SharedClock`].
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests.
///
/// The clock starts at a base instant and only moves when told to.
#[derive(Debug)]
pub struct MockClock {
    /// Base instant (when the clock was created).
    base: DateTime<Utc>,
    /// Offset from base in milliseconds.
    offset_millis: AtomicI64,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a new mock clock starting at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a mock clock starting at `base`.
    #[must_use]
    pub const fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            offset_millis: AtomicI64::new(0),
        }
    }

    /// Creates a mock clock that can be shared across tasks.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances the clock by the given duration.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, duration: Duration) {
        let millis = duration.as_millis() as i64;
        self.offset_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Returns the current offset from the base time.
    #[must_use]
    pub fn offset(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.offset_millis.load(Ordering::SeqCst))
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + self.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        let before = Utc::now();
        let from_clock = clock.now();
        let after = Utc::now();

        assert!(from_clock >= before);
        assert!(from_clock <= after);
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now() - start, TimeDelta::seconds(10));

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, TimeDelta::milliseconds(11_500));
    }

    #[test]
    fn test_until_saturates_at_zero() {
        let clock = MockClock::new();
        let deadline = clock.now() + TimeDelta::seconds(3);

        assert_eq!(clock.until(deadline), TimeDelta::seconds(3));
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.until(deadline), TimeDelta::zero());
    }

    #[test]
    fn test_shared_mock_clock() {
        let clock = MockClock::shared();
        let shared: SharedClock = clock.clone();

        let start = shared.now();
        clock.advance(Duration::from_secs(10));

        assert_eq!(shared.now() - start, TimeDelta::seconds(10));
    }
}
