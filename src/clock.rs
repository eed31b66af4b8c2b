//! Time source for token markers.
//!
//! Every token pushed into a [`crate::TokenBucket`] is stamped with a reading
//! from the bucket's clock. The stamps only order tokens inside the queue;
//! admission decisions never look at them. The clock is fixed when the bucket
//! is built ([`crate::TokenBucket::with_clock`]) and shared by all clones and
//! the refill process.

use std::time::Instant;

/// Millisecond time source for token stamps.
///
/// Implement this to make stamps deterministic in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Milliseconds since an arbitrary, fixed origin. Must not decrease.
    fn now_millis(&self) -> u64;
}

/// Default clock: milliseconds elapsed since the bucket was built.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
