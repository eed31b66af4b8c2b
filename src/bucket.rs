//! Token bucket: shared state, the consume-or-reject gate, and status reads.
//!
//! All three operations that touch the token queue (refill tick, admission,
//! status) take the same `Mutex` and hold it for O(1) work only. Nothing is
//! awaited and no other lock is taken while it is held.

use crate::clock::{Clock, MonotonicClock};
use crate::{Admission, BucketConfig, BucketStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Upper bound on the queue allocated up front; larger buckets grow on demand.
const PREALLOCATE_MAX: usize = 1024;

/// Value of `Shared::run_id` while no refill process owns the bucket.
const IDLE: u64 = 0;

/// The decision interface the middleware depends on.
pub trait Gate: Send + Sync {
    /// Atomically consume one token if available.
    fn try_admit(&self) -> Admission;
    /// Snapshot of capacity and fill level.
    fn status(&self) -> BucketStatus;
}

#[derive(Debug)]
pub(crate) struct Shared {
    config: BucketConfig,
    clock: Arc<dyn Clock>,
    /// Token markers, oldest first. Each holds the clock reading at insertion.
    tokens: Mutex<VecDeque<u64>>,
    /// Id of the refill run that owns the bucket, or `IDLE`.
    run_id: AtomicU64,
    next_run_id: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<u64>> {
        // Every critical section leaves the queue consistent, so a panic
        // elsewhere while holding the lock cannot corrupt it.
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one token stamped with the bucket's clock unless full.
    /// Returns the new size if a token was added.
    pub(crate) fn refill(&self) -> Option<u64> {
        let now = self.clock.now_millis();
        let mut tokens = self.lock();
        if (tokens.len() as u64) < self.config.capacity() {
            tokens.push_back(now);
            Some(tokens.len() as u64)
        } else {
            None
        }
    }

    /// Claim the bucket for a new refill run. `None` if another run owns it.
    pub(crate) fn claim_run(&self) -> Option<u64> {
        let id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        self.run_id.compare_exchange(IDLE, id, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| id)
    }

    /// Release the bucket if run `id` still owns it. A stale id is a no-op.
    pub(crate) fn release_run(&self, id: u64) {
        let _ = self.run_id.compare_exchange(id, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    pub(crate) fn config(&self) -> &BucketConfig {
        &self.config
    }
}

/// A fixed-capacity token bucket refilled one token per interval.
///
/// Clones share the same underlying state via `Arc`, so every handle observes
/// and consumes the same tokens.
///
/// # Examples
/// ```
/// use tollgate::{Admission, BucketConfig, TokenBucket};
/// use std::time::Duration;
///
/// let bucket = TokenBucket::full(BucketConfig::new(2, Duration::from_secs(1)).unwrap());
/// assert_eq!(bucket.try_admit(), Admission::Admitted { remaining: 1 });
/// assert_eq!(bucket.try_admit(), Admission::Admitted { remaining: 0 });
/// assert_eq!(bucket.try_admit(), Admission::Rejected { retry_after: Duration::from_secs(1) });
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    pub(crate) shared: Arc<Shared>,
}

impl TokenBucket {
    /// Create an empty bucket. Tokens arrive through [`TokenBucket::refill`]
    /// or the refill process started with [`TokenBucket::start`].
    pub fn new(config: BucketConfig) -> Self {
        Self::with_clock(config, MonotonicClock::default())
    }

    /// Create an empty bucket whose token markers are stamped by `clock`.
    ///
    /// The clock belongs to the shared state: every clone and the refill
    /// process read the same one.
    pub fn with_clock<C: Clock + 'static>(config: BucketConfig, clock: C) -> Self {
        let prealloc = usize::try_from(config.capacity()).unwrap_or(usize::MAX).min(PREALLOCATE_MAX);
        Self {
            shared: Arc::new(Shared {
                config,
                clock: Arc::new(clock),
                tokens: Mutex::new(VecDeque::with_capacity(prealloc)),
                run_id: AtomicU64::new(IDLE),
                next_run_id: AtomicU64::new(IDLE + 1),
            }),
        }
    }

    /// Create a bucket that starts at capacity.
    pub fn full(config: BucketConfig) -> Self {
        let bucket = Self::new(config);
        while bucket.refill() {}
        bucket
    }

    pub fn config(&self) -> &BucketConfig {
        self.shared.config()
    }

    pub fn capacity(&self) -> u64 {
        self.shared.config.capacity()
    }

    pub fn refill_interval(&self) -> Duration {
        self.shared.config.refill_interval()
    }

    /// Consume one token if any is available.
    ///
    /// Never blocks beyond the O(1) critical section and never fails.
    pub fn try_admit(&self) -> Admission {
        let mut tokens = self.shared.lock();
        match tokens.pop_front() {
            Some(_) => {
                let remaining = tokens.len() as u64;
                drop(tokens);
                tracing::trace!(remaining, "token bucket: admitted");
                Admission::Admitted { remaining }
            }
            None => {
                drop(tokens);
                let retry_after = self.refill_interval();
                tracing::debug!(?retry_after, "token bucket: rejected, bucket empty");
                Admission::Rejected { retry_after }
            }
        }
    }

    /// One refill tick: add a single token unless the bucket is full.
    ///
    /// Returns `true` if a token was added. A tick on a full bucket changes nothing.
    pub fn refill(&self) -> bool {
        match self.shared.refill() {
            Some(current_size) => {
                tracing::trace!(current_size, "token bucket: refilled");
                true
            }
            None => false,
        }
    }

    pub fn status(&self) -> BucketStatus {
        let current_size = self.shared.lock().len() as u64;
        BucketStatus { capacity: self.capacity(), current_size }
    }

    /// Whether the refill process is currently running for this bucket.
    pub fn is_running(&self) -> bool {
        self.shared.run_id.load(Ordering::Acquire) != IDLE
    }

    /// Insertion timestamps of the tokens currently held, oldest first.
    #[cfg(test)]
    pub(crate) fn token_stamps(&self) -> Vec<u64> {
        self.shared.lock().iter().copied().collect()
    }
}

impl Gate for TokenBucket {
    fn try_admit(&self) -> Admission {
        TokenBucket::try_admit(self)
    }

    fn status(&self) -> BucketStatus {
        TokenBucket::status(self)
    }
}

impl<G: Gate + ?Sized> Gate for Arc<G> {
    fn try_admit(&self) -> Admission {
        (**self).try_admit()
    }

    fn status(&self) -> BucketStatus {
        (**self).status()
    }
}
