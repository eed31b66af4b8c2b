//! Outcomes of the gate and the status snapshot.

use std::time::Duration;

/// Header carrying the post-admission token count.
pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
/// Header carrying the retry hint on rejection.
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// The decision returned by [`crate::TokenBucket::try_admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A token was consumed; the caller may proceed.
    Admitted {
        /// Tokens left in the bucket immediately after this admission.
        remaining: u64,
    },
    /// The bucket was empty.
    ///
    /// `retry_after` is always the configured refill interval, even when the
    /// next tick is due sooner. It is an upper bound on the wait for the next
    /// token while the refill process runs, not the exact time remaining.
    Rejected {
        /// How long the caller should wait before retrying.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_admitted()
    }

    /// Remaining tokens after the decision; always 0 for a rejection.
    pub fn remaining(&self) -> u64 {
        match self {
            Admission::Admitted { remaining } => *remaining,
            Admission::Rejected { .. } => 0,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Admission::Admitted { .. } => None,
            Admission::Rejected { retry_after } => Some(*retry_after),
        }
    }

    /// Header pairs an HTTP collaborator should attach to its response.
    ///
    /// `Retry-After` is expressed in whole seconds, rounded up, and never 0.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(REMAINING_HEADER, self.remaining().to_string())];
        if let Some(wait) = self.retry_after() {
            headers.push((RETRY_AFTER_HEADER, retry_after_secs(wait).to_string()));
        }
        headers
    }
}

fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    let secs = if wait.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs };
    secs.max(1)
}

/// Read-only snapshot of a bucket.
///
/// Token timestamps are internal bookkeeping and are not part of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BucketStatus {
    /// Configured maximum.
    pub capacity: u64,
    /// Tokens currently available.
    pub current_size: u64,
}

impl BucketStatus {
    pub fn is_full(&self) -> bool {
        self.current_size >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.current_size == 0
    }
}
