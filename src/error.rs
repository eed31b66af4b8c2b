//! Error types for bucket configuration and the admission middleware
use std::fmt;
use std::time::Duration;

/// Errors produced when validating or starting a bucket.
///
/// A rejected admission is *not* an error; see [`crate::Admission::Rejected`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Capacity must be > 0.
    #[error("capacity must be > 0 (got {provided})")]
    InvalidCapacity {
        /// Value provided by caller.
        provided: u64,
    },
    /// Refill interval must be > 0 and at most one day.
    #[error("refill_interval must be > 0 and <= 1 day (got {0:?})")]
    InvalidRefillInterval(Duration),
    /// The refill process is already running for this bucket.
    #[error("refill process already started; bucket configuration is frozen")]
    AlreadyStarted,
}

/// Error returned by [`crate::AdmissionService`].
#[derive(Debug, Clone)]
pub enum AdmissionError<E> {
    /// The bucket had no token; the inner service was not called.
    RateLimited { retry_after: Duration },
    /// The inner service failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for AdmissionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after } => {
                write!(f, "too many requests (retry after {:?})", retry_after)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AdmissionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited { .. } => None,
        }
    }
}

impl<E> AdmissionError<E> {
    /// Check if this error is an admission rejection
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
    /// Retry hint carried by a rejection.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
