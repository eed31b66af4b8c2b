//! Validated bucket configuration.
//!
//! A [`BucketConfig`] is the only way to size a [`crate::TokenBucket`]. Both
//! parameters are checked once, up front, so a bucket can never exist with a
//! zero capacity, or with a refill interval that is zero or longer than
//! [`MAX_REFILL_INTERVAL`].

use crate::ConfigError;
use std::time::Duration;

const DEFAULT_CAPACITY: u64 = 1000;
const DEFAULT_REFILL_INTERVAL_SECS: u64 = 2;

/// Longest accepted refill interval (1 day).
pub const MAX_REFILL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Capacity and refill cadence of a token bucket.
///
/// Immutable once built; a bucket owns its config for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBucketConfig", into = "RawBucketConfig"))]
pub struct BucketConfig {
    capacity: u64,
    refill_interval: Duration,
}

impl BucketConfig {
    /// Create a config with validation.
    ///
    /// # Examples
    /// ```
    /// use tollgate::BucketConfig;
    /// use std::time::Duration;
    /// let cfg = BucketConfig::new(3, Duration::from_secs(1)).unwrap();
    /// assert_eq!(cfg.capacity(), 3);
    /// assert!(BucketConfig::new(0, Duration::from_secs(1)).is_err());
    /// assert!(BucketConfig::new(3, Duration::from_secs(u64::MAX)).is_err());
    /// ```
    pub fn new(capacity: u64, refill_interval: Duration) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { provided: capacity });
        }
        if refill_interval == Duration::ZERO || refill_interval > MAX_REFILL_INTERVAL {
            return Err(ConfigError::InvalidRefillInterval(refill_interval));
        }
        Ok(Self { capacity, refill_interval })
    }

    /// `n` tokens of burst, refilled one at a time so that `n` tokens come back per second.
    pub fn per_second(n: u32) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::InvalidCapacity { provided: 0 });
        }
        Self::new(u64::from(n), Duration::from_secs(1) / n)
    }

    pub fn builder() -> BucketConfigBuilder {
        BucketConfigBuilder::default()
    }

    /// Maximum number of tokens the bucket may hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Period between refill ticks; also the retry hint handed to rejected callers.
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_interval: Duration::from_secs(DEFAULT_REFILL_INTERVAL_SECS),
        }
    }
}

/// Builder for [`BucketConfig`]. Unset fields take the [`BucketConfig::default`] values.
#[derive(Debug, Clone, Default)]
pub struct BucketConfigBuilder {
    capacity: Option<u64>,
    refill_interval: Option<Duration>,
}

impl BucketConfigBuilder {
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.refill_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<BucketConfig, ConfigError> {
        let defaults = BucketConfig::default();
        BucketConfig::new(
            self.capacity.unwrap_or(defaults.capacity),
            self.refill_interval.unwrap_or(defaults.refill_interval),
        )
    }
}

/// Wire shape for the `serde` feature: `{ "capacity": 3, "refill_interval_ms": 1000 }`.
///
/// Sub-millisecond intervals are truncated on serialization.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawBucketConfig {
    capacity: u64,
    refill_interval_ms: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBucketConfig> for BucketConfig {
    type Error = ConfigError;

    fn try_from(raw: RawBucketConfig) -> Result<Self, Self::Error> {
        BucketConfig::new(raw.capacity, Duration::from_millis(raw.refill_interval_ms))
    }
}

#[cfg(feature = "serde")]
impl From<BucketConfig> for RawBucketConfig {
    fn from(cfg: BucketConfig) -> Self {
        Self {
            capacity: cfg.capacity,
            refill_interval_ms: u64::try_from(cfg.refill_interval.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}
