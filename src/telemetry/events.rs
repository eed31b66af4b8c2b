use crate::Admission;
use std::fmt;
use std::time::Duration;

#[cfg(feature = "telemetry-json")]
use serde_json::json;

/// Events emitted by the gate and the refill process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketEvent {
    /// A caller consumed a token.
    Admitted {
        /// Tokens left after the admission
        remaining: u64,
    },
    /// A caller found the bucket empty.
    Rejected {
        /// Retry hint handed to the caller (the configured interval)
        retry_after: Duration,
    },
    /// A refill tick added a token.
    ///
    /// Ticks on a full bucket emit nothing.
    Refilled {
        /// Size after the tick
        current_size: u64,
        /// Configured maximum
        capacity: u64,
    },
    /// The refill process started ticking.
    RefillStarted {
        /// Tick period
        interval: Duration,
    },
    /// The refill process exited.
    RefillStopped,
}

impl From<Admission> for BucketEvent {
    fn from(decision: Admission) -> Self {
        match decision {
            Admission::Admitted { remaining } => BucketEvent::Admitted { remaining },
            Admission::Rejected { retry_after } => BucketEvent::Rejected { retry_after },
        }
    }
}

impl fmt::Display for BucketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketEvent::Admitted { remaining } => write!(f, "Admitted(remaining={})", remaining),
            BucketEvent::Rejected { retry_after } => {
                write!(f, "Rejected(retry_after={:?})", retry_after)
            }
            BucketEvent::Refilled { current_size, capacity } => {
                write!(f, "Refilled({}/{})", current_size, capacity)
            }
            BucketEvent::RefillStarted { interval } => {
                write!(f, "RefillStarted(interval={:?})", interval)
            }
            BucketEvent::RefillStopped => write!(f, "RefillStopped"),
        }
    }
}

#[cfg_attr(not(feature = "telemetry-json"), allow(dead_code))]
#[inline]
fn clamp_u64(val: u128) -> u64 {
    val.min(u128::from(u64::MAX)) as u64
}

/// Convert a BucketEvent into a JSON value for sinks.
#[cfg(feature = "telemetry-json")]
pub fn event_to_json(event: &BucketEvent) -> serde_json::Value {
    match event {
        BucketEvent::Admitted { remaining } => json!({
            "kind": "admitted",
            "remaining": *remaining,
        }),
        BucketEvent::Rejected { retry_after } => json!({
            "kind": "rejected",
            "retry_after_ms": clamp_u64(retry_after.as_millis()),
        }),
        BucketEvent::Refilled { current_size, capacity } => json!({
            "kind": "refilled",
            "current_size": *current_size,
            "capacity": *capacity,
        }),
        BucketEvent::RefillStarted { interval } => json!({
            "kind": "refill_started",
            "interval_ms": clamp_u64(interval.as_millis()),
        }),
        BucketEvent::RefillStopped => json!({ "kind": "refill_stopped" }),
    }
}
