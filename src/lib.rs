#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Tollgate
//!
//! In-process admission control for async Rust: a fixed-capacity token bucket
//! refilled one token per interval by a background tokio task, with a tower
//! layer that turns an empty bucket into a "too many requests" error.
//!
//! ## Features
//!
//! - **Validated configuration**: zero capacity and zero or overlong intervals are rejected up front
//! - **Non-blocking gate**: `try_admit` holds a single lock for O(1) work and never waits
//! - **Explicit refill lifecycle**: `start` returns a handle that stops or aborts the task
//! - **Tower middleware** with telemetry sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use tollgate::{Admission, BucketConfig, TokenBucket};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tollgate::ConfigError> {
//!     let bucket = TokenBucket::new(BucketConfig::new(3, Duration::from_secs(1))?);
//!     let refill = bucket.start()?;
//!
//!     match bucket.try_admit() {
//!         Admission::Admitted { remaining } => println!("admitted, {remaining} left"),
//!         Admission::Rejected { retry_after } => println!("retry in {retry_after:?}"),
//!     }
//!
//!     refill.stop().await;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod prelude;
pub mod refill;
pub mod telemetry;

// Re-exports
pub use admission::{Admission, BucketStatus};
pub use bucket::{Gate, TokenBucket};
pub use clock::{Clock, MonotonicClock};
pub use config::{BucketConfig, BucketConfigBuilder, MAX_REFILL_INTERVAL};
pub use error::{AdmissionError, ConfigError};
pub use middleware::{AdmissionLayer, AdmissionService};
pub use refill::RefillHandle;
