//! Convenient re-exports for common Tollgate types.
pub use crate::{
    admission::{REMAINING_HEADER, RETRY_AFTER_HEADER},
    telemetry::{BucketEvent, LogSink, MemorySink, TelemetrySink},
    Admission, AdmissionError, AdmissionLayer, BucketConfig, BucketStatus, ConfigError, Gate,
    RefillHandle, TokenBucket,
};
