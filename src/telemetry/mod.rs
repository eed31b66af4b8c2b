//! Telemetry for the token bucket.
//!
//! The middleware emits one event per admission decision; the refill process
//! emits lifecycle events and one event per token it adds. Events flow through
//! `TelemetrySink` implementations, which are `tower::Service<BucketEvent>`
//! so they compose like any other service.

pub mod events;
pub mod sinks;

#[cfg(feature = "telemetry-json")]
pub use events::event_to_json;
pub use events::BucketEvent;
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
