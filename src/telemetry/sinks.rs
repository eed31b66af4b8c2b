use super::events::BucketEvent;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

const MEMORY_SINK_DEFAULT_CAPACITY: usize = 10_000;

/// Destination for [`BucketEvent`]s: any cloneable tower service over events.
pub trait TelemetrySink:
    Service<BucketEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    type SinkError: std::error::Error + Send + 'static;
}

/// Send one event, waiting for the sink to be ready. Sink failures are dropped
/// so telemetry can never change an admission outcome.
pub async fn emit_best_effort<S>(sink: S, event: BucketEvent)
where
    S: Service<BucketEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    if let Ok(mut sink) = sink.ready_oneshot().await {
        let _ = sink.call(event).await;
    }
}

/// Discards every event. The default sink for layers and refill runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Service<BucketEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: BucketEvent) -> Self::Future {
        ready(Ok(()))
    }
}

impl TelemetrySink for NullSink {
    type SinkError = Infallible;
}

/// Writes each event through `tracing` at INFO, as its `Display` form.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl Service<BucketEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: BucketEvent) -> Self::Future {
        tracing::info!(event = %event, "bucket_event");
        ready(Ok(()))
    }
}

impl TelemetrySink for LogSink {
    type SinkError = Infallible;
}

#[derive(Debug, Default)]
struct Recorded {
    events: VecDeque<BucketEvent>,
    evicted: u64,
}

/// Keeps the most recent events in memory; clones share one buffer.
///
/// Once `capacity` events are held, each new event evicts the oldest.
#[derive(Clone, Debug)]
pub struct MemorySink {
    recorded: Arc<Mutex<Recorded>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_SINK_DEFAULT_CAPACITY)
    }

    /// A sink holding at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self { recorded: Arc::default(), capacity: capacity.max(1) }
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Held events, oldest first.
    pub fn events(&self) -> Vec<BucketEvent> {
        self.recorded().events.iter().copied().collect()
    }

    pub fn clear(&self) {
        self.recorded().events.clear();
    }

    pub fn len(&self) -> usize {
        self.recorded().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many events have been pushed out by newer ones.
    pub fn evicted(&self) -> u64 {
        self.recorded().evicted
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<BucketEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: BucketEvent) -> Self::Future {
        let capacity = self.capacity;
        let mut recorded = self.recorded();
        if recorded.events.len() == capacity {
            recorded.events.pop_front();
            recorded.evicted += 1;
        }
        recorded.events.push_back(event);
        ready(Ok(()))
    }
}

impl TelemetrySink for MemorySink {
    type SinkError = Infallible;
}
