//! Tower middleware that puts a [`Gate`] in front of a service.
//!
//! The layer only translates: an admitted request is forwarded unchanged, a
//! rejected one becomes [`AdmissionError::RateLimited`] carrying the retry hint.
//! How that is rendered (status code, headers, body) is up to the caller's
//! own boundary; [`crate::Admission::headers`] covers the usual HTTP headers.

use crate::telemetry::{emit_best_effort, BucketEvent, NullSink, TelemetrySink};
use crate::{Admission, AdmissionError, Gate};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that admits requests through a [`Gate`], usually a [`crate::TokenBucket`].
#[derive(Debug)]
pub struct AdmissionLayer<G, Sink = NullSink> {
    gate: Arc<G>,
    sink: Sink,
}

impl<G, Sink: Clone> Clone for AdmissionLayer<G, Sink> {
    fn clone(&self) -> Self {
        Self { gate: self.gate.clone(), sink: self.sink.clone() }
    }
}

impl<G> AdmissionLayer<G, NullSink> {
    /// Create a new admission layer.
    pub fn new(gate: G) -> Self {
        Self { gate: Arc::new(gate), sink: NullSink }
    }
}

impl<G, Sink> AdmissionLayer<G, Sink> {
    /// Emit one [`BucketEvent`] per admission decision to `sink`.
    pub fn with_sink<NewSink>(self, sink: NewSink) -> AdmissionLayer<G, NewSink>
    where
        NewSink: TelemetrySink,
    {
        AdmissionLayer { gate: self.gate, sink }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }
}

impl<S, G, Sink> Layer<S> for AdmissionLayer<G, Sink>
where
    Sink: Clone,
{
    type Service = AdmissionService<S, G, Sink>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService { inner: service, gate: self.gate.clone(), sink: self.sink.clone() }
    }
}

/// Middleware service produced by [`AdmissionLayer`].
#[derive(Debug)]
pub struct AdmissionService<S, G, Sink = NullSink> {
    inner: S,
    gate: Arc<G>,
    sink: Sink,
}

impl<S: Clone, G, Sink: Clone> Clone for AdmissionService<S, G, Sink> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), gate: self.gate.clone(), sink: self.sink.clone() }
    }
}

impl<S, G, Sink, Req> Service<Req> for AdmissionService<S, G, Sink>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    G: Gate + 'static,
    Sink: TelemetrySink,
    Sink::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = AdmissionError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AdmissionError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Decide now, at call time, so admission order follows call order.
        let decision = self.gate.try_admit();
        let sink = self.sink.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            emit_best_effort(sink, BucketEvent::from(decision)).await;
            match decision {
                Admission::Admitted { remaining } => {
                    tracing::trace!(remaining, "request admitted");
                    inner.call(req).await.map_err(AdmissionError::Inner)
                }
                Admission::Rejected { retry_after } => {
                    Err(AdmissionError::RateLimited { retry_after })
                }
            }
        })
    }
}
