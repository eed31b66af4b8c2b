//! Refill process: a tokio task that adds one token per interval.
//!
//! The task keeps only a `Weak` reference to the bucket, so it exits on the
//! next tick once every [`TokenBucket`] handle has been dropped. Stopping it
//! explicitly goes through [`RefillHandle::stop`]; dropping the handle aborts it.
//! Each run carries an id, so a bucket freed by a dropped handle can be
//! started again while the aborted task is still being torn down.

use crate::bucket::Shared;
use crate::telemetry::{emit_best_effort, BucketEvent, NullSink, TelemetrySink};
use crate::{ConfigError, TokenBucket};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

impl TokenBucket {
    /// Start the refill process. Must be called from within a tokio runtime.
    ///
    /// The first token arrives one interval after start. Fails with
    /// [`ConfigError::AlreadyStarted`] while a previous refill process for the
    /// same bucket is still running.
    pub fn start(&self) -> Result<RefillHandle, ConfigError> {
        self.start_with_sink(NullSink)
    }

    /// Like [`TokenBucket::start`], emitting refill events to `sink`.
    pub fn start_with_sink<S>(&self, sink: S) -> Result<RefillHandle, ConfigError>
    where
        S: TelemetrySink,
        S::Future: Send + 'static,
    {
        let run_id = self.shared.claim_run().ok_or(ConfigError::AlreadyStarted)?;

        let interval = self.refill_interval();
        let capacity = self.capacity();
        let running = RunGuard { shared: Arc::downgrade(&self.shared), run_id };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let running = running;
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(?interval, capacity, run_id, "token bucket: refill started");
            emit_best_effort(sink.clone(), BucketEvent::RefillStarted { interval }).await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let Some(shared) = running.shared.upgrade() else {
                            tracing::debug!("token bucket dropped, refill exiting");
                            break;
                        };
                        match shared.refill() {
                            Some(current_size) => {
                                drop(shared);
                                tracing::trace!(current_size, capacity, "token bucket: refilled");
                                emit_best_effort(
                                    sink.clone(),
                                    BucketEvent::Refilled { current_size, capacity },
                                )
                                .await;
                            }
                            None => tracing::trace!(capacity, "token bucket: full, tick skipped"),
                        }
                    }
                }
            }

            tracing::info!(run_id, "token bucket: refill stopped");
            emit_best_effort(sink, BucketEvent::RefillStopped).await;
        });

        Ok(RefillHandle {
            run: RunGuard { shared: Arc::downgrade(&self.shared), run_id },
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Releases the bucket for its refill run when dropped.
///
/// Held by both the task and its handle, so the bucket is free again as soon
/// as either the task ends or the handle is dropped. Releasing is keyed by
/// run id and never frees a bucket that a later run has claimed.
#[derive(Debug)]
struct RunGuard {
    shared: Weak<Shared>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.release_run(self.run_id);
        }
    }
}

/// Owns a running refill process.
///
/// Dropping the handle aborts the task and frees the bucket for a new
/// [`TokenBucket::start`] right away; [`RefillHandle::stop`] shuts it down
/// gracefully and waits for it to finish.
#[derive(Debug)]
pub struct RefillHandle {
    run: RunGuard,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefillHandle {
    /// Signal the task to stop and wait until it has exited.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(run_id = self.run.run_id, %err, "token bucket: refill task failed");
            }
        }
    }

    /// Whether the task has exited (stopped, aborted, or its bucket was dropped).
    pub fn is_finished(&self) -> bool {
        match &self.task {
            Some(task) => task.is_finished(),
            None => true,
        }
    }
}

impl Drop for RefillHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
