use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use client_logging::client_debug;
use siteplan_core::GenerationGate;

use crate::error::RequestError;

/// The remote computation a trigger coalesces edits into.
///
/// The token is the same one that cancels the pending delay; well-behaved
/// implementations pass it down to [`RemoteClient::send`] so a superseded
/// computation stops early. Correctness does not depend on that: a stale
/// result is discarded by generation either way.
///
/// [`RemoteClient::send`]: crate::RemoteClient::send
#[async_trait]
pub trait Compute<I, R>: Send + Sync {
    async fn compute(&self, inputs: I, cancel: CancellationToken) -> Result<R, RequestError>;
}

/// Receives the outcome of the newest computation.
pub trait ApplySink<R>: Send + Sync {
    fn apply(&self, result: Result<R, RequestError>);
}

/// Sink that forwards outcomes over a std channel.
pub struct ChannelApplySink<R> {
    tx: mpsc::Sender<Result<R, RequestError>>,
}

impl<R> ChannelApplySink<R> {
    pub fn new(tx: mpsc::Sender<Result<R, RequestError>>) -> Self {
        Self { tx }
    }
}

impl<R: Send> ApplySink<R> for ChannelApplySink<R> {
    fn apply(&self, result: Result<R, RequestError>) {
        let _ = self.tx.send(result);
    }
}

/// Coalesces a burst of edits into at most one in-flight recomputation.
///
/// Every [`trigger`](DebouncedTrigger::trigger) restarts the delay; when
/// the delay runs out undisturbed, the newest input snapshot is computed.
/// The outcome is applied only while its generation is still the latest,
/// so an old computation finishing late can never overwrite a newer one.
pub struct DebouncedTrigger<I, R> {
    delay: Duration,
    gate: Arc<GenerationGate>,
    compute: Arc<dyn Compute<I, R>>,
    sink: Arc<dyn ApplySink<R>>,
    pending: Option<CancellationToken>,
}

impl<I, R> DebouncedTrigger<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    pub fn new(
        delay: Duration,
        compute: Arc<dyn Compute<I, R>>,
        sink: Arc<dyn ApplySink<R>>,
    ) -> Self {
        Self {
            delay,
            gate: Arc::new(GenerationGate::new()),
            compute,
            sink,
            pending: None,
        }
    }

    /// Records an edit and (re)starts the delay.
    ///
    /// Must be called from within a tokio runtime, and always from the same
    /// logical call site; the trigger owns its pending run exclusively.
    pub fn trigger(&mut self, inputs: I) {
        let generation = self.gate.advance();
        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.pending = Some(cancel.clone());

        let delay = self.delay;
        let gate = Arc::clone(&self.gate);
        let compute = Arc::clone(&self.compute);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let result = compute.compute(inputs, cancel).await;

            if !gate.is_current(generation) {
                client_debug!("discarding superseded recompute (generation {})", generation);
                return;
            }
            match result {
                // A cancelled computation was superseded or abandoned;
                // nobody wants to hear about it.
                Err(err) if err.is_cancelled() => {}
                other => sink.apply(other),
            }
        });
    }

    /// Cancels the pending delay and makes any in-flight computation
    /// stale. Idempotent.
    pub fn cancel(&mut self) {
        self.gate.advance();
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    /// Generation of the newest edit; results tagged with anything older
    /// are discarded.
    pub fn generation(&self) -> u64 {
        self.gate.current()
    }
}
