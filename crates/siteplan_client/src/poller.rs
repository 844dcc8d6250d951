use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use client_logging::{client_debug, client_warn};
use siteplan_core::{ImportStatus, NextPoll, PollSession, SessionEnd};

use crate::client::RemoteClient;
use crate::error::RequestError;
use crate::wire::ImportStatusWire;

/// Timing knobs for one polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between two status checks.
    pub interval: Duration,
    /// Hard deadline for the whole session, measured from start.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Update stream of one polling session, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A status snapshot observed from the server.
    Status(ImportStatus),
    /// The deadline elapsed before the job reached a terminal state.
    TimedOut,
}

/// Receives the updates of one polling session.
pub trait UpdateSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

/// Sink that forwards updates over a std channel.
pub struct ChannelUpdateSink {
    tx: mpsc::Sender<PollEvent>,
}

impl ChannelUpdateSink {
    pub fn new(tx: mpsc::Sender<PollEvent>) -> Self {
        Self { tx }
    }
}

impl UpdateSink for ChannelUpdateSink {
    fn emit(&self, event: PollEvent) {
        let _ = self.tx.send(event);
    }
}

/// Source of status snapshots for an import job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, import_id: &str) -> Result<ImportStatus, RequestError>;
}

#[async_trait]
impl StatusSource for RemoteClient {
    async fn fetch_status(&self, import_id: &str) -> Result<ImportStatus, RequestError> {
        let path = format!("imports/{import_id}/status");
        let wire: ImportStatusWire = self.get(&path, None).await?;
        Ok(wire.into_status(import_id))
    }
}

/// Handle to a running poll session.
///
/// Dropping the handle does not stop the session; call
/// [`cancel`](PollHandle::cancel).
#[derive(Debug, Clone)]
pub struct PollHandle {
    cancel: CancellationToken,
}

impl PollHandle {
    /// Stops the session. Idempotent: after the first call no further
    /// updates are delivered, and calling again changes nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Starts polling `import_id` until the job completes or fails, the
/// deadline elapses, or the returned handle is cancelled. The first status
/// check goes out immediately.
///
/// Must be called from within a tokio runtime.
pub fn start_poll(
    source: Arc<dyn StatusSource>,
    import_id: impl Into<String>,
    options: PollOptions,
    sink: Arc<dyn UpdateSink>,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let import_id = import_id.into();
    tokio::spawn(async move {
        let end = run_session(source, &import_id, options, sink, token).await;
        client_debug!("poll session for {} ended: {:?}", import_id, end);
    });
    PollHandle { cancel }
}

async fn run_session(
    source: Arc<dyn StatusSource>,
    import_id: &str,
    options: PollOptions,
    sink: Arc<dyn UpdateSink>,
    cancel: CancellationToken,
) -> SessionEnd {
    let mut session = PollSession::new(import_id, options.interval, options.timeout);
    let started = Instant::now();

    loop {
        let seq = session.begin_attempt();
        let remaining = options.timeout.saturating_sub(started.elapsed());

        // The round trip itself is raced against the deadline and the
        // caller's cancellation: a Completed that would arrive moments
        // after the deadline still ends the session as TimedOut.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.cancel();
                return SessionEnd::Cancelled;
            }
            _ = tokio::time::sleep(remaining) => {
                session.tick(started.elapsed());
                sink.emit(PollEvent::TimedOut);
                return SessionEnd::TimedOut;
            }
            outcome = source.fetch_status(import_id) => outcome,
        };

        match outcome {
            Ok(status) => {
                if let Some(status) = session.on_status(seq, status) {
                    sink.emit(PollEvent::Status(status));
                }
                if let Some(end) = session.end() {
                    return end;
                }
            }
            Err(err) if err.is_cancelled() => {
                session.cancel();
                return SessionEnd::Cancelled;
            }
            Err(err) => {
                // No update this cycle; the job may still be fine even if
                // the server is momentarily out of reach.
                client_warn!("status check for {} failed: {}", import_id, err);
                session.on_attempt_error(seq);
            }
        }

        match session.tick(started.elapsed()) {
            NextPoll::TimedOut => {
                sink.emit(PollEvent::TimedOut);
                return SessionEnd::TimedOut;
            }
            NextPoll::Wait(wait) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        session.cancel();
                        return SessionEnd::Cancelled;
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
                // Waking exactly at the deadline must not buy one more poll.
                if let NextPoll::TimedOut = session.tick(started.elapsed()) {
                    sink.emit(PollEvent::TimedOut);
                    return SessionEnd::TimedOut;
                }
            }
        }
    }
}
