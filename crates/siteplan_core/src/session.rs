use std::time::Duration;

use crate::{ImportState, ImportStatus, SessionEnd};

/// What the driver should do next with an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPoll {
    /// Wait this long, then issue the next status check.
    Wait(Duration),
    /// The deadline has passed; the session is over.
    TimedOut,
}

/// Explicit state for one polling session over a single import.
///
/// Each poll attempt takes a sequence number, and only the most recently
/// issued attempt may deliver its response. A slow round trip can therefore
/// never land behind a newer one, and a cancelled-then-restarted caller can
/// never observe out-of-order updates.
///
/// The session owns no clock; the driver reports elapsed time to [`tick`].
///
/// [`tick`]: PollSession::tick
#[derive(Debug, Clone)]
pub struct PollSession {
    import_id: String,
    interval: Duration,
    timeout: Duration,
    next_seq: u64,
    current_seq: Option<u64>,
    last_rank: Option<u8>,
    end: Option<SessionEnd>,
}

impl PollSession {
    pub fn new(import_id: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            import_id: import_id.into(),
            interval,
            timeout,
            next_seq: 0,
            current_seq: None,
            last_rank: None,
            end: None,
        }
    }

    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// How the session ended, once it has.
    pub fn end(&self) -> Option<SessionEnd> {
        self.end
    }

    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }

    /// Registers a new poll attempt and returns its sequence number.
    pub fn begin_attempt(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.current_seq = Some(seq);
        seq
    }

    /// Records the response of attempt `seq`.
    ///
    /// Returns the status to forward, or `None` when the response must be
    /// discarded: the session already ended, a newer attempt superseded
    /// this one, or the reported state moved backward. Equal states are
    /// forwarded again every poll; callers that want one update per state
    /// filter on `state` themselves.
    pub fn on_status(&mut self, seq: u64, status: ImportStatus) -> Option<ImportStatus> {
        if self.end.is_some() || self.current_seq != Some(seq) {
            return None;
        }
        let rank = status.state.rank();
        if self.last_rank.is_some_and(|last| rank < last) {
            return None;
        }
        self.last_rank = Some(rank);
        match status.state {
            ImportState::Completed => self.end = Some(SessionEnd::Completed),
            ImportState::Failed => self.end = Some(SessionEnd::Failed),
            ImportState::Queued | ImportState::Running => {}
        }
        Some(status)
    }

    /// Records a failed attempt.
    ///
    /// Failing to reach the server is not a failure of the job; the session
    /// keeps polling until its deadline.
    pub fn on_attempt_error(&mut self, seq: u64) {
        if self.current_seq == Some(seq) {
            self.current_seq = None;
        }
    }

    /// Decides the next step given how long the session has been running.
    ///
    /// Once `elapsed` reaches the timeout the session ends as `TimedOut`.
    /// Otherwise the returned wait is clamped to the remaining time, so the
    /// driver never sleeps past the deadline.
    pub fn tick(&mut self, elapsed: Duration) -> NextPoll {
        if elapsed >= self.timeout {
            self.end.get_or_insert(SessionEnd::TimedOut);
            NextPoll::TimedOut
        } else {
            NextPoll::Wait(self.interval.min(self.timeout - elapsed))
        }
    }

    /// Cancels the session.
    ///
    /// Idempotent: repeated calls, or a cancel after the session already
    /// ended, change nothing. Any response still in flight is discarded by
    /// [`on_status`](PollSession::on_status).
    pub fn cancel(&mut self) {
        self.end.get_or_insert(SessionEnd::Cancelled);
    }
}
