use std::fmt;

/// Lifecycle of a drawing import job as reported by the server.
///
/// For a given import the reported state only ever moves forward through
/// Queued -> Running -> Completed/Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ImportState {
    /// Whether the job itself is finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed)
    }

    /// Position in the forward-only lifecycle, used to reject regressions.
    pub(crate) fn rank(self) -> u8 {
        match self {
            ImportState::Queued => 0,
            ImportState::Running => 1,
            ImportState::Completed | ImportState::Failed => 2,
        }
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportState::Queued => write!(f, "queued"),
            ImportState::Running => write!(f, "running"),
            ImportState::Completed => write!(f, "completed"),
            ImportState::Failed => write!(f, "failed"),
        }
    }
}

/// One status snapshot of an import, echoed verbatim from the server.
///
/// Timestamps stay as the RFC3339 strings the server sent; nothing in the
/// client interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatus {
    pub import_id: String,
    pub state: ImportState,
    pub requested_at: String,
    pub completed_at: Option<String>,
    pub result: Option<ImportResult>,
    pub error: Option<String>,
}

/// Payload of a completed import: the unit ids recognised in the drawing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportResult {
    pub detected_units: Vec<String>,
}

/// Why a polling session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The job reached `Completed`.
    Completed,
    /// The job reached `Failed`.
    Failed,
    /// The session deadline elapsed before the job finished.
    TimedOut,
    /// The caller cancelled the session.
    Cancelled,
}
