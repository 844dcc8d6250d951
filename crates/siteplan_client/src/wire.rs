//! Wire-format types for the import status endpoint.
//!
//! The platform speaks snake_case JSON. These types are the only place the
//! wire shape appears; everything past the client boundary uses the core
//! model types.

use serde::Deserialize;

use siteplan_core::{ImportResult, ImportState, ImportStatus};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImportStatusWire {
    pub status: ImportStateWire,
    pub requested_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub result: Option<ImportResultWire>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ImportStateWire {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImportResultWire {
    #[serde(default)]
    pub detected_units: Vec<String>,
}

impl ImportStatusWire {
    /// Maps the wire payload into the core model. The poll request carries
    /// the import id; the response echoes it as `job_id` when it bothers.
    pub(crate) fn into_status(self, import_id: &str) -> ImportStatus {
        ImportStatus {
            import_id: self.job_id.unwrap_or_else(|| import_id.to_string()),
            state: map_state(self.status),
            requested_at: self.requested_at,
            completed_at: self.completed_at,
            result: self.result.map(|result| ImportResult {
                detected_units: result.detected_units,
            }),
            error: self.error,
        }
    }
}

fn map_state(state: ImportStateWire) -> ImportState {
    match state {
        ImportStateWire::Queued => ImportState::Queued,
        ImportStateWire::Running => ImportState::Running,
        ImportStateWire::Completed => ImportState::Completed,
        ImportStateWire::Failed => ImportState::Failed,
    }
}
