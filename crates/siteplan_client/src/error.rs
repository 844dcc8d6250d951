use serde::Deserialize;
use thiserror::Error;

/// A failed remote call, normalised into one of a fixed set of kinds.
///
/// This is the sole error shape surfaced by the client: feature code
/// branches on [`ErrorKind`] and shows `message` where it wants to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RequestError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled")
    }

    /// Status code for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }

    /// Whether the caller's own token stopped this call. Cancelled calls
    /// are silent by convention; everything else is a real failure.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller's cancellation token fired before a response arrived.
    Cancelled,
    /// The transport failed before the server produced any response.
    Unreachable,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The success body did not decode as the expected shape.
    Malformed,
}

/// Longest plain-text error body we will surface verbatim.
const MAX_PLAIN_BODY: usize = 200;

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Maps a transport-level failure: the server was never reached, or the
/// connection died before a response existed.
pub(crate) fn classify_transport(err: &reqwest::Error) -> RequestError {
    RequestError::new(ErrorKind::Unreachable, err.to_string())
}

/// Builds the error for a non-success response.
///
/// Prefers a structured `{"detail": ...}` body, then a short markup-free
/// plain-text body, then a fixed per-status message.
pub fn classify_response(status: u16, body: &str) -> RequestError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.detail.filter(|d| !d.trim().is_empty()) {
            return RequestError::new(ErrorKind::HttpStatus(status), detail);
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= MAX_PLAIN_BODY && !trimmed.contains('<') {
        return RequestError::new(ErrorKind::HttpStatus(status), trimmed);
    }

    RequestError::new(ErrorKind::HttpStatus(status), message_for_status(status))
}

/// Fixed messages for the statuses the platform commonly returns.
fn message_for_status(status: u16) -> String {
    let text = match status {
        400 => "the request was rejected as invalid",
        401 => "you are not signed in",
        403 => "you do not have access to this resource",
        404 => "the requested resource does not exist",
        409 => "the resource was changed by someone else",
        422 => "the submitted data could not be processed",
        429 => "too many requests, slow down",
        500 => "the server hit an internal error",
        502 | 503 | 504 => "the server is temporarily unavailable",
        other => return format!("request failed with status {other}"),
    };
    text.to_string()
}
