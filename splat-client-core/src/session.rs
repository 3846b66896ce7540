//! Upload session state machine.
//!
//! [`UploadSession`] holds the state of one selected file and its most recent
//! upload attempt. All transitions are plain synchronous methods; the async
//! driver lives in [`crate::manager`].
//!
//! ```text
//! Idle -> Selected -> Uploading -> Succeeded
//!            ^                  \-> Failed
//!            +---- select_file ----/
//! ```
//!
//! Events coming back from a transport carry the [`AttemptId`] they belong to.
//! Anything addressed to an attempt that is not the one currently uploading is
//! ignored, so a cancelled or superseded transport cannot touch the session.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::contract::TransportResponse;
use crate::error::{ClientError, SessionError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(Uuid);

impl AttemptId {
    fn generate() -> Self {
        AttemptId(Uuid::new_v4())
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Selected,
    Uploading,
    Succeeded,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Failed)
    }
}

/// Terminal result of an attempt: the parsed server payload or the failure.
pub type UploadOutcome = Result<Value, ClientError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSession {
    file_path: Option<PathBuf>,
    status: SessionStatus,
    progress: f64,
    attempt: Option<AttemptId>,
    result: Option<UploadOutcome>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// The current attempt, or the last one once it has terminated.
    pub fn attempt(&self) -> Option<AttemptId> {
        self.attempt
    }

    /// Present only in `Succeeded` and `Failed`.
    pub fn result(&self) -> Option<&UploadOutcome> {
        self.result.as_ref()
    }

    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.status == SessionStatus::Uploading && self.attempt == Some(attempt)
    }

    pub fn select_file(&mut self, path: PathBuf) -> Result<(), SessionError> {
        if self.status == SessionStatus::Uploading {
            warn!(file = ?path, "Ignoring file selection while an upload is in flight");
            return Err(SessionError::UploadInProgress);
        }
        debug!(file = ?path, previous = ?self.status, "File selected");
        self.file_path = Some(path);
        self.status = SessionStatus::Selected;
        self.progress = 0.0;
        self.result = None;
        Ok(())
    }

    /// Enter `Uploading` with a fresh attempt id. Retrying from a terminal
    /// state reuses the selected file.
    pub fn begin(&mut self) -> Result<(AttemptId, PathBuf), SessionError> {
        if self.status == SessionStatus::Uploading {
            return Err(SessionError::UploadInProgress);
        }
        let path = self
            .file_path
            .clone()
            .ok_or(ValidationError::MissingField("file"))?;
        let attempt = AttemptId::generate();
        self.status = SessionStatus::Uploading;
        self.progress = 0.0;
        self.result = None;
        self.attempt = Some(attempt);
        Ok((attempt, path))
    }

    /// Returns whether the value changed what a caller would display.
    pub fn record_progress(&mut self, attempt: AttemptId, fraction: f64) -> bool {
        if !self.is_current(attempt) || fraction.is_nan() {
            return false;
        }
        let clamped = fraction.clamp(0.0, 1.0);
        if clamped <= self.progress {
            return false;
        }
        self.progress = clamped;
        true
    }

    /// Settle the attempt from a transport response. Returns the outcome it
    /// was settled with, or `None` if the attempt is no longer current.
    pub fn complete(
        &mut self,
        attempt: AttemptId,
        response: &TransportResponse,
    ) -> Option<UploadOutcome> {
        if !self.is_current(attempt) {
            debug!(%attempt, "Dropping completion for a stale attempt");
            return None;
        }
        let outcome = classify_upload_response(response);
        match &outcome {
            Ok(payload) => {
                self.status = SessionStatus::Succeeded;
                self.result = Some(Ok(payload.clone()));
            }
            Err(reason) => self.settle_failed(reason.clone()),
        }
        Some(outcome)
    }

    pub fn fail(&mut self, attempt: AttemptId, reason: ClientError) -> Option<UploadOutcome> {
        if !self.is_current(attempt) {
            debug!(%attempt, "Dropping failure for a stale attempt");
            return None;
        }
        self.settle_failed(reason.clone());
        Some(Err(reason))
    }

    /// Abort the running attempt, returning its id. No-op otherwise.
    pub fn cancel(&mut self) -> Option<AttemptId> {
        if self.status != SessionStatus::Uploading {
            return None;
        }
        self.settle_failed(ClientError::Cancelled);
        self.attempt
    }

    /// Back to `Idle`, forgetting the selection.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Uploading {
            return Err(SessionError::UploadInProgress);
        }
        *self = UploadSession {
            attempt: self.attempt,
            ..UploadSession::default()
        };
        Ok(())
    }

    fn settle_failed(&mut self, reason: ClientError) {
        self.status = SessionStatus::Failed;
        self.progress = 0.0;
        self.result = Some(Err(reason));
    }
}

/// Decide what an upload response means for the caller.
///
/// A 2xx status is only a success if the body is JSON. Any other status is a
/// server error carrying the body's `error` text when present.
pub fn classify_upload_response(response: &TransportResponse) -> UploadOutcome {
    if !response.is_success() {
        return Err(ClientError::Server {
            status: response.status,
            message: response.error_message(),
        });
    }
    serde_json::from_str::<Value>(&response.body).map_err(|e| ClientError::MalformedResponse {
        reason: e.to_string(),
        server_message: None,
    })
}
