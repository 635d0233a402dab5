//! Multipart upload sessions.
//!
//! Sessions are values owned by the caller. The transport rebuilds one from
//! the `(uploadId, key, ownerId)` triple on every request, so any process can
//! serve any session; the store stays the source of truth for parts.

use std::fmt;

use parcel_model::Principal;
use serde::{Deserialize, Serialize};

use crate::error::{UploadError, UploadResult};

/// Lifecycle of a multipart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Created at the store, no part activity yet.
    Initiated,
    /// Parts are being signed or listed.
    PartsInFlight,
    /// Assembled into the final object.
    Completed,
    /// Discarded.
    Aborted,
}

impl SessionStatus {
    /// `Completed` and `Aborted` never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initiated => "Initiated",
            Self::PartsInFlight => "PartsInFlight",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

/// One multipart upload as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Store-issued upload id.
    pub upload_id: String,
    /// Object key, fixed at initiation.
    pub key: String,
    /// Owning entity the key is scoped under.
    pub owner_id: String,
    /// Principal driving the session.
    pub owner_principal: Principal,
    /// Record to update on completion.
    pub associated_record_id: Option<String>,
    /// Content type given at initiation, when known.
    pub content_type: Option<String>,
    status: SessionStatus,
}

impl UploadSession {
    pub(crate) fn initiated(
        upload_id: String,
        key: String,
        owner_id: String,
        owner_principal: Principal,
        associated_record_id: Option<String>,
        content_type: String,
    ) -> Self {
        Self {
            upload_id,
            key,
            owner_id,
            owner_principal,
            associated_record_id,
            content_type: Some(content_type),
            status: SessionStatus::Initiated,
        }
    }

    /// Rebuild a session from what a client sends back.
    pub fn resume(
        upload_id: impl Into<String>,
        key: impl Into<String>,
        owner_id: impl Into<String>,
        owner_principal: Principal,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            key: key.into(),
            owner_id: owner_id.into(),
            owner_principal,
            associated_record_id: None,
            content_type: None,
            status: SessionStatus::Initiated,
        }
    }

    /// Attach the record to update on completion.
    #[must_use]
    pub fn with_record(mut self, record_id: Option<String>) -> Self {
        self.associated_record_id = record_id;
        self
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Fail with [`UploadError::InvalidState`] if the session is terminal.
    pub fn ensure_active(&self) -> UploadResult<()> {
        if self.status.is_terminal() {
            return Err(UploadError::InvalidState(format!(
                "Upload {} is already {}",
                self.upload_id, self.status
            )));
        }
        Ok(())
    }

    pub(crate) fn mark_parts_in_flight(&mut self) {
        if self.status == SessionStatus::Initiated {
            self.status = SessionStatus::PartsInFlight;
        }
    }

    pub(crate) fn mark_completed(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Completed;
        }
    }

    pub(crate) fn mark_aborted(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Aborted;
        }
    }
}

/// What happened to the catalog record after an upload completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSync {
    /// No record id was supplied.
    NotRequested,
    /// The record now points at the object.
    Updated,
    /// The object exists but the record was not updated.
    Failed {
        /// Why the update failed.
        reason: String,
    },
}

impl RecordSync {
    /// Whether the record points at the object.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        UploadSession::resume("u-1", "resources/p/r/a.csv", "p", Principal::new("alice"))
    }

    #[test]
    fn test_should_move_through_lifecycle() {
        let mut s = session();
        assert_eq!(s.status(), SessionStatus::Initiated);
        s.mark_parts_in_flight();
        assert_eq!(s.status(), SessionStatus::PartsInFlight);
        assert!(s.ensure_active().is_ok());
        s.mark_completed();
        assert_eq!(s.status(), SessionStatus::Completed);
        assert!(matches!(s.ensure_active(), Err(UploadError::InvalidState(_))));
    }

    #[test]
    fn test_should_reach_terminal_state_once() {
        let mut s = session();
        s.mark_aborted();
        s.mark_completed();
        s.mark_parts_in_flight();
        assert_eq!(s.status(), SessionStatus::Aborted);
    }

    #[test]
    fn test_should_report_record_sync() {
        assert!(RecordSync::Updated.is_updated());
        assert!(!RecordSync::NotRequested.is_updated());
        assert!(!RecordSync::Failed { reason: "x".into() }.is_updated());
    }
}
