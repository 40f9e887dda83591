//! Error types for draft staging and promotion.
//!
//! `RemoteError` is what the backend collaborator reports; `DraftError` is
//! what this subsystem surfaces to the dialog.

use thiserror::Error;

use super::ids::{LocalId, RemoteId};
use crate::models::ChildKind;

/// Failure reported by the remote resource API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Rejected by the server; the message is shown to the user verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// One draft entry that could not be promoted after the parent was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionFailure {
    pub kind: ChildKind,
    pub local_id: LocalId,
    pub label: String,
    /// Usually `DraftError::Remote`; `LockPoisoned` if the store could not
    /// record a successful create.
    pub error: DraftError,
}

/// Aggregate of every entry left in draft status after a promotion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialPromotionError {
    pub parent_id: RemoteId,
    pub promoted: usize,
    pub failures: Vec<PromotionFailure>,
}

impl std::fmt::Display for PartialPromotionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} staged entries failed to save under consultation {}",
            self.failures.len(),
            self.failures.len() + self.promoted,
            self.parent_id
        )
    }
}

impl std::error::Error for PartialPromotionError {}

impl PartialPromotionError {
    pub fn failed_ids(&self) -> Vec<LocalId> {
        self.failures.iter().map(|f| f.local_id).collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    PartialPromotion(#[from] PartialPromotionError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate selection: {0}")]
    Duplicate(String),

    #[error("Selection limit of {max} reached")]
    CardinalityExceeded { max: usize },

    #[error("No draft session is active")]
    SessionNotStarted,

    #[error("A draft session is already active")]
    SessionActive,

    #[error("Consultation already committed as {0}")]
    AlreadyCommitted(RemoteId),

    #[error("Consultation is already being saved")]
    SubmitInProgress,

    #[error("Consultation has not been saved yet")]
    ParentNotCommitted,

    #[error("Consultation is already saved; stage entries against {0}")]
    ParentCommitted(RemoteId),

    #[error("{kind} entry {local_id} not found")]
    EntryNotFound { kind: ChildKind, local_id: LocalId },

    #[error("{kind} entry {local_id} has a request in flight")]
    EntryBusy { kind: ChildKind, local_id: LocalId },

    #[error("Internal lock error")]
    LockPoisoned,
}

impl DraftError {
    /// Local precondition failures; nothing was sent to the backend.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DraftError::Validation(_)
                | DraftError::Duplicate(_)
                | DraftError::CardinalityExceeded { .. }
        )
    }

    /// A remote call was attempted and failed.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DraftError::Remote(RemoteError::Transport(_) | RemoteError::NotFound(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_local_and_remote_failures() {
        assert!(DraftError::Duplicate("E11".into()).is_validation());
        assert!(DraftError::CardinalityExceeded { max: 1 }.is_validation());
        assert!(!DraftError::SessionNotStarted.is_validation());

        let transport: DraftError = RemoteError::Transport("timeout".into()).into();
        assert!(transport.is_transport());
        assert!(!transport.is_validation());
    }

    #[test]
    fn server_validation_message_is_verbatim() {
        let err = RemoteError::Validation("Patient is required".into());
        assert_eq!(err.to_string(), "Patient is required");
    }

    #[test]
    fn partial_promotion_message_counts_entries() {
        let err = PartialPromotionError {
            parent_id: RemoteId::from(42),
            promoted: 2,
            failures: vec![PromotionFailure {
                kind: ChildKind::VitalSign,
                local_id: LocalId::new(),
                label: "heart_rate 80 bpm".into(),
                error: RemoteError::Transport("503".into()).into(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "1 of 3 staged entries failed to save under consultation 42"
        );
    }
}
