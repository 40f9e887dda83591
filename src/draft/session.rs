//! Draft session controller for one consultation dialog.
//!
//! `DraftSession` is a cloneable handle over shared state. Every staging
//! store keeps a clone and asks it for the effective parent on each
//! operation, so the commit transition is observed by all stores at once.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::error::DraftError;
use super::ids::{ParentRef, RemoteId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Draft {
        opened_at: DateTime<Utc>,
    },
    Committed {
        parent_id: RemoteId,
        opened_at: DateTime<Utc>,
        /// False when the session was opened on an existing consultation.
        promoted_from_draft: bool,
    },
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    /// Bumped on every start/reset so stores can detect a torn-down session.
    generation: u64,
}

/// Proof that the parent was committed; consumed by the promotion sequencer.
///
/// Not `Clone`: one commit yields exactly one promotion pass.
#[derive(Debug)]
pub struct PromotionTicket {
    parent_id: RemoteId,
    generation: u64,
}

impl PromotionTicket {
    pub fn parent_id(&self) -> &RemoteId {
        &self.parent_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared handle to the lifecycle of one consultation draft.
#[derive(Debug, Clone)]
pub struct DraftSession {
    state: Arc<RwLock<SessionState>>,
}

impl Default for DraftSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftSession {
    /// Create an idle controller; call `start()` when the dialog opens.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState {
                phase: Phase::Idle,
                generation: 0,
            })),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SessionState>, DraftError> {
        self.state.read().map_err(|_| DraftError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SessionState>, DraftError> {
        self.state.write().map_err(|_| DraftError::LockPoisoned)
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Open a new draft. Returns the session generation.
    pub fn start(&self) -> Result<u64, DraftError> {
        let mut guard = self.write()?;
        if guard.phase != Phase::Idle {
            return Err(DraftError::SessionActive);
        }
        guard.generation += 1;
        guard.phase = Phase::Draft {
            opened_at: Utc::now(),
        };
        tracing::info!(generation = guard.generation, "Consultation draft started");
        Ok(guard.generation)
    }

    /// Open a session on a consultation that already exists (edit mode).
    ///
    /// The session starts committed, so no promotion ever runs for it.
    pub fn open_existing(&self, parent_id: RemoteId) -> Result<u64, DraftError> {
        let mut guard = self.write()?;
        if guard.phase != Phase::Idle {
            return Err(DraftError::SessionActive);
        }
        guard.generation += 1;
        tracing::info!(
            generation = guard.generation,
            parent_id = %parent_id,
            "Consultation opened for editing"
        );
        guard.phase = Phase::Committed {
            parent_id,
            opened_at: Utc::now(),
            promoted_from_draft: false,
        };
        Ok(guard.generation)
    }

    /// Record the backend id of the newly created consultation.
    ///
    /// Flips the session to committed exactly once and hands back the
    /// ticket that authorizes the promotion pass.
    pub fn commit_parent(&self, parent_id: RemoteId) -> Result<PromotionTicket, DraftError> {
        let mut guard = self.write()?;
        let opened_at = match &guard.phase {
            Phase::Idle => return Err(DraftError::SessionNotStarted),
            Phase::Committed { parent_id, .. } => {
                return Err(DraftError::AlreadyCommitted(parent_id.clone()))
            }
            Phase::Draft { opened_at } => *opened_at,
        };

        tracing::info!(
            generation = guard.generation,
            parent_id = %parent_id,
            draft_secs = (Utc::now() - opened_at).num_seconds(),
            "Consultation committed"
        );
        guard.phase = Phase::Committed {
            parent_id: parent_id.clone(),
            opened_at,
            promoted_from_draft: true,
        };

        Ok(PromotionTicket {
            parent_id,
            generation: guard.generation,
        })
    }

    /// Tear the session down (dialog closed, or fully saved).
    ///
    /// Stores holding entries from this generation discard them on their
    /// next access.
    pub fn reset(&self) -> Result<(), DraftError> {
        let mut guard = self.write()?;
        if guard.phase == Phase::Idle {
            return Ok(());
        }
        let was_committed = matches!(guard.phase, Phase::Committed { .. });
        guard.phase = Phase::Idle;
        guard.generation += 1;
        tracing::info!(generation = guard.generation, was_committed, "Consultation draft closed");
        Ok(())
    }

    // ── Read path ───────────────────────────────────────────

    /// `Draft` until the parent is committed, then `Committed(id)`.
    pub fn effective_parent(&self) -> Result<ParentRef, DraftError> {
        let guard = self.read()?;
        match &guard.phase {
            Phase::Idle => Err(DraftError::SessionNotStarted),
            Phase::Draft { .. } => Ok(ParentRef::Draft),
            Phase::Committed { parent_id, .. } => Ok(ParentRef::Committed(parent_id.clone())),
        }
    }

    pub fn generation(&self) -> Result<u64, DraftError> {
        Ok(self.read()?.generation)
    }

    pub fn is_active(&self) -> bool {
        self.read()
            .map(|guard| guard.phase != Phase::Idle)
            .unwrap_or(false)
    }

    pub fn is_committed(&self) -> bool {
        self.read()
            .map(|guard| matches!(guard.phase, Phase::Committed { .. }))
            .unwrap_or(false)
    }

    /// True when this session began as a draft and has since been committed.
    pub fn was_promoted_from_draft(&self) -> bool {
        self.read()
            .map(|guard| {
                matches!(
                    guard.phase,
                    Phase::Committed {
                        promoted_from_draft: true,
                        ..
                    }
                )
            })
            .unwrap_or(false)
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.read().ok().and_then(|guard| match &guard.phase {
            Phase::Idle => None,
            Phase::Draft { opened_at } | Phase::Committed { opened_at, .. } => Some(*opened_at),
        })
    }
}
