//! Staging store for one kind of consultation child record.
//!
//! Entries live locally as drafts while the consultation has no backend id.
//! Every mutating operation branches on the entry's lifecycle: drafts are
//! changed in memory only, committed entries go through the remote API and
//! change locally only after the call succeeds.
//!
//! Mutations on one store are serialized by an async mutex, so a remote
//! call for an entry never overlaps another mutation or a promotion pass.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::{DraftError, PromotionFailure};
use super::ids::{LocalId, ParentRef, RemoteId};
use super::promotion::{Promotable, PromotionEvent, PromotionEventFn, StorePromotion};
use super::remote::ChildApi;
use super::session::DraftSession;
use crate::models::{ChildKind, ChildPayload, EntryStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Draft,
    Committed(RemoteId),
    /// Remote delete in flight.
    Deleting(RemoteId),
}

/// One child record held by the dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingEntry<P> {
    local_id: LocalId,
    lifecycle: Lifecycle,
    parent_ref: ParentRef,
    payload: P,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl<P: ChildPayload> StagingEntry<P> {
    fn draft(payload: P) -> Self {
        Self {
            local_id: LocalId::new(),
            lifecycle: Lifecycle::Draft,
            parent_ref: ParentRef::Draft,
            payload,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    fn committed(parent_id: RemoteId, remote_id: RemoteId, payload: P) -> Self {
        Self {
            local_id: LocalId::new(),
            lifecycle: Lifecycle::Committed(remote_id),
            parent_ref: ParentRef::Committed(parent_id),
            payload,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn kind(&self) -> ChildKind {
        P::KIND
    }

    pub fn status(&self) -> EntryStatus {
        match self.lifecycle {
            Lifecycle::Draft => EntryStatus::Draft,
            Lifecycle::Committed(_) => EntryStatus::Committed,
            Lifecycle::Deleting(_) => EntryStatus::Deleting,
        }
    }

    /// Backend id; `None` while the entry is a draft.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match &self.lifecycle {
            Lifecycle::Draft => None,
            Lifecycle::Committed(id) | Lifecycle::Deleting(id) => Some(id),
        }
    }

    pub fn parent_ref(&self) -> &ParentRef {
        &self.parent_ref
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Error from the last failed promotion attempt, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug)]
struct StoreState<P> {
    generation: u64,
    entries: Vec<StagingEntry<P>>,
}

impl<P: ChildPayload> StoreState<P> {
    fn position(&self, local_id: LocalId) -> Option<usize> {
        self.entries.iter().position(|e| e.local_id == local_id)
    }

    fn get_mut(&mut self, local_id: LocalId) -> Option<&mut StagingEntry<P>> {
        self.entries.iter_mut().find(|e| e.local_id == local_id)
    }
}

/// Staged child records of kind `P::KIND` for the current consultation.
pub struct StagingStore<P: ChildPayload> {
    session: DraftSession,
    api: Arc<dyn ChildApi<P>>,
    state: Mutex<StoreState<P>>,
    ops: tokio::sync::Mutex<()>,
}

impl<P: ChildPayload> StagingStore<P> {
    pub fn new(session: DraftSession, api: Arc<dyn ChildApi<P>>) -> Self {
        Self {
            session,
            api,
            state: Mutex::new(StoreState {
                generation: 0,
                entries: Vec::new(),
            }),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn kind(&self) -> ChildKind {
        P::KIND
    }

    /// Lock local state, dropping entries left over from a reset session.
    fn lock_state(&self) -> Result<MutexGuard<'_, StoreState<P>>, DraftError> {
        let generation = self.session.generation()?;
        let mut state = self.state.lock().map_err(|_| DraftError::LockPoisoned)?;
        if state.generation != generation {
            if !state.entries.is_empty() {
                tracing::debug!(
                    kind = P::KIND.as_str(),
                    discarded = state.entries.len(),
                    "Session reset, discarding staged entries"
                );
            }
            state.entries.clear();
            state.generation = generation;
        }
        Ok(state)
    }

    /// Fail fast while a remote delete for the entry is in flight, instead
    /// of queueing behind it on `ops`.
    fn ensure_not_deleting(&self, local_id: LocalId) -> Result<(), DraftError> {
        let state = self.lock_state()?;
        match state.entries.iter().find(|e| e.local_id == local_id) {
            Some(entry) if matches!(entry.lifecycle, Lifecycle::Deleting(_)) => {
                Err(DraftError::EntryBusy {
                    kind: P::KIND,
                    local_id,
                })
            }
            _ => Ok(()),
        }
    }

    // ── Add ─────────────────────────────────────────────────

    /// Stage an entry locally while the consultation is still a draft.
    pub fn add_draft(&self, payload: P) -> Result<StagingEntry<P>, DraftError> {
        match self.session.effective_parent()? {
            ParentRef::Committed(parent_id) => Err(DraftError::ParentCommitted(parent_id)),
            ParentRef::Draft => {
                let entry = StagingEntry::draft(payload);
                let mut state = self.lock_state()?;
                state.entries.push(entry.clone());
                tracing::debug!(
                    kind = P::KIND.as_str(),
                    local_id = %entry.local_id,
                    staged = state.entries.len(),
                    "Draft entry staged"
                );
                Ok(entry)
            }
        }
    }

    /// Create the entry on the backend under the committed consultation.
    ///
    /// On failure the store is left untouched and the error is returned.
    pub async fn add_committed(&self, payload: P) -> Result<StagingEntry<P>, DraftError> {
        let _op = self.ops.lock().await;

        let parent_id = match self.session.effective_parent()? {
            ParentRef::Draft => return Err(DraftError::ParentNotCommitted),
            ParentRef::Committed(parent_id) => parent_id,
        };
        let generation = self.session.generation()?;

        let remote_id = match self.api.create_child(&parent_id, &payload).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    kind = P::KIND.as_str(),
                    parent_id = %parent_id,
                    error = %e,
                    "Failed to create child record"
                );
                return Err(e.into());
            }
        };

        let mut state = self.lock_state()?;
        if state.generation != generation {
            tracing::warn!(
                kind = P::KIND.as_str(),
                remote_id = %remote_id,
                "Session closed while create was in flight, entry not tracked"
            );
            return Err(DraftError::SessionNotStarted);
        }
        let entry = StagingEntry::committed(parent_id, remote_id, payload);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    /// Stage or create depending on whether the consultation exists yet.
    pub async fn add(&self, payload: P) -> Result<StagingEntry<P>, DraftError> {
        match self.session.effective_parent()? {
            ParentRef::Draft => self.add_draft(payload),
            ParentRef::Committed(_) => self.add_committed(payload).await,
        }
    }

    // ── Remove / edit ───────────────────────────────────────

    /// Remove an entry. Unknown ids are a no-op and return `Ok(None)`.
    ///
    /// Committed entries are deleted remotely first; if that fails the entry
    /// stays in the store and the error is returned.
    pub async fn remove(&self, local_id: LocalId) -> Result<Option<StagingEntry<P>>, DraftError> {
        self.ensure_not_deleting(local_id)?;
        let _op = self.ops.lock().await;

        let remote_id = {
            let mut state = self.lock_state()?;
            let Some(pos) = state.position(local_id) else {
                return Ok(None);
            };
            match state.entries[pos].lifecycle.clone() {
                Lifecycle::Draft => {
                    let removed = state.entries.remove(pos);
                    tracing::debug!(
                        kind = P::KIND.as_str(),
                        local_id = %local_id,
                        "Draft entry removed"
                    );
                    return Ok(Some(removed));
                }
                Lifecycle::Deleting(_) => {
                    return Err(DraftError::EntryBusy {
                        kind: P::KIND,
                        local_id,
                    })
                }
                Lifecycle::Committed(remote_id) => {
                    state.entries[pos].lifecycle = Lifecycle::Deleting(remote_id.clone());
                    remote_id
                }
            }
        };

        let result = self.api.delete_child(&remote_id).await;

        let mut state = self.lock_state()?;
        match result {
            Ok(()) => {
                let removed = state
                    .position(local_id)
                    .map(|pos| state.entries.remove(pos));
                tracing::debug!(
                    kind = P::KIND.as_str(),
                    remote_id = %remote_id,
                    "Committed entry deleted"
                );
                Ok(removed)
            }
            Err(e) => {
                if let Some(entry) = state.get_mut(local_id) {
                    entry.lifecycle = Lifecycle::Committed(remote_id.clone());
                }
                tracing::warn!(
                    kind = P::KIND.as_str(),
                    remote_id = %remote_id,
                    error = %e,
                    "Failed to delete child record"
                );
                Err(e.into())
            }
        }
    }

    /// Replace an entry's payload. Committed entries are updated remotely
    /// first and change locally only on success.
    pub async fn edit(&self, local_id: LocalId, payload: P) -> Result<StagingEntry<P>, DraftError> {
        self.ensure_not_deleting(local_id)?;
        let _op = self.ops.lock().await;

        let remote_id = {
            let mut state = self.lock_state()?;
            let entry = state.get_mut(local_id).ok_or(DraftError::EntryNotFound {
                kind: P::KIND,
                local_id,
            })?;
            match &entry.lifecycle {
                Lifecycle::Draft => {
                    entry.payload = payload;
                    return Ok(entry.clone());
                }
                Lifecycle::Deleting(_) => {
                    return Err(DraftError::EntryBusy {
                        kind: P::KIND,
                        local_id,
                    })
                }
                Lifecycle::Committed(remote_id) => remote_id.clone(),
            }
        };

        if let Err(e) = self.api.update_child(&remote_id, &payload).await {
            tracing::warn!(
                kind = P::KIND.as_str(),
                remote_id = %remote_id,
                error = %e,
                "Failed to update child record"
            );
            return Err(e.into());
        }

        let mut state = self.lock_state()?;
        let entry = state.get_mut(local_id).ok_or(DraftError::EntryNotFound {
            kind: P::KIND,
            local_id,
        })?;
        entry.payload = payload;
        Ok(entry.clone())
    }

    // ── Read path ───────────────────────────────────────────

    /// Every entry regardless of status, in insertion order.
    pub fn list_all(&self) -> Result<Vec<StagingEntry<P>>, DraftError> {
        Ok(self.lock_state()?.entries.clone())
    }

    pub fn get(&self, local_id: LocalId) -> Result<Option<StagingEntry<P>>, DraftError> {
        let state = self.lock_state()?;
        Ok(state.entries.iter().find(|e| e.local_id == local_id).cloned())
    }

    /// Entries still waiting for a backend id.
    pub fn drafts(&self) -> Result<Vec<StagingEntry<P>>, DraftError> {
        let state = self.lock_state()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.lifecycle == Lifecycle::Draft)
            .cloned()
            .collect())
    }

    /// Drafts whose last promotion attempt failed.
    pub fn failed(&self) -> Result<Vec<StagingEntry<P>>, DraftError> {
        let state = self.lock_state()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.lifecycle == Lifecycle::Draft && e.last_error.is_some())
            .cloned()
            .collect())
    }

    /// Poisoned state reads as empty here; every mutating call and the
    /// `Result` readers surface `LockPoisoned`.
    pub fn len(&self) -> usize {
        self.lock_state().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Edit mode ───────────────────────────────────────────

    /// Replace the store with rows already persisted under the consultation.
    pub fn load_committed(&self, rows: Vec<(RemoteId, P)>) -> Result<(), DraftError> {
        let parent_id = match self.session.effective_parent()? {
            ParentRef::Draft => return Err(DraftError::ParentNotCommitted),
            ParentRef::Committed(parent_id) => parent_id,
        };
        let mut state = self.lock_state()?;
        state.entries = rows
            .into_iter()
            .map(|(remote_id, payload)| {
                StagingEntry::committed(parent_id.clone(), remote_id, payload)
            })
            .collect();
        tracing::debug!(
            kind = P::KIND.as_str(),
            loaded = state.entries.len(),
            "Loaded committed entries"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), DraftError> {
        self.lock_state()?.entries.clear();
        Ok(())
    }

    // ── Promotion ───────────────────────────────────────────

    /// Create one draft remotely and mark it committed.
    ///
    /// Caller must hold `ops`.
    async fn promote_entry(
        &self,
        parent_id: &RemoteId,
        local_id: LocalId,
        payload: &P,
    ) -> Result<RemoteId, PromotionFailure> {
        let failure = |error: DraftError| PromotionFailure {
            kind: P::KIND,
            local_id,
            label: payload.label(),
            error,
        };

        match self.api.create_child(parent_id, payload).await {
            Ok(remote_id) => {
                let mut state = match self.lock_state() {
                    Ok(state) => state,
                    Err(e) => {
                        // The record exists remotely but cannot be tracked.
                        tracing::error!(
                            kind = P::KIND.as_str(),
                            local_id = %local_id,
                            remote_id = %remote_id,
                            error = %e,
                            "Created child record could not be marked committed"
                        );
                        return Err(failure(e));
                    }
                };
                if let Some(entry) = state.get_mut(local_id) {
                    entry.lifecycle = Lifecycle::Committed(remote_id.clone());
                    entry.parent_ref = ParentRef::Committed(parent_id.clone());
                    entry.last_error = None;
                }
                Ok(remote_id)
            }
            Err(error) => {
                match self.lock_state() {
                    Ok(mut state) => {
                        if let Some(entry) = state.get_mut(local_id) {
                            entry.last_error = Some(error.to_string());
                        }
                    }
                    Err(e) => tracing::warn!(
                        kind = P::KIND.as_str(),
                        local_id = %local_id,
                        error = %e,
                        "Could not record promotion failure on entry"
                    ),
                }
                Err(failure(error.into()))
            }
        }
    }

    /// Retry promotion of a single draft after the consultation exists.
    pub async fn retry_promotion(&self, local_id: LocalId) -> Result<StagingEntry<P>, DraftError> {
        let _op = self.ops.lock().await;

        let parent_id = match self.session.effective_parent()? {
            ParentRef::Draft => return Err(DraftError::ParentNotCommitted),
            ParentRef::Committed(parent_id) => parent_id,
        };

        let payload = {
            let state = self.lock_state()?;
            let entry = state
                .entries
                .iter()
                .find(|e| e.local_id == local_id)
                .ok_or(DraftError::EntryNotFound {
                    kind: P::KIND,
                    local_id,
                })?;
            if entry.lifecycle != Lifecycle::Draft {
                return Ok(entry.clone());
            }
            entry.payload.clone()
        };

        self.promote_entry(&parent_id, local_id, &payload)
            .await
            .map_err(|failure| failure.error)?;

        self.get(local_id)?.ok_or(DraftError::EntryNotFound {
            kind: P::KIND,
            local_id,
        })
    }
}

#[async_trait]
impl<P: ChildPayload> Promotable for StagingStore<P> {
    fn kind(&self) -> ChildKind {
        P::KIND
    }

    fn session_generation(&self) -> Result<u64, DraftError> {
        self.session.generation()
    }

    async fn promote_drafts(
        &self,
        parent_id: &RemoteId,
        on_event: Option<&PromotionEventFn>,
    ) -> StorePromotion {
        let _op = self.ops.lock().await;

        match self.session.effective_parent() {
            Ok(ParentRef::Committed(committed)) if &committed == parent_id => {}
            Ok(session_parent) => {
                tracing::warn!(
                    kind = P::KIND.as_str(),
                    requested = %parent_id,
                    session_parent = %session_parent,
                    "Promotion target is not the committed consultation, skipping"
                );
                return StorePromotion::new(P::KIND);
            }
            Err(e) => {
                tracing::warn!(
                    kind = P::KIND.as_str(),
                    error = %e,
                    "Cannot read session for promotion, skipping"
                );
                return StorePromotion::new(P::KIND);
            }
        }

        let drafts: Vec<(LocalId, P)> = match self.lock_state() {
            Ok(state) => state
                .entries
                .iter()
                .filter(|e| e.lifecycle == Lifecycle::Draft)
                .map(|e| (e.local_id, e.payload.clone()))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    kind = P::KIND.as_str(),
                    error = %e,
                    "Cannot read staged entries for promotion"
                );
                Vec::new()
            }
        };

        let mut outcome = StorePromotion::new(P::KIND);

        // Sequential, in insertion order.
        for (local_id, payload) in drafts {
            match self.promote_entry(parent_id, local_id, &payload).await {
                Ok(remote_id) => {
                    tracing::debug!(
                        kind = P::KIND.as_str(),
                        local_id = %local_id,
                        remote_id = %remote_id,
                        "Draft entry promoted"
                    );
                    outcome.promoted.push((local_id, remote_id.clone()));
                    if let Some(emit) = on_event {
                        emit(PromotionEvent::EntryPromoted {
                            kind: P::KIND,
                            local_id,
                            remote_id,
                        });
                    }
                }
                Err(failure) => {
                    tracing::warn!(
                        kind = P::KIND.as_str(),
                        local_id = %local_id,
                        error = %failure.error,
                        "Draft entry failed to promote, continuing"
                    );
                    if let Some(emit) = on_event {
                        emit(PromotionEvent::EntryFailed {
                            kind: P::KIND,
                            local_id,
                            error: failure.error.to_string(),
                        });
                    }
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
    }
}
