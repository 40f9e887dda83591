//! Promotion sequencer. Turns staged drafts into backend records once the
//! consultation has been created.
//!
//! Runs strictly sequentially: one store after another, and inside a store
//! one entry at a time in insertion order. A failing entry stays a draft and
//! the pass continues; the consultation itself is never rolled back.

use std::time::Instant;

use async_trait::async_trait;

use super::error::{DraftError, PartialPromotionError, PromotionFailure};
use super::ids::{LocalId, ParentRef, RemoteId};
use super::session::{DraftSession, PromotionTicket};
use crate::models::ChildKind;

/// Progress notifications emitted while a pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionEvent {
    Started {
        parent_id: RemoteId,
        stores: usize,
    },
    EntryPromoted {
        kind: ChildKind,
        local_id: LocalId,
        remote_id: RemoteId,
    },
    EntryFailed {
        kind: ChildKind,
        local_id: LocalId,
        error: String,
    },
    Completed {
        promoted: usize,
        failed: usize,
        duration_ms: u64,
    },
}

pub type PromotionEventFn = dyn Fn(PromotionEvent) + Send + Sync;

/// Result of promoting the drafts of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePromotion {
    pub kind: ChildKind,
    pub promoted: Vec<(LocalId, RemoteId)>,
    pub failures: Vec<PromotionFailure>,
}

impl StorePromotion {
    pub fn new(kind: ChildKind) -> Self {
        Self {
            kind,
            promoted: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// A store whose drafts can be promoted. Implemented by every `StagingStore`.
#[async_trait]
pub trait Promotable: Send + Sync {
    fn kind(&self) -> ChildKind;

    /// Generation of the session the store is bound to.
    fn session_generation(&self) -> Result<u64, DraftError>;

    /// Create every draft entry under `parent_id`, in insertion order.
    ///
    /// Does nothing unless `parent_id` is the session's committed parent.
    async fn promote_drafts(
        &self,
        parent_id: &RemoteId,
        on_event: Option<&PromotionEventFn>,
    ) -> StorePromotion;
}

/// Outcome of a full promotion pass across stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionReport {
    pub parent_id: RemoteId,
    pub stores: Vec<StorePromotion>,
    pub duration_ms: u64,
}

impl PromotionReport {
    pub fn promoted_count(&self) -> usize {
        self.stores.iter().map(|s| s.promoted.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PromotionFailure> {
        self.stores.iter().flat_map(|s| s.failures.iter())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }

    /// `Err` listing every entry still in draft status, if any failed.
    pub fn into_result(self) -> Result<Self, PartialPromotionError> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(PartialPromotionError {
            parent_id: self.parent_id.clone(),
            promoted: self.promoted_count(),
            failures: self.failures().cloned().collect(),
        })
    }
}

/// Drives promotion over a fixed set of stores.
pub struct PromotionSequencer<'a> {
    stores: Vec<&'a dyn Promotable>,
}

impl<'a> PromotionSequencer<'a> {
    pub fn new(stores: Vec<&'a dyn Promotable>) -> Self {
        Self { stores }
    }

    /// Run the single promotion pass authorized by a commit.
    ///
    /// Stores bound to a session generation other than the ticket's are
    /// skipped; they were reset after the commit.
    pub async fn run(
        &self,
        ticket: PromotionTicket,
        progress_fn: Option<&PromotionEventFn>,
    ) -> PromotionReport {
        let generation = ticket.generation();
        let mut eligible = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            match store.session_generation() {
                Ok(g) if g == generation => eligible.push(*store),
                Ok(g) => tracing::warn!(
                    kind = store.kind().as_str(),
                    ticket_generation = generation,
                    session_generation = g,
                    "Store belongs to another session, skipping promotion"
                ),
                Err(e) => tracing::warn!(
                    kind = store.kind().as_str(),
                    error = %e,
                    "Cannot read store session, skipping promotion"
                ),
            }
        }
        drain(ticket.parent_id(), &eligible, progress_fn).await
    }

    /// Re-run promotion for entries still in draft status (manual retry).
    ///
    /// The parent id is taken from the session; a draft parent is rejected.
    pub async fn retry(
        &self,
        session: &DraftSession,
        progress_fn: Option<&PromotionEventFn>,
    ) -> Result<PromotionReport, DraftError> {
        let parent_id = match session.effective_parent()? {
            ParentRef::Draft => return Err(DraftError::ParentNotCommitted),
            ParentRef::Committed(parent_id) => parent_id,
        };
        Ok(drain(&parent_id, &self.stores, progress_fn).await)
    }
}

async fn drain(
    parent_id: &RemoteId,
    stores: &[&dyn Promotable],
    progress_fn: Option<&PromotionEventFn>,
) -> PromotionReport {
    let start = Instant::now();

    if let Some(progress) = progress_fn {
        progress(PromotionEvent::Started {
            parent_id: parent_id.clone(),
            stores: stores.len(),
        });
    }

    let mut results = Vec::with_capacity(stores.len());
    for store in stores {
        results.push(store.promote_drafts(parent_id, progress_fn).await);
    }

    let report = PromotionReport {
        parent_id: parent_id.clone(),
        stores: results,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if report.is_complete() {
        tracing::info!(
            parent_id = %parent_id,
            promoted = report.promoted_count(),
            "All staged entries promoted"
        );
    } else {
        tracing::warn!(
            parent_id = %parent_id,
            promoted = report.promoted_count(),
            failed = report.failed_count(),
            "Promotion finished with failures"
        );
    }

    if let Some(progress) = progress_fn {
        progress(PromotionEvent::Completed {
            promoted: report.promoted_count(),
            failed: report.failed_count(),
            duration_ms: report.duration_ms,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::draft::mock::MockRemote;
    use crate::draft::remote::ChildApi;
    use crate::draft::session::DraftSession;
    use crate::draft::staging::StagingStore;
    use crate::models::{
        ChildPayload, ClinicalStudyPayload, EntryStatus, PrescriptionPayload, StudyType,
        VitalSignPayload, VitalType,
    };

    struct Stores {
        session: DraftSession,
        vitals: StagingStore<VitalSignPayload>,
        prescriptions: StagingStore<PrescriptionPayload>,
        studies: StagingStore<ClinicalStudyPayload>,
    }

    impl Stores {
        fn all(&self) -> Vec<&dyn Promotable> {
            vec![
                &self.vitals as &dyn Promotable,
                &self.prescriptions as &dyn Promotable,
                &self.studies as &dyn Promotable,
            ]
        }
    }

    fn stores(mock: &Arc<MockRemote>) -> Stores {
        let session = DraftSession::new();
        Stores {
            vitals: StagingStore::new(
                session.clone(),
                mock.clone() as Arc<dyn ChildApi<VitalSignPayload>>,
            ),
            prescriptions: StagingStore::new(
                session.clone(),
                mock.clone() as Arc<dyn ChildApi<PrescriptionPayload>>,
            ),
            studies: StagingStore::new(
                session.clone(),
                mock.clone() as Arc<dyn ChildApi<ClinicalStudyPayload>>,
            ),
            session,
        }
    }

    fn hr(value: &str) -> VitalSignPayload {
        VitalSignPayload::new(VitalType::HeartRate, value)
    }

    #[tokio::test]
    async fn promotion_preserves_payloads() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        let payloads = vec![hr("72"), hr("80"), hr("91")];
        for p in &payloads {
            s.vitals.add_draft(p.clone()).unwrap();
        }
        let rx = PrescriptionPayload::new("Amoxicillin", "500 mg", "tid");
        s.prescriptions.add_draft(rx.clone()).unwrap();

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        let report = PromotionSequencer::new(s.all())
            .run(ticket, None)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.promoted_count(), 4);
        let committed: Vec<VitalSignPayload> = s
            .vitals
            .list_all()
            .unwrap()
            .into_iter()
            .map(|e| {
                assert_eq!(e.status(), EntryStatus::Committed);
                e.payload().clone()
            })
            .collect();
        assert_eq!(committed, payloads);
        assert_eq!(s.prescriptions.list_all().unwrap()[0].payload(), &rx);
    }

    #[tokio::test]
    async fn single_vital_sign_scenario() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        let payload = VitalSignPayload::new(VitalType::BloodPressure, "120/80");
        s.vitals.add_draft(payload.clone()).unwrap();

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        PromotionSequencer::new(vec![&s.vitals as &dyn Promotable])
            .run(ticket, None)
            .await;

        let all = s.vitals.list_all().unwrap();
        assert_eq!(all.len(), 1);
        let entry = &all[0];
        assert_eq!(entry.status(), EntryStatus::Committed);
        assert_eq!(entry.payload(), &payload);
        assert_eq!(entry.parent_ref().committed_id(), Some(&RemoteId::from(42)));

        let created = mock.created();
        assert_eq!(created.len(), 1);
        assert_eq!(entry.remote_id(), Some(&created[0].remote_id));
        assert_eq!(created[0].parent_id, RemoteId::from(42));
    }

    #[tokio::test]
    async fn middle_failure_is_reported_and_others_commit() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        let a = s.vitals.add_draft(hr("70")).unwrap();
        let b = s.vitals.add_draft(hr("75")).unwrap();
        let c = s.vitals.add_draft(hr("78")).unwrap();
        mock.fail_create_for(&hr("75").label());

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        let report = PromotionSequencer::new(vec![&s.vitals as &dyn Promotable])
            .run(ticket, None)
            .await;

        let all = s.vitals.list_all().unwrap();
        assert_eq!(
            all.iter().map(|e| e.local_id()).collect::<Vec<_>>(),
            vec![a.local_id(), b.local_id(), c.local_id()]
        );
        assert_eq!(all[0].status(), EntryStatus::Committed);
        assert_eq!(all[1].status(), EntryStatus::Draft);
        assert_eq!(all[2].status(), EntryStatus::Committed);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.failed_ids(), vec![b.local_id()]);
        assert_eq!(err.promoted, 2);
    }

    #[tokio::test]
    async fn entries_are_created_in_insertion_order() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        for v in ["60", "61", "62", "63"] {
            s.vitals.add_draft(hr(v)).unwrap();
        }

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        PromotionSequencer::new(vec![&s.vitals as &dyn Promotable])
            .run(ticket, None)
            .await;

        let order: Vec<String> = mock
            .created()
            .into_iter()
            .map(|c| c.payload["value"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(order, vec!["60", "61", "62", "63"]);
    }

    #[tokio::test]
    async fn retry_promotes_only_remaining_drafts() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        s.studies
            .add_draft(ClinicalStudyPayload::new("Lipid panel", StudyType::Laboratory))
            .unwrap();
        let chest = ClinicalStudyPayload::new("Chest X-ray", StudyType::Imaging);
        s.studies.add_draft(chest.clone()).unwrap();
        mock.fail_create_for(&chest.label());

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        let sequencer = PromotionSequencer::new(vec![&s.studies as &dyn Promotable]);
        let first = sequencer.run(ticket, None).await;
        assert_eq!(first.failed_count(), 1);

        mock.clear_failures();
        let second = sequencer.retry(&s.session, None).await.unwrap();

        assert!(second.is_complete());
        assert_eq!(second.promoted_count(), 1);
        assert_eq!(mock.created().len(), 2);
    }

    #[tokio::test]
    async fn progress_events_bracket_the_pass() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        s.vitals.add_draft(hr("70")).unwrap();
        s.vitals.add_draft(hr("99")).unwrap();
        mock.fail_create_for(&hr("99").label());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = move |event: PromotionEvent| sink.lock().unwrap().push(event);

        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        PromotionSequencer::new(vec![&s.vitals as &dyn Promotable])
            .run(ticket, Some(&progress as &PromotionEventFn))
            .await;

        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(PromotionEvent::Started { stores: 1, .. })));
        assert!(matches!(
            events[1],
            PromotionEvent::EntryPromoted { kind: ChildKind::VitalSign, .. }
        ));
        assert!(matches!(events[2], PromotionEvent::EntryFailed { .. }));
        assert!(matches!(
            events.last(),
            Some(PromotionEvent::Completed { promoted: 1, failed: 1, .. })
        ));
    }

    #[tokio::test]
    async fn stores_from_a_reset_session_are_skipped() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        s.vitals.add_draft(hr("70")).unwrap();
        let ticket = s.session.commit_parent(RemoteId::from(42)).unwrap();
        s.session.reset().unwrap();

        let report = PromotionSequencer::new(vec![&s.vitals as &dyn Promotable])
            .run(ticket, None)
            .await;

        assert_eq!(report.promoted_count(), 0);
        assert!(mock.created().is_empty());
    }

    #[tokio::test]
    async fn retry_while_parent_is_draft_is_rejected() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        let entry = s.vitals.add_draft(hr("70")).unwrap();

        let err = PromotionSequencer::new(s.all())
            .retry(&s.session, None)
            .await
            .unwrap_err();

        assert_eq!(err, DraftError::ParentNotCommitted);
        let kept = s.vitals.get(entry.local_id()).unwrap().unwrap();
        assert_eq!(kept.status(), EntryStatus::Draft);
        assert_eq!(kept.parent_ref(), &ParentRef::Draft);
        assert!(mock.created().is_empty());
    }

    #[tokio::test]
    async fn promote_drafts_ignores_a_parent_other_than_the_committed_one() {
        let mock = Arc::new(MockRemote::new());
        let s = stores(&mock);
        s.session.start().unwrap();
        s.vitals.add_draft(hr("70")).unwrap();

        let outcome = s.vitals.promote_drafts(&RemoteId::from(999), None).await;
        assert!(outcome.promoted.is_empty());

        s.session.commit_parent(RemoteId::from(42)).unwrap();
        let outcome = s.vitals.promote_drafts(&RemoteId::from(999), None).await;
        assert!(outcome.promoted.is_empty());
        assert!(mock.created().is_empty());
        assert_eq!(s.vitals.drafts().unwrap().len(), 1);
    }
}
