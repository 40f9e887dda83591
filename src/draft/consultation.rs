//! One open consultation dialog: the draft session, the child stores staged
//! under it, and the diagnoses that travel inside the consultation payload.
//!
//! Lifecycle:
//! 1. `open()` (new) or `open_existing()` (edit)
//! 2. stage children and pick diagnoses
//! 3. `submit()` creates or updates the consultation, then promotes drafts
//! 4. `retry_failed_promotions()` for anything left in draft status
//! 5. `cancel()` when the dialog closes

use std::sync::Arc;

use super::catalog::CatalogProvider;
use super::error::DraftError;
use super::ids::{ParentRef, RemoteId, SelectionId};
use super::promotion::{Promotable, PromotionEventFn, PromotionReport, PromotionSequencer};
use super::remote::{ParentApi, RemoteApis};
use super::search::DebouncedSearch;
use super::selection::DiagnosisSet;
use super::session::DraftSession;
use super::staging::StagingStore;
use crate::config::DraftConfig;
use crate::models::{
    CatalogKind, ClinicalStudyPayload, ConsultationForm, ConsultationPayload, DiagnosisRole,
    DiagnosisSelection, PrescriptionPayload, VitalSignPayload,
};

/// A persisted consultation and its children, as loaded for editing.
#[derive(Debug, Clone)]
pub struct ExistingConsultation {
    pub parent_id: RemoteId,
    pub vital_signs: Vec<(RemoteId, VitalSignPayload)>,
    pub prescriptions: Vec<(RemoteId, PrescriptionPayload)>,
    pub clinical_studies: Vec<(RemoteId, ClinicalStudyPayload)>,
    pub primary_diagnosis: Option<DiagnosisSelection>,
    pub secondary_diagnoses: Vec<DiagnosisSelection>,
}

impl ExistingConsultation {
    pub fn new(parent_id: RemoteId) -> Self {
        Self {
            parent_id,
            vital_signs: Vec::new(),
            prescriptions: Vec::new(),
            clinical_studies: Vec::new(),
            primary_diagnosis: None,
            secondary_diagnoses: Vec::new(),
        }
    }
}

pub struct ConsultationDraft {
    config: DraftConfig,
    session: DraftSession,
    parent_api: Arc<dyn ParentApi>,
    catalog: Arc<CatalogProvider>,
    vital_signs: StagingStore<VitalSignPayload>,
    prescriptions: StagingStore<PrescriptionPayload>,
    clinical_studies: StagingStore<ClinicalStudyPayload>,
    primary: DiagnosisSet,
    secondary: DiagnosisSet,
    diagnosis_search: DebouncedSearch,
    /// Held for the whole of a submit or retry; a second caller is rejected.
    submitting: tokio::sync::Mutex<()>,
}

impl ConsultationDraft {
    pub fn new(apis: RemoteApis, config: DraftConfig) -> Self {
        let session = DraftSession::new();
        let catalog = Arc::new(CatalogProvider::new(apis.catalog));
        let diagnosis_search = DebouncedSearch::new(
            catalog.clone(),
            CatalogKind::Diagnosis,
            config.search_debounce(),
        );
        Self {
            vital_signs: StagingStore::new(session.clone(), apis.vital_signs),
            prescriptions: StagingStore::new(session.clone(), apis.prescriptions),
            clinical_studies: StagingStore::new(session.clone(), apis.clinical_studies),
            primary: DiagnosisSet::new("primary", Some(config.primary_diagnosis_limit)),
            secondary: DiagnosisSet::new("secondary", config.secondary_diagnosis_limit),
            parent_api: apis.parent,
            session,
            catalog,
            diagnosis_search,
            submitting: tokio::sync::Mutex::new(()),
            config,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Open the dialog on a new consultation.
    pub async fn open(&mut self) -> Result<u64, DraftError> {
        let generation = self.session.start()?;
        self.reset_local()?;
        self.catalog.invalidate_all().await;
        Ok(generation)
    }

    /// Open the dialog on a consultation that already exists.
    pub async fn open_existing(
        &mut self,
        existing: ExistingConsultation,
    ) -> Result<u64, DraftError> {
        let generation = self.session.open_existing(existing.parent_id)?;
        self.reset_local()?;
        self.catalog.invalidate_all().await;

        self.vital_signs.load_committed(existing.vital_signs)?;
        self.prescriptions.load_committed(existing.prescriptions)?;
        self.clinical_studies.load_committed(existing.clinical_studies)?;
        self.primary
            .load_existing(existing.primary_diagnosis.into_iter().collect());
        self.secondary.load_existing(existing.secondary_diagnoses);
        Ok(generation)
    }

    /// Close the dialog. Staged drafts and selections are discarded.
    pub fn cancel(&mut self) -> Result<(), DraftError> {
        self.session.reset()?;
        self.reset_local()
    }

    fn reset_local(&mut self) -> Result<(), DraftError> {
        self.primary.clear();
        self.secondary.clear();
        self.diagnosis_search.cancel()
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn config(&self) -> &DraftConfig {
        &self.config
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<CatalogProvider> {
        &self.catalog
    }

    pub fn vital_signs(&self) -> &StagingStore<VitalSignPayload> {
        &self.vital_signs
    }

    pub fn prescriptions(&self) -> &StagingStore<PrescriptionPayload> {
        &self.prescriptions
    }

    pub fn clinical_studies(&self) -> &StagingStore<ClinicalStudyPayload> {
        &self.clinical_studies
    }

    pub fn diagnoses(&self, role: DiagnosisRole) -> &DiagnosisSet {
        match role {
            DiagnosisRole::Primary => &self.primary,
            DiagnosisRole::Secondary => &self.secondary,
        }
    }

    pub fn diagnoses_mut(&mut self, role: DiagnosisRole) -> &mut DiagnosisSet {
        match role {
            DiagnosisRole::Primary => &mut self.primary,
            DiagnosisRole::Secondary => &mut self.secondary,
        }
    }

    pub fn diagnosis_search(&self) -> &DebouncedSearch {
        &self.diagnosis_search
    }

    /// Add a catalog row for a diagnosis typed by the user and select it.
    pub async fn create_diagnosis(
        &mut self,
        role: DiagnosisRole,
        name: &str,
    ) -> Result<SelectionId, DraftError> {
        let catalog = self.catalog.clone();
        self.diagnoses_mut(role).create_and_add(&catalog, name).await
    }

    /// Drafts not yet created on the backend, across all stores.
    pub fn pending_drafts(&self) -> usize {
        [
            self.vital_signs.drafts().map(|d| d.len()),
            self.prescriptions.drafts().map(|d| d.len()),
            self.clinical_studies.drafts().map(|d| d.len()),
        ]
        .into_iter()
        .map(|count| count.unwrap_or(0))
        .sum()
    }

    pub fn payload(&self, form: ConsultationForm) -> ConsultationPayload {
        ConsultationPayload {
            form,
            primary_diagnosis: self.primary.first().cloned(),
            secondary_diagnoses: self.secondary.to_vec(),
        }
    }

    fn stores(&self) -> Vec<&dyn Promotable> {
        vec![
            &self.vital_signs as &dyn Promotable,
            &self.prescriptions as &dyn Promotable,
            &self.clinical_studies as &dyn Promotable,
        ]
    }

    // ── Submit ──────────────────────────────────────────────

    pub async fn submit(&self, form: ConsultationForm) -> Result<PromotionReport, DraftError> {
        self.submit_with_progress(form, None).await
    }

    /// Save the consultation, then promote every staged draft under it.
    ///
    /// If the consultation itself cannot be saved nothing changes and the
    /// server's message is returned. Child failures do not fail the submit:
    /// they are listed in the report and the entries stay drafts.
    ///
    /// Fails with `SubmitInProgress` while another submit or retry runs.
    pub async fn submit_with_progress(
        &self,
        form: ConsultationForm,
        progress: Option<&PromotionEventFn>,
    ) -> Result<PromotionReport, DraftError> {
        let _submit = self.begin_submit()?;
        let payload = self.payload(form);

        match self.session.effective_parent()? {
            ParentRef::Draft => {
                let parent_id = match self.parent_api.create_parent(&payload).await {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::warn!(error = %e, "Consultation create failed, draft kept");
                        return Err(e.into());
                    }
                };
                let ticket = self.session.commit_parent(parent_id.clone()).map_err(|e| {
                    tracing::warn!(
                        parent_id = %parent_id,
                        error = %e,
                        "Consultation saved but the draft session is gone"
                    );
                    e
                })?;
                Ok(PromotionSequencer::new(self.stores()).run(ticket, progress).await)
            }
            ParentRef::Committed(parent_id) => {
                if let Err(e) = self.parent_api.update_parent(&parent_id, &payload).await {
                    tracing::warn!(
                        parent_id = %parent_id,
                        error = %e,
                        "Consultation update failed"
                    );
                    return Err(e.into());
                }
                PromotionSequencer::new(self.stores())
                    .retry(&self.session, progress)
                    .await
            }
        }
    }

    fn begin_submit(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, DraftError> {
        self.submitting.try_lock().map_err(|_| {
            tracing::debug!("Submit already in flight, ignoring");
            DraftError::SubmitInProgress
        })
    }

    /// Promote entries a previous pass left in draft status.
    pub async fn retry_failed_promotions(
        &self,
        progress: Option<&PromotionEventFn>,
    ) -> Result<PromotionReport, DraftError> {
        let _submit = self.begin_submit()?;
        PromotionSequencer::new(self.stores())
            .retry(&self.session, progress)
            .await
    }
}
