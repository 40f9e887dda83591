//! Trait definitions for the remote resource API.
//!
//! Three traits define the boundary with the backend:
//! - ParentApi: create/update the consultation itself
//! - ChildApi: create/update/delete one kind of child record under it
//! - CatalogApi: list, search and extend the shared reference catalogs
//!
//! Transport and encoding live behind these traits and are not part of
//! this crate.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::RemoteError;
use super::ids::RemoteId;
use crate::models::{
    CatalogEntry, CatalogFilters, CatalogKind, ChildPayload, ClinicalStudyPayload,
    ConsultationPayload, PrescriptionPayload, VitalSignPayload,
};

#[async_trait]
pub trait ParentApi: Send + Sync {
    /// Create the consultation and return its backend id.
    async fn create_parent(&self, payload: &ConsultationPayload) -> Result<RemoteId, RemoteError>;

    /// Save changes to an already persisted consultation (edit mode).
    async fn update_parent(
        &self,
        parent_id: &RemoteId,
        payload: &ConsultationPayload,
    ) -> Result<(), RemoteError>;
}

/// Remote operations for one child resource kind, selected by `P::KIND`.
#[async_trait]
pub trait ChildApi<P: ChildPayload>: Send + Sync {
    async fn create_child(
        &self,
        parent_id: &RemoteId,
        payload: &P,
    ) -> Result<RemoteId, RemoteError>;

    async fn update_child(&self, remote_id: &RemoteId, payload: &P) -> Result<(), RemoteError>;

    async fn delete_child(&self, remote_id: &RemoteId) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Full catalog listing, fetched once per dialog.
    async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, RemoteError>;

    async fn search_catalog(
        &self,
        kind: CatalogKind,
        query: &str,
        filters: &CatalogFilters,
    ) -> Result<Vec<CatalogEntry>, RemoteError>;

    /// Add a new catalog row. Fails with `Validation` on empty or duplicate names.
    async fn create_catalog_entry(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> Result<CatalogEntry, RemoteError>;
}

/// Every collaborator a consultation dialog talks to.
#[derive(Clone)]
pub struct RemoteApis {
    pub parent: Arc<dyn ParentApi>,
    pub vital_signs: Arc<dyn ChildApi<VitalSignPayload>>,
    pub prescriptions: Arc<dyn ChildApi<PrescriptionPayload>>,
    pub clinical_studies: Arc<dyn ChildApi<ClinicalStudyPayload>>,
    pub catalog: Arc<dyn CatalogApi>,
}

impl RemoteApis {
    /// Wire all collaborators to one backend client.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ParentApi
            + ChildApi<VitalSignPayload>
            + ChildApi<PrescriptionPayload>
            + ChildApi<ClinicalStudyPayload>
            + CatalogApi
            + 'static,
    {
        Self {
            parent: backend.clone(),
            vital_signs: backend.clone(),
            prescriptions: backend.clone(),
            clinical_studies: backend.clone(),
            catalog: backend,
        }
    }
}
