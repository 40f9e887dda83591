//! Domain types for a consultation and the records attached to it.

pub mod catalog;
pub mod clinical_study;
pub mod consultation;
pub mod diagnosis;
pub mod enums;
pub mod prescription;
pub mod vital_sign;

use std::fmt::Debug;

use serde::Serialize;

pub use catalog::{CatalogEntry, CatalogFilters};
pub use clinical_study::ClinicalStudyPayload;
pub use consultation::{ConsultationForm, ConsultationPayload};
pub use diagnosis::DiagnosisSelection;
pub use enums::*;
pub use prescription::PrescriptionPayload;
pub use vital_sign::{VitalSignPayload, VitalType};

/// Payload of a child resource that can be staged under a consultation.
pub trait ChildPayload: Clone + Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Which child collection this payload belongs to.
    const KIND: ChildKind;

    /// Short human-readable summary, used in logs and failure reports.
    fn label(&self) -> String;
}

/// An attachment that can be picked from a catalog into a selection set.
pub trait Selectable: Clone + Debug + Send + Sync + 'static {
    /// Catalog that backs this attachment.
    const CATALOG: CatalogKind;

    /// Catalog key; empty for ad-hoc entries.
    fn code(&self) -> &str;

    fn name(&self) -> &str;

    fn from_catalog(entry: &CatalogEntry, source: SelectionSource) -> Self;
}
