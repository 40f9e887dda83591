use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::diagnosis::DiagnosisSelection;

/// Fields the clinician fills in on the consultation form itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsultationForm {
    pub patient_id: String,
    pub doctor_id: Option<String>,
    pub office_id: Option<String>,
    pub consulted_at: Option<NaiveDateTime>,
    pub reason: String,
    pub findings: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

/// Body sent to the server when the consultation is created or updated.
///
/// Diagnoses travel inside the parent payload; they are never persisted as
/// separate child resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationPayload {
    #[serde(flatten)]
    pub form: ConsultationForm,
    pub primary_diagnosis: Option<DiagnosisSelection>,
    pub secondary_diagnoses: Vec<DiagnosisSelection>,
}
