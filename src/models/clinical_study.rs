use serde::{Deserialize, Serialize};

use super::enums::{ChildKind, StudyType};
use super::ChildPayload;

/// A laboratory or imaging study ordered during a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalStudyPayload {
    pub study_code: String,
    pub study_name: String,
    pub study_type: StudyType,
    pub indications: Option<String>,
    pub urgent: bool,
}

impl ClinicalStudyPayload {
    pub fn new(study_name: impl Into<String>, study_type: StudyType) -> Self {
        Self {
            study_code: String::new(),
            study_name: study_name.into(),
            study_type,
            indications: None,
            urgent: false,
        }
    }
}

impl ChildPayload for ClinicalStudyPayload {
    const KIND: ChildKind = ChildKind::ClinicalStudy;

    fn label(&self) -> String {
        if self.urgent {
            format!("{} ({}, urgent)", self.study_name, self.study_type)
        } else {
            format!("{} ({})", self.study_name, self.study_type)
        }
    }
}
