use serde::{Deserialize, Serialize};

use super::enums::ChildKind;
use super::ChildPayload;

/// One prescribed medication line on a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionPayload {
    /// Catalog key of the medication, empty when typed free-hand.
    pub medication_code: String,
    pub medication_name: String,
    pub dose: String,
    pub frequency: String,
    pub duration_days: Option<u32>,
    pub instructions: Option<String>,
}

impl PrescriptionPayload {
    pub fn new(
        medication_name: impl Into<String>,
        dose: impl Into<String>,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            medication_code: String::new(),
            medication_name: medication_name.into(),
            dose: dose.into(),
            frequency: frequency.into(),
            duration_days: None,
            instructions: None,
        }
    }
}

impl ChildPayload for PrescriptionPayload {
    const KIND: ChildKind = ChildKind::Prescription;

    fn label(&self) -> String {
        format!("{} {} {}", self.medication_name, self.dose, self.frequency)
    }
}
