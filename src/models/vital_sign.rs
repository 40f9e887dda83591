use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::ChildKind;
use super::ChildPayload;

/// Type of vital sign measurement taken during a consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalType {
    Temperature,
    BloodPressure,
    Weight,
    Height,
    HeartRate,
    RespiratoryRate,
    BloodGlucose,
    OxygenSaturation,
}

impl VitalType {
    pub fn as_str(self) -> &'static str {
        match self {
            VitalType::Temperature => "temperature",
            VitalType::BloodPressure => "blood_pressure",
            VitalType::Weight => "weight",
            VitalType::Height => "height",
            VitalType::HeartRate => "heart_rate",
            VitalType::RespiratoryRate => "respiratory_rate",
            VitalType::BloodGlucose => "blood_glucose",
            VitalType::OxygenSaturation => "oxygen_saturation",
        }
    }

    /// Default unit for this vital type.
    pub fn default_unit(self) -> &'static str {
        match self {
            VitalType::Temperature => "°C",
            VitalType::BloodPressure => "mmHg",
            VitalType::Weight => "kg",
            VitalType::Height => "cm",
            VitalType::HeartRate => "bpm",
            VitalType::RespiratoryRate => "rpm",
            VitalType::BloodGlucose => "mg/dL",
            VitalType::OxygenSaturation => "%",
        }
    }
}

/// A vital sign as entered in the consultation dialog.
///
/// `value` is kept as entered ("120/80", "37.2") since the form does not
/// split compound readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSignPayload {
    pub vital_type: VitalType,
    pub value: String,
    pub unit: String,
    pub recorded_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

impl VitalSignPayload {
    /// Build a reading with the default unit for its type.
    pub fn new(vital_type: VitalType, value: impl Into<String>) -> Self {
        Self {
            vital_type,
            value: value.into(),
            unit: vital_type.default_unit().to_string(),
            recorded_at: None,
            notes: None,
        }
    }
}

impl ChildPayload for VitalSignPayload {
    const KIND: ChildKind = ChildKind::VitalSign;

    fn label(&self) -> String {
        format!("{} {} {}", self.vital_type.as_str(), self.value, self.unit)
    }
}
