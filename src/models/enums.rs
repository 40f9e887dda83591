use serde::{Deserialize, Serialize};

/// Returned when a stored string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Child resources that hang off a consultation and are staged while it is a draft.
str_enum!(ChildKind {
    VitalSign => "vital_sign",
    Prescription => "prescription",
    ClinicalStudy => "clinical_study",
});

impl ChildKind {
    pub fn all() -> &'static [ChildKind] {
        &[Self::VitalSign, Self::Prescription, Self::ClinicalStudy]
    }
}

str_enum!(EntryStatus {
    Draft => "draft",
    Committed => "committed",
    Deleting => "deleting",
});

str_enum!(CatalogKind {
    Diagnosis => "diagnosis",
    VitalSignType => "vital_sign_type",
    Medication => "medication",
    ClinicalStudy => "clinical_study",
});

str_enum!(DiagnosisRole {
    Primary => "primary",
    Secondary => "secondary",
});

str_enum!(SelectionSource {
    Catalog => "catalog",
    UserCreated => "user_created",
});

str_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

str_enum!(StudyType {
    Laboratory => "laboratory",
    Imaging => "imaging",
    Other => "other",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn child_kind_round_trips_through_str() {
        for kind in ChildKind::all() {
            assert_eq!(ChildKind::from_str(kind.as_str()).unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_value_names_the_enum() {
        let err = EntryStatus::from_str("archived").unwrap_err();
        assert_eq!(err.field, "EntryStatus");
        assert_eq!(err.value, "archived");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&CatalogKind::VitalSignType).unwrap();
        assert_eq!(json, "\"vital_sign_type\"");
    }
}
