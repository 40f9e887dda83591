use serde::{Deserialize, Serialize};

use super::catalog::CatalogEntry;
use super::enums::{CatalogKind, SelectionSource, Severity};
use super::Selectable;

/// A diagnosis attached to a consultation.
///
/// Descriptive metadata is copied from the catalog at selection time so the
/// attachment stays stable if the catalog row changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisSelection {
    /// ICD code; empty for ad-hoc entries.
    pub code: String,
    pub name: String,
    pub source: SelectionSource,
    pub category: Option<String>,
    pub specialty: Option<String>,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub chronic: bool,
}

impl DiagnosisSelection {
    /// Free-text diagnosis with no catalog backing.
    pub fn ad_hoc(name: impl Into<String>) -> Self {
        Self {
            code: String::new(),
            name: name.into(),
            source: SelectionSource::UserCreated,
            category: None,
            specialty: None,
            severity: None,
            chronic: false,
        }
    }

    pub fn is_catalog_backed(&self) -> bool {
        !self.code.trim().is_empty()
    }
}

impl Selectable for DiagnosisSelection {
    const CATALOG: CatalogKind = CatalogKind::Diagnosis;

    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_catalog(entry: &CatalogEntry, source: SelectionSource) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.name.clone(),
            source,
            category: entry.category.clone(),
            specialty: entry.specialty.clone(),
            severity: entry.severity,
            chronic: entry.chronic,
        }
    }
}
