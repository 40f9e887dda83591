use serde::{Deserialize, Serialize};

use super::enums::{CatalogKind, Severity};

/// A row of a shared reference list (diagnoses, medications, vital types, studies).
///
/// Descriptive fields are optional because not every catalog carries them;
/// diagnosis rows typically fill all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: CatalogKind,
    /// Catalog key (ICD-10 code for diagnoses). May be empty for rows
    /// created from free text.
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub specialty: Option<String>,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub chronic: bool,
}

impl CatalogEntry {
    pub fn new(kind: CatalogKind, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            name: name.into(),
            category: None,
            specialty: None,
            severity: None,
            chronic: false,
        }
    }
}

/// Optional narrowing applied to a catalog search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilters {
    pub category: Option<String>,
    pub specialty: Option<String>,
    pub chronic_only: bool,
    pub limit: Option<usize>,
}
