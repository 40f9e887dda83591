use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "consult-draft";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire form of a draft parent reference. Never issued by the backend.
pub const DRAFT_PARENT_SENTINEL: &str = "__draft__";

/// Quiescence window applied to catalog search keystrokes.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// A consultation carries exactly one primary diagnosis.
pub const DEFAULT_PRIMARY_DIAGNOSIS_LIMIT: usize = 1;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "consult_draft_lib=info"
}

/// Tunables for one consultation dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    pub search_debounce_ms: u64,
    pub primary_diagnosis_limit: usize,
    /// `None` leaves secondary diagnoses unbounded.
    pub secondary_diagnosis_limit: Option<usize>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            primary_diagnosis_limit: DEFAULT_PRIMARY_DIAGNOSIS_LIMIT,
            secondary_diagnosis_limit: None,
        }
    }
}

impl DraftConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
