//! Deduplicating, cardinality-bounded selection of catalog attachments.
//!
//! Used for the primary and secondary diagnoses of a consultation.
//! Selections are never promoted on their own: they travel inside the
//! consultation payload.
//!
//! Duplicate policy:
//! - both entries carry a code → duplicate when the trimmed codes are equal
//! - otherwise → duplicate when the trimmed, case-folded names are equal
//!
//! So two catalog rows with different codes may share a name, but a
//! free-text entry cannot sit next to a catalog row of the same name.

use super::catalog::CatalogProvider;
use super::error::DraftError;
use super::ids::SelectionId;
use crate::models::{DiagnosisSelection, Selectable, SelectionSource};

pub type DiagnosisSet = SelectionSet<DiagnosisSelection>;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEntry<T> {
    pub id: SelectionId,
    pub item: T,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn is_duplicate<T: Selectable>(existing: &T, candidate: &T) -> bool {
    let existing_code = existing.code().trim();
    let candidate_code = candidate.code().trim();
    if !existing_code.is_empty() && !candidate_code.is_empty() {
        return existing_code == candidate_code;
    }
    normalize_name(existing.name()) == normalize_name(candidate.name())
}

/// Human-readable key for a rejected candidate.
fn dedup_key<T: Selectable>(item: &T) -> String {
    let code = item.code().trim();
    if code.is_empty() {
        item.name().trim().to_string()
    } else {
        code.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SelectionSet<T: Selectable> {
    label: &'static str,
    max: Option<usize>,
    entries: Vec<SelectionEntry<T>>,
}

impl<T: Selectable> SelectionSet<T> {
    /// `max = None` leaves the set unbounded.
    pub fn new(label: &'static str, max: Option<usize>) -> Self {
        Self {
            label,
            max,
            entries: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn entries(&self) -> &[SelectionEntry<T>] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.max.is_some_and(|max| self.entries.len() >= max)
    }

    pub fn contains(&self, candidate: &T) -> bool {
        self.items().any(|existing| is_duplicate(existing, candidate))
    }

    /// Append a selection. On rejection the set is unchanged.
    pub fn add(&mut self, item: T) -> Result<SelectionId, DraftError> {
        if item.code().trim().is_empty() && item.name().trim().is_empty() {
            return Err(DraftError::Validation(
                "selection needs a code or a name".into(),
            ));
        }
        if self.contains(&item) {
            tracing::debug!(
                set = self.label,
                key = %dedup_key(&item),
                "Duplicate selection rejected"
            );
            return Err(DraftError::Duplicate(dedup_key(&item)));
        }
        if let Some(max) = self.max.filter(|max| self.entries.len() >= *max) {
            tracing::debug!(set = self.label, max, "Selection limit reached");
            return Err(DraftError::CardinalityExceeded { max });
        }

        let id = SelectionId::new();
        self.entries.push(SelectionEntry { id, item });
        Ok(id)
    }

    /// Remove a selection; unknown ids are ignored.
    pub fn remove(&mut self, id: SelectionId) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos).item)
    }

    /// Replace the set with selections of an already persisted consultation.
    ///
    /// No duplicate or limit checks: the backend is the source of truth.
    pub fn load_existing(&mut self, items: Vec<T>) {
        self.entries = items
            .into_iter()
            .map(|item| SelectionEntry {
                id: SelectionId::new(),
                item,
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Create a catalog row for free text that matched nothing, then select it.
    pub async fn create_and_add(
        &mut self,
        catalog: &CatalogProvider,
        name: &str,
    ) -> Result<SelectionId, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::Validation("name cannot be empty".into()));
        }
        if self.items().any(|existing| normalize_name(existing.name()) == normalize_name(name)) {
            return Err(DraftError::Duplicate(name.to_string()));
        }
        if let Some(max) = self.max.filter(|_| self.is_full()) {
            return Err(DraftError::CardinalityExceeded { max });
        }

        let entry = catalog.create_entry(T::CATALOG, name).await?;
        self.add(T::from_catalog(&entry, SelectionSource::UserCreated))
    }
}

impl SelectionSet<DiagnosisSelection> {
    /// The single selected diagnosis, for sets bounded to one entry.
    pub fn first(&self) -> Option<&DiagnosisSelection> {
        self.entries.first().map(|e| &e.item)
    }

    pub fn to_vec(&self) -> Vec<DiagnosisSelection> {
        self.items().cloned().collect()
    }
}
