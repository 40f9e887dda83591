//! Catalog provider with an explicit, per-dialog cache.
//!
//! Reference lists (diagnoses, vital-sign types, medications, studies) are
//! fetched once and kept here until `invalidate` is called. The provider
//! never updates or deletes catalog rows; `create_entry` is additive.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::DraftError;
use super::remote::CatalogApi;
use crate::models::{CatalogEntry, CatalogFilters, CatalogKind};

pub struct CatalogProvider {
    api: Arc<dyn CatalogApi>,
    /// Held across the list call so concurrent readers share one fetch.
    cache: tokio::sync::Mutex<HashMap<CatalogKind, Vec<CatalogEntry>>>,
}

impl CatalogProvider {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            cache: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Full listing for `kind`, fetched on first use.
    ///
    /// A failed fetch is not cached; the next call tries again.
    pub async fn entries(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, DraftError> {
        let mut cache = self.cache.lock().await;
        if let Some(entries) = cache.get(&kind) {
            return Ok(entries.clone());
        }
        let entries = self.api.list_catalog(kind).await?;
        tracing::debug!(kind = kind.as_str(), count = entries.len(), "Catalog loaded");
        cache.insert(kind, entries.clone());
        Ok(entries)
    }

    /// Best-effort search: a remote failure yields no results.
    pub async fn search(
        &self,
        kind: CatalogKind,
        query: &str,
        filters: &CatalogFilters,
    ) -> Vec<CatalogEntry> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        match self.api.search_catalog(kind, query, filters).await {
            Ok(mut found) => {
                if let Some(limit) = filters.limit {
                    found.truncate(limit);
                }
                found
            }
            Err(e) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    error = %e,
                    "Catalog search failed, showing no results"
                );
                Vec::new()
            }
        }
    }

    /// Add a catalog row for free text. Appended to the cached list if loaded.
    pub async fn create_entry(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> Result<CatalogEntry, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::Validation("catalog entry name cannot be empty".into()));
        }
        let entry = self.api.create_catalog_entry(kind, name).await?;
        tracing::info!(kind = kind.as_str(), name = %entry.name, "Catalog entry created");

        let mut cache = self.cache.lock().await;
        if let Some(entries) = cache.get_mut(&kind) {
            entries.push(entry.clone());
        }
        Ok(entry)
    }

    pub async fn is_cached(&self, kind: CatalogKind) -> bool {
        self.cache.lock().await.contains_key(&kind)
    }

    pub async fn invalidate(&self, kind: CatalogKind) {
        self.cache.lock().await.remove(&kind);
    }

    pub async fn invalidate_all(&self) {
        self.cache.lock().await.clear();
    }
}
