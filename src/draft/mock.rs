//! In-memory remote API used by the draft tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::RemoteError;
use super::ids::RemoteId;
use super::remote::{CatalogApi, ChildApi, ParentApi};
use crate::models::{
    CatalogEntry, CatalogFilters, CatalogKind, ChildKind, ChildPayload, ConsultationPayload,
};

/// A child record the mock accepted.
#[derive(Debug, Clone)]
pub struct CreatedChild {
    pub kind: ChildKind,
    pub parent_id: RemoteId,
    pub remote_id: RemoteId,
    pub payload: serde_json::Value,
}

#[derive(Default)]
struct Failures {
    parent: Option<RemoteError>,
    create_labels: HashSet<String>,
    update: Option<RemoteError>,
    delete: Option<RemoteError>,
    search: Option<RemoteError>,
}

pub struct MockRemote {
    next_parent_id: AtomicU64,
    next_child_id: AtomicU64,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<CreatedChild>>,
    parents: Mutex<Vec<ConsultationPayload>>,
    catalog: Mutex<Vec<CatalogEntry>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    parent_delay: Mutex<Option<Duration>>,
    delete_delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            next_parent_id: AtomicU64::new(42),
            next_child_id: AtomicU64::new(1000),
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            parents: Mutex::new(Vec::new()),
            catalog: Mutex::new(Vec::new()),
            search_delays: Mutex::new(HashMap::new()),
            parent_delay: Mutex::new(None),
            delete_delay: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_catalog(entries: Vec<CatalogEntry>) -> Self {
        let mock = Self::new();
        *mock.catalog.lock().unwrap() = entries;
        mock
    }

    // ── Failure injection ───────────────────────────────────

    pub fn fail_parent(&self, error: RemoteError) {
        self.failures.lock().unwrap().parent = Some(error);
    }

    /// Fail `create_child` for payloads whose label matches.
    pub fn fail_create_for(&self, label: &str) {
        self.failures.lock().unwrap().create_labels.insert(label.to_string());
    }

    pub fn fail_updates(&self, error: RemoteError) {
        self.failures.lock().unwrap().update = Some(error);
    }

    pub fn fail_deletes(&self, error: RemoteError) {
        self.failures.lock().unwrap().delete = Some(error);
    }

    pub fn fail_search(&self, error: RemoteError) {
        self.failures.lock().unwrap().search = Some(error);
    }

    pub fn clear_failures(&self) {
        *self.failures.lock().unwrap() = Failures::default();
    }

    /// Delay the search response for one query.
    pub fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
    }

    /// Delay every consultation create/update.
    pub fn delay_parent(&self, delay: Duration) {
        *self.parent_delay.lock().unwrap() = Some(delay);
    }

    /// Delay every child delete.
    pub fn delay_deletes(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = Some(delay);
    }

    async fn pause(slot: &Mutex<Option<Duration>>) {
        let delay = *slot.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    // ── Inspection ──────────────────────────────────────────

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreatedChild> {
        self.created.lock().unwrap().clone()
    }

    pub fn parents(&self) -> Vec<ConsultationPayload> {
        self.parents.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ParentApi for MockRemote {
    async fn create_parent(&self, payload: &ConsultationPayload) -> Result<RemoteId, RemoteError> {
        self.record(format!("create consultation for {}", payload.form.patient_id));
        Self::pause(&self.parent_delay).await;
        if let Some(err) = self.failures.lock().unwrap().parent.clone() {
            return Err(err);
        }
        self.parents.lock().unwrap().push(payload.clone());
        Ok(RemoteId::from(self.next_parent_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn update_parent(
        &self,
        parent_id: &RemoteId,
        payload: &ConsultationPayload,
    ) -> Result<(), RemoteError> {
        self.record(format!("update consultation {parent_id}"));
        Self::pause(&self.parent_delay).await;
        if let Some(err) = self.failures.lock().unwrap().parent.clone() {
            return Err(err);
        }
        self.parents.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[async_trait]
impl<P: ChildPayload> ChildApi<P> for MockRemote {
    async fn create_child(
        &self,
        parent_id: &RemoteId,
        payload: &P,
    ) -> Result<RemoteId, RemoteError> {
        let label = payload.label();
        self.record(format!("create {} {label} under {parent_id}", P::KIND));
        if self.failures.lock().unwrap().create_labels.contains(&label) {
            return Err(RemoteError::Transport(format!("create {label} refused")));
        }
        let remote_id = RemoteId::from(self.next_child_id.fetch_add(1, Ordering::SeqCst));
        self.created.lock().unwrap().push(CreatedChild {
            kind: P::KIND,
            parent_id: parent_id.clone(),
            remote_id: remote_id.clone(),
            payload: serde_json::to_value(payload).unwrap_or_default(),
        });
        Ok(remote_id)
    }

    async fn update_child(&self, remote_id: &RemoteId, _payload: &P) -> Result<(), RemoteError> {
        self.record(format!("update {} {remote_id}", P::KIND));
        match self.failures.lock().unwrap().update.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete_child(&self, remote_id: &RemoteId) -> Result<(), RemoteError> {
        self.record(format!("delete {} {remote_id}", P::KIND));
        Self::pause(&self.delete_delay).await;
        match self.failures.lock().unwrap().delete.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogApi for MockRemote {
    async fn list_catalog(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("list {kind}"));
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    async fn search_catalog(
        &self,
        kind: CatalogKind,
        query: &str,
        _filters: &CatalogFilters,
    ) -> Result<Vec<CatalogEntry>, RemoteError> {
        self.record(format!("search {kind} {query}"));
        let delay = self.search_delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().search.clone() {
            return Err(err);
        }
        let needle = query.to_lowercase();
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind && e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_catalog_entry(
        &self,
        kind: CatalogKind,
        name: &str,
    ) -> Result<CatalogEntry, RemoteError> {
        self.record(format!("create catalog {kind} {name}"));
        let mut catalog = self.catalog.lock().unwrap();
        if name.trim().is_empty() {
            return Err(RemoteError::Validation("Name is required".into()));
        }
        if catalog
            .iter()
            .any(|e| e.kind == kind && e.name.eq_ignore_ascii_case(name.trim()))
        {
            return Err(RemoteError::Validation(format!("{name} already exists")));
        }
        let entry = CatalogEntry::new(kind, "", name.trim());
        catalog.push(entry.clone());
        Ok(entry)
    }
}
