//! Teampick catalog API façade.
//!
//! Defines the read-only catalog lookup the picker depends on, plus an
//! in-process implementation over a loaded entity set and a mock for tests.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use teampick_core::Entity;
use teampick_filter::EntityFilterQuery;
use tracing::{debug, info};

/// Lookup request: `None` filter lists everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntitiesRequest {
    pub filter: Option<EntityFilterQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EntitiesResponse {
    pub items: Vec<Entity>,
}

/// API errors suitable for transport over RPC later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CatalogError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read-only catalog surface consumed by the picker.
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    /// List entities matching the request's filter.
    async fn get_entities(&self, request: EntitiesRequest) -> CatalogResult<EntitiesResponse>;
}

// ----------------- In-process implementation -----------------

/// Serves lookups from an in-memory entity set. The set can be swapped
/// while lookups are in flight.
pub struct InProcCatalog {
    entities: ArcSwap<Vec<Entity>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityFile {
    List(Vec<Entity>),
    Items { items: Vec<Entity> },
}

impl InProcCatalog {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities: ArcSwap::from_pointee(entities) }
    }

    /// Load a JSON or YAML file holding a list of entities or `{ items: [...] }`.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path.extension().map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);
        let entities = Self::parse_entities(&text, is_json)?;
        info!(path = %path.display(), entities = entities.len(), "catalog: loaded entity file");
        Ok(Self::new(entities))
    }

    pub fn parse_entities(text: &str, json: bool) -> anyhow::Result<Vec<Entity>> {
        let file: EntityFile = if json { serde_json::from_str(text)? } else { serde_yaml::from_str(text)? };
        Ok(match file {
            EntityFile::List(items) => items,
            EntityFile::Items { items } => items,
        })
    }

    pub fn replace(&self, entities: Vec<Entity>) {
        debug!(entities = entities.len(), "catalog: entity set replaced");
        self.entities.store(Arc::new(entities));
    }

    pub fn len(&self) -> usize { self.entities.load().len() }
    pub fn is_empty(&self) -> bool { self.entities.load().is_empty() }
}

#[async_trait::async_trait]
impl CatalogApi for InProcCatalog {
    async fn get_entities(&self, request: EntitiesRequest) -> CatalogResult<EntitiesResponse> {
        let t0 = Instant::now();
        let all = self.entities.load_full();
        let mut items: Vec<Entity> = match &request.filter {
            Some(f) => all.iter().filter(|e| f.matches(e)).cloned().collect(),
            None => all.as_ref().clone(),
        };
        items.sort_by(|a, b| {
            a.kind
                .to_lowercase()
                .cmp(&b.kind.to_lowercase())
                .then_with(|| a.namespace().cmp(b.namespace()))
                .then_with(|| a.name().cmp(b.name()))
        });
        metrics::counter!("catalog_queries_total", 1u64);
        metrics::histogram!("catalog_query_results", items.len() as f64);
        info!(total = all.len(), matched = items.len(), took_ms = %t0.elapsed().as_millis(), "catalog: get_entities ok");
        Ok(EntitiesResponse { items })
    }
}

// ----------------- Mock implementation -----------------

/// Simple in-memory mock implementation for tests.
#[derive(Default)]
pub struct MockApi {
    pub items: Vec<Entity>,
    pub error: Option<CatalogError>,
    /// Artificial latency before answering.
    pub delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<EntitiesRequest>>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn with_items(items: Vec<Entity>) -> Self { Self { items, ..Default::default() } }

    pub fn failing(error: CatalogError) -> Self { Self { error: Some(error), ..Default::default() } }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn last_request(&self) -> Option<EntitiesRequest> {
        self.last_request.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait::async_trait]
impl CatalogApi for MockApi {
    async fn get_entities(&self, request: EntitiesRequest) -> CatalogResult<EntitiesResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut g) = self.last_request.lock() { *g = Some(request); }
        if let Some(d) = self.delay { tokio::time::sleep(d).await; }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(EntitiesResponse { items: self.items.clone() }),
        }
    }
}

// ----------------- Task primitives -----------------

/// Cancellation handle that aborts the underlying task. Dropping it aborts too.
pub struct CancelHandle { task: Option<tokio::task::JoinHandle<()>> }

impl CancelHandle {
    pub fn new(task: tokio::task::JoinHandle<()>) -> Self { Self { task: Some(task) } }

    pub fn cancel(mut self) { if let Some(h) = self.task.take() { h.abort(); } }

    pub fn is_finished(&self) -> bool { self.task.as_ref().map(|h| h.is_finished()).unwrap_or(true) }
}

impl Drop for CancelHandle {
    fn drop(&mut self) { if let Some(h) = self.task.take() { h.abort(); } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_items_and_json_list() {
        let yaml = "items:\n  - kind: Group\n    metadata:\n      name: ops\n";
        let v = InProcCatalog::parse_entities(yaml, false).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].name(), "ops");

        let json = r#"[{"kind":"User","metadata":{"name":"jdoe","namespace":"people"}}]"#;
        let v = InProcCatalog::parse_entities(json, true).unwrap();
        assert_eq!(v[0].namespace(), "people");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(InProcCatalog::parse_entities("{ nope", true).is_err());
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let api = MockApi::with_items(vec![Entity::new("Group", None, "ops")]);
        let resp = api.get_entities(EntitiesRequest::default()).await.unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(api.calls(), 1);
        assert_eq!(api.last_request(), Some(EntitiesRequest::default()));
    }

    #[tokio::test]
    async fn mock_returns_configured_error() {
        let api = MockApi::failing(CatalogError::Unavailable("down".into()));
        let err = api.get_entities(EntitiesRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "unavailable: down");
    }
}
