//! Shared entity cache
//!
//! Collections fetched from the API are cached per `(EntityType, Filter)`.
//! - A fresh entry is served without a request
//! - Callers asking for a key that is already being fetched share that fetch
//! - A successful mutation marks the mutated type and its dependents stale
//! - Nothing is updated optimistically: entries change only when a fetch lands
//!
//! Each entry carries a generation. Invalidating an entry that is mid-fetch
//! supersedes that fetch: its waiters still get the result, but it is not
//! stored, and the next `get` fetches again.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{ApiRequest, Transport};
use crate::error::ApiError;
use crate::models::{
    normalize_collection, normalize_record, Entity, EntityId, EntityType, LeadThread, RelatedTo,
    SyncMailResponse,
};

/// A normalized list response.
pub type Collection = Vec<Value>;

type FetchResult = Result<Arc<Collection>, ApiError>;

/// Query parameters narrowing a collection, kept sorted so equal filters
/// hash equally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Records attached to one company or person.
    pub fn related(related: &RelatedTo) -> Self {
        Self::new()
            .with("related_to_type", related.kind.as_str())
            .with("related_to_id", related.id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity_type: EntityType,
    pub filter: Filter,
}

impl CacheKey {
    pub fn new(entity_type: EntityType, filter: Filter) -> Self {
        Self {
            entity_type,
            filter,
        }
    }
}

enum Slot {
    Ready {
        data: Arc<Collection>,
        stale: bool,
    },
    Loading {
        generation: u64,
        rx: watch::Receiver<Option<FetchResult>>,
        /// Last stored data, served by `peek` while the fetch runs.
        previous: Option<Arc<Collection>>,
    },
}

enum SlotView {
    Hit(Arc<Collection>),
    Join(watch::Receiver<Option<FetchResult>>),
    Miss(Option<Arc<Collection>>),
}

/// A create, full-document update, or delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(Value),
    Update(EntityId, Value),
    Delete(EntityId),
}

impl Mutation {
    fn request(&self, entity_type: EntityType) -> ApiRequest {
        match self {
            Self::Create(body) => ApiRequest::post(&entity_type.collection_path(), Some(body.clone())),
            Self::Update(id, body) => {
                ApiRequest::put(entity_type.base_path(), body.clone()).segment(id.as_str())
            }
            Self::Delete(id) => ApiRequest::delete(entity_type.base_path()).segment(id.as_str()),
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(..) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// What the server sent back for a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// The normalized record, for create and update responses that carry one.
    pub record: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Network list requests issued.
    pub fetches: u64,
    /// `get` calls answered from a fresh entry.
    pub hits: u64,
}

struct Inner {
    transport: Arc<dyn Transport>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    generation: AtomicU64,
    fetches: AtomicU64,
    hits: AtomicU64,
}

/// Handle to the shared cache. Clones share state.
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<Inner>,
}

impl EntityCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                slots: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                fetches: AtomicU64::new(0),
                hits: AtomicU64::new(0),
            }),
        }
    }

    /// Cached collection for the key, fetching it when missing or stale.
    pub async fn get(
        &self,
        entity_type: EntityType,
        filter: &Filter,
    ) -> Result<Arc<Collection>, ApiError> {
        let key = CacheKey::new(entity_type, filter.clone());

        let rx = {
            let mut slots = self.inner.slots.lock();
            let view = match slots.get(&key) {
                Some(Slot::Ready { data, stale: false }) => SlotView::Hit(Arc::clone(data)),
                Some(Slot::Ready { data, stale: true }) => SlotView::Miss(Some(Arc::clone(data))),
                Some(Slot::Loading { rx, .. }) => SlotView::Join(rx.clone()),
                None => SlotView::Miss(None),
            };

            match view {
                SlotView::Hit(data) => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(entity = %entity_type, "cache hit");
                    return Ok(data);
                }
                SlotView::Join(rx) => {
                    tracing::debug!(entity = %entity_type, "joining in-flight fetch");
                    rx
                }
                SlotView::Miss(previous) => self.start_fetch(&mut slots, key, previous),
            }
        };

        wait_for(rx).await
    }

    /// Typed view of [`EntityCache::get`]. Records that fail to decode are
    /// skipped with a warning rather than failing the whole list.
    pub async fn list<T: Entity>(&self, filter: &Filter) -> Result<Vec<T>, ApiError> {
        let records = self.get(T::TYPE, filter).await?;
        Ok(records
            .iter()
            .filter_map(|record| match serde_json::from_value::<T>(record.clone()) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!(entity = %T::TYPE, id = ?record.get("id"), error = %e, "skipping undecodable record");
                    None
                }
            })
            .collect())
    }

    /// Last stored data for the key, even if stale. Never fetches.
    pub fn peek(&self, entity_type: EntityType, filter: &Filter) -> Option<Arc<Collection>> {
        let key = CacheKey::new(entity_type, filter.clone());
        match self.inner.slots.lock().get(&key)? {
            Slot::Ready { data, .. } => Some(Arc::clone(data)),
            Slot::Loading { previous, .. } => previous.clone(),
        }
    }

    pub fn invalidate(&self, entity_type: EntityType) {
        self.invalidate_many(&[entity_type]);
    }

    /// Mark every entry of these types stale, whatever its filter.
    pub fn invalidate_many(&self, types: &[EntityType]) {
        let mut marked = 0usize;
        self.inner.slots.lock().retain(|key, slot| {
            if !types.contains(&key.entity_type) {
                return true;
            }
            marked += 1;
            let data = match slot {
                Slot::Ready { data, .. } => Some(Arc::clone(data)),
                Slot::Loading { previous, .. } => previous.clone(),
            };
            match data {
                Some(data) => {
                    *slot = Slot::Ready { data, stale: true };
                    true
                }
                None => false,
            }
        });
        tracing::info!(types = ?types, entries = marked, "invalidated cache");
    }

    /// Send a mutation. On success the type's dependents are invalidated
    /// before returning; on failure the cache is left untouched.
    ///
    /// Identical concurrent submissions are not merged: each one reaches
    /// the server.
    pub async fn mutate(
        &self,
        entity_type: EntityType,
        mutation: Mutation,
    ) -> Result<MutationOutcome, ApiError> {
        let verb = mutation.verb();
        let response = match self
            .inner
            .transport
            .send(mutation.request(entity_type))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(entity = %entity_type, verb, error = %e, "mutation failed");
                return Err(e);
            }
        };

        self.invalidate_many(entity_type.dependents());
        tracing::info!(entity = %entity_type, verb, "mutation applied");

        let record = match response {
            Value::Object(_) => normalize_record(response).ok(),
            _ => None,
        };
        Ok(MutationOutcome { record })
    }

    /// Create or update a typed entity, depending on whether it has an id.
    pub async fn save<T: Entity>(&self, entity: &T) -> Result<MutationOutcome, ApiError> {
        entity.validate()?;
        let body = serde_json::to_value(entity)?;
        let mutation = match entity.id() {
            Some(id) => Mutation::Update(id.clone(), body),
            None => Mutation::Create(body),
        };
        self.mutate(T::TYPE, mutation).await
    }

    pub async fn delete(
        &self,
        entity_type: EntityType,
        id: &EntityId,
    ) -> Result<MutationOutcome, ApiError> {
        self.mutate(entity_type, Mutation::Delete(id.clone())).await
    }

    /// Ask the server to pull the lead's mail. Leads are refetched after.
    pub async fn sync_mail(&self, lead_id: &EntityId) -> Result<SyncMailResponse, ApiError> {
        let request = ApiRequest::post(EntityType::Lead.base_path(), None)
            .segment(lead_id.as_str())
            .segment("sync-mail");
        let response = self.inner.transport.send(request).await?;
        let response: SyncMailResponse = serde_json::from_value(response)?;
        self.invalidate(EntityType::Lead);
        Ok(response)
    }

    /// Mail threads of a lead. Not cached.
    pub async fn mail_threads(&self, lead_id: &EntityId) -> Result<Vec<LeadThread>, ApiError> {
        let request = ApiRequest::get(EntityType::Lead.base_path())
            .segment(lead_id.as_str())
            .segment("mail-threads");
        let response = self.inner.transport.send(request).await?;
        normalize_collection(response)?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(ApiError::from))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fetches: self.inner.fetches.load(Ordering::Relaxed),
            hits: self.inner.hits.load(Ordering::Relaxed),
        }
    }

    /// Register a loading slot and spawn its fetch. The fetch runs on its
    /// own task, so a caller that stops waiting cannot strand the slot.
    fn start_fetch(
        &self,
        slots: &mut HashMap<CacheKey, Slot>,
        key: CacheKey,
        previous: Option<Arc<Collection>>,
    ) -> watch::Receiver<Option<FetchResult>> {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = watch::channel(None);
        slots.insert(
            key.clone(),
            Slot::Loading {
                generation,
                rx: rx.clone(),
                previous,
            },
        );
        self.inner.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(entity = %key.entity_type, generation, "cache miss, fetching");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.fetch(&key).await;
            inner.complete(&key, generation, &result);
            // Every waiter may have given up already.
            let _ = tx.send(Some(result));
        });

        rx
    }
}

impl Inner {
    async fn fetch(&self, key: &CacheKey) -> FetchResult {
        let request =
            ApiRequest::get(&key.entity_type.collection_path()).with_filter(&key.filter);
        let response = self.transport.send(request).await?;
        Ok(Arc::new(normalize_collection(response)?))
    }

    /// Store a finished fetch unless it was superseded.
    fn complete(&self, key: &CacheKey, generation: u64, result: &FetchResult) {
        let mut slots = self.slots.lock();
        let current = matches!(
            slots.get(key),
            Some(Slot::Loading { generation: g, .. }) if *g == generation
        );
        if !current {
            tracing::debug!(entity = %key.entity_type, generation, "discarding superseded fetch");
            return;
        }

        let previous = match slots.remove(key) {
            Some(Slot::Loading { previous, .. }) => previous,
            _ => None,
        };
        match result {
            Ok(data) => {
                slots.insert(
                    key.clone(),
                    Slot::Ready {
                        data: Arc::clone(data),
                        stale: false,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(entity = %key.entity_type, error = %e, "fetch failed");
                // Keep showing the old rows; the next get retries.
                if let Some(data) = previous {
                    slots.insert(key.clone(), Slot::Ready { data, stale: true });
                }
            }
        }
    }
}

async fn wait_for(mut rx: watch::Receiver<Option<FetchResult>>) -> FetchResult {
    loop {
        {
            let current = rx.borrow_and_update();
            if let Some(result) = current.as_ref() {
                return result.clone();
            }
        }
        if rx.changed().await.is_err() {
            return Err(ApiError::network("fetch ended without a result"));
        }
    }
}
