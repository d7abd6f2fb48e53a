// In-memory keyed storage shared by every repository
//
// Each repository owns exactly one `tokio::sync::RwLock`; reads run
// concurrently, writes are exclusive. Nothing survives a restart.

use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("{0}")]
    Invalid(String),
}

impl From<StoreError> for crate::utils::ServiceError {
    fn from(error: StoreError) -> Self {
        use crate::utils::ServiceError;
        match error {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Duplicate(what) => ServiceError::Conflict(format!("{} already exists", what)),
            StoreError::Invalid(msg) => ServiceError::ValidationError(msg),
        }
    }
}

/// Rows keyed by a monotonically increasing id starting at 1.
/// Ids are never reused, even after deletes.
#[derive(Debug)]
pub struct Table<V> {
    next_id: i64,
    rows: BTreeMap<i64, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<V> Table<V> {
    /// Reserve the next id. The caller must insert under the same lock.
    pub fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocate an id, build the row from it and store it
    pub fn insert_with<F>(&mut self, build: F) -> &V
    where
        F: FnOnce(i64) -> V,
    {
        let id = self.allocate_id();
        self.rows.entry(id).or_insert(build(id))
    }

    pub fn get(&self, id: i64) -> Option<&V> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut V> {
        self.rows.get_mut(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<V> {
        self.rows.remove(&id)
    }

    /// Rows in id order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A value of type `S` behind one reader/writer lock
#[derive(Debug, Default)]
pub struct MemoryStore<S> {
    inner: RwLock<S>,
}

impl<S> MemoryStore<S> {
    pub fn new(state: S) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, S> {
        self.inner.write().await
    }
}
