use crate::generation::{CacheKey, Generation};
use tabula_core::{Result, Schema};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::debug;

/// Compiled schemas keyed by [`CacheKey`].
///
/// A key is compiled at most once; every context built under it shares the
/// same [`Schema`].
#[derive(Debug, Default)]
pub(crate) struct SchemaCache {
    entries: Mutex<HashMap<CacheKey, Arc<Schema>>>,
}

impl SchemaCache {
    #[cfg(test)]
    pub(crate) fn get(&self, key: &CacheKey) -> Option<Arc<Schema>> {
        self.lock().get(key).cloned()
    }

    /// Returns the schema cached under `key`, compiling it on a miss.
    pub(crate) fn get_or_compile(
        &self,
        key: CacheKey,
        compile: impl FnOnce() -> Result<Schema>,
    ) -> Result<Arc<Schema>> {
        let mut entries = self.lock();

        if let Some(schema) = entries.get(&key) {
            debug!(generation = %key.generation, "schema cache hit");
            return Ok(schema.clone());
        }

        let schema = Arc::new(compile()?);
        debug!(generation = %key.generation, "schema compiled");
        entries.insert(key, schema.clone());
        Ok(schema)
    }

    /// Caches `schema` under `key`. If the key is already cached, the cached
    /// schema is kept and returned.
    pub(crate) fn insert(&self, key: CacheKey, schema: Arc<Schema>) -> Arc<Schema> {
        self.lock().entry(key).or_insert(schema).clone()
    }

    /// Drops schemas of generations older than `current` that no context
    /// uses anymore.
    pub(crate) fn evict_superseded(&self, current: Generation) {
        let mut entries = self.lock();
        let before = entries.len();

        entries
            .retain(|key, schema| key.generation >= current || Arc::strong_count(schema) > 1);

        if entries.len() < before {
            debug!(
                evicted = before - entries.len(),
                %current,
                "evicted superseded schemas"
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<Schema>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
