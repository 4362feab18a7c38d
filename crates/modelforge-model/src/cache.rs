//! Process-wide model cache, injected rather than ambient
//!
//! The cache holds `Weak` references keyed by the serialized
//! [`LoadSpecification`], so it never keeps a model alive on its own:
//! once every caller drops its `Arc`, the entry goes dead and the next
//! [`ModelCache::compact`] sweeps it. Callers own one cache and pass
//! it to wherever loads happen; there is no global instance.

use crate::load::{load, LoadSpecification};
use crate::model::Model;
use modelforge_core::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Cache of loaded models keyed by their load specification
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: Mutex<HashMap<String, Weak<Model>>>,
}

impl ModelCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load through the cache. Non-cachable specifications bypass it
    /// entirely, in both directions.
    pub fn load(&self, spec: &LoadSpecification) -> Result<Arc<Model>> {
        if !spec.cachable {
            return Ok(Arc::new(load(spec)?));
        }
        let key = spec.cache_key()?;
        if let Some(model) = self.entries.lock().get(&key).and_then(Weak::upgrade) {
            debug!(path = %spec.path.display(), "model cache hit");
            return Ok(model);
        }
        let model = Arc::new(load(spec)?);
        self.entries.lock().insert(key, Arc::downgrade(&model));
        Ok(model)
    }

    /// Look up a live cached model without loading
    pub fn get(&self, spec: &LoadSpecification) -> Result<Option<Arc<Model>>> {
        let key = spec.cache_key()?;
        Ok(self.entries.lock().get(&key).and_then(Weak::upgrade))
    }

    /// Register an already loaded model under its specification
    pub fn insert(&self, spec: &LoadSpecification, model: &Arc<Model>) -> Result<()> {
        let key = spec.cache_key()?;
        self.entries.lock().insert(key, Arc::downgrade(model));
        Ok(())
    }

    /// Remove one entry, live or dead
    pub fn evict(&self, spec: &LoadSpecification) -> Result<bool> {
        let key = spec.cache_key()?;
        Ok(self.entries.lock().remove(&key).is_some())
    }

    /// Drop entries whose model has been released
    pub fn compact(&self) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, remaining = entries.len(), "compacted model cache");
        }
    }

    /// Number of entries, counting dead ones until the next compact
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when the cache holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
