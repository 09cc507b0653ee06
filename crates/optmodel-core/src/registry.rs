//! Registry of options models
//!
//! The registry owns every model of a process together with the shared
//! cache and codec registry they resolve through. It is built once at
//! startup, filled with [`ModelRegistry::register`], and handed out by
//! reference afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{CacheKey, ResultCache};
use crate::codec::CodecRegistry;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::OptionModel;
use crate::path::SEPARATOR;
use crate::resolver::OptionResolver;

/// Registry mapping model identities to models.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use optmodel_core::{CodecRegistry, ModelRegistry, ResultCache};
///
/// let registry = ModelRegistry::new(Arc::new(ResultCache::new()), CodecRegistry::with_builtins());
/// assert!(registry.is_empty());
/// assert!(registry.resolver("theme").is_err());
/// ```
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn OptionModel>>,
    cache: Arc<ResultCache>,
    codecs: CodecRegistry,
    config: EngineConfig,
    write_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.ids())
            .field("codecs", &self.codecs)
            .field("config", &self.config)
            .finish()
    }
}

impl ModelRegistry {
    /// Create an empty registry with the default configuration.
    pub fn new(cache: Arc<ResultCache>, codecs: CodecRegistry) -> Self {
        Self::with_config(cache, codecs, EngineConfig::default())
    }

    /// Create an empty registry with explicit configuration.
    ///
    /// The configured unknown-type policy replaces the one on `codecs`.
    pub fn with_config(
        cache: Arc<ResultCache>,
        codecs: CodecRegistry,
        config: EngineConfig,
    ) -> Self {
        let codecs = codecs.with_unknown_types(config.codecs.unknown_types);
        Self {
            models: HashMap::new(),
            cache,
            codecs,
            config,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Add a model.
    ///
    /// Fails if the identity is empty, contains `/`, or is already taken.
    /// Runs the model's [`OptionModel::on_register`] hook on success.
    pub fn register<M: OptionModel + 'static>(&mut self, model: Arc<M>) -> Result<()> {
        let id = model.id().to_string();
        if id.is_empty() || id.contains(SEPARATOR) {
            return Err(Error::InvalidModelId { id });
        }
        if self.models.contains_key(&id) {
            return Err(Error::DuplicateModel { id });
        }

        model.on_register();
        tracing::debug!(model = %id, "Registered options model");
        self.models.insert(id, model);
        Ok(())
    }

    /// Look up a model by identity.
    pub fn model(&self, id: &str) -> Option<&Arc<dyn OptionModel>> {
        self.models.get(id)
    }

    /// Get a resolver for a registered model.
    pub fn resolver(&self, id: &str) -> Result<OptionResolver<'_>> {
        let model = self
            .models
            .get(id)
            .ok_or_else(|| Error::UnknownModel { id: id.to_string() })?;
        Ok(OptionResolver::new(self, model.as_ref()))
    }

    /// Check if a model is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// Sorted list of registered identities.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.models.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if no models are registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Shared result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Codec registry used for every model.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Write lock for one values scope, if writes are serialized.
    pub(crate) fn write_lock(&self, key: &CacheKey) -> Option<Arc<Mutex<()>>> {
        if !self.config.writes.serialize {
            return None;
        }
        let mut locks = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Some(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    /// Hand back a lock obtained from `write_lock`.
    ///
    /// The entry is dropped once no other writer holds it, so the table
    /// only covers scopes with a write in flight.
    pub(crate) fn release_write_lock(&self, key: &CacheKey, lock: Option<Arc<Mutex<()>>>) {
        let Some(lock) = lock else {
            return;
        };
        let mut locks = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Number of scopes that currently have a write in flight.
    pub fn pending_writes(&self) -> usize {
        self.write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
