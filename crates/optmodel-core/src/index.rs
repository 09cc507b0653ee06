//! Cached schema per model scope

use std::sync::Arc;

use crate::cache::{CacheDomain, CacheKey, CachedEntry, Lookup, ResultCache};
use crate::error::Result;
use crate::model::OptionModel;
use crate::registry::ModelRegistry;
use crate::schema::Schema;
use crate::{ExtraScope, ItemId};

/// A schema as seen by one resolution step.
#[derive(Debug, Clone)]
pub struct SchemaLookup {
    pub schema: Arc<Schema>,
    /// `true` when the schema for this scope is still being loaded further
    /// up the stack and `schema` is an empty stand-in
    pub placeholder: bool,
}

/// Schema access through the shared cache with a recursion guard.
pub struct SchemaIndex<'c> {
    cache: &'c ResultCache,
}

impl<'c> SchemaIndex<'c> {
    pub fn new(cache: &'c ResultCache) -> Self {
        Self { cache }
    }

    /// Cache key of the schema entry for a scope.
    pub fn key(model: &dyn OptionModel, item: Option<ItemId>, extra: &ExtraScope) -> CacheKey {
        CacheKey::new(
            model.id(),
            CacheDomain::Schema,
            model.cache_key_hint(CacheDomain::Schema, item, extra),
        )
    }

    /// Get the schema for a scope, loading and normalizing it on a miss.
    ///
    /// While the descriptors are being loaded the slot is marked in
    /// progress for the loading thread; a re-entrant call for the same scope
    /// on that thread gets an empty placeholder instead of loading again.
    /// Other threads load the descriptors themselves.
    pub fn get(
        &self,
        registry: &ModelRegistry,
        model: &dyn OptionModel,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<SchemaLookup> {
        let key = Self::key(model, item, extra);

        match self.cache.schema(&key) {
            Lookup::Hit(schema) => {
                return Ok(SchemaLookup {
                    schema,
                    placeholder: false,
                });
            }
            Lookup::InProgress => {
                tracing::debug!(%key, "Schema load in progress, using empty placeholder");
                return Ok(SchemaLookup {
                    schema: Arc::new(Schema::new()),
                    placeholder: true,
                });
            }
            Lookup::Miss => {}
        }

        self.cache.begin(key.clone());
        let tree = match model.load_descriptors(registry, item, extra) {
            Ok(tree) => tree,
            Err(err) => {
                self.cache.abandon(&key);
                return Err(err);
            }
        };

        let schema = Arc::new(Schema::from_descriptors(&tree));
        tracing::debug!(%key, options = schema.len(), "Loaded schema");
        self.cache.set(key, CachedEntry::Schema(Arc::clone(&schema)));

        Ok(SchemaLookup {
            schema,
            placeholder: false,
        })
    }

    /// Drop the schema entry for a scope.
    pub fn invalidate(&self, model: &dyn OptionModel, item: Option<ItemId>, extra: &ExtraScope) {
        self.cache.delete(&Self::key(model, item, extra));
    }
}
