//! Cached raw values per model scope

use serde_json::Value;

use crate::cache::{CacheDomain, CacheKey, CachedEntry, Lookup, ResultCache};
use crate::error::Result;
use crate::model::OptionModel;
use crate::{ExtraScope, ItemId, ValueMap};

/// Raw value access through the shared cache.
///
/// The first read of a scope populates the cache from
/// [`OptionModel::load_values`] and arms the scope's default merge; later
/// reads are served from the cache until the entry is invalidated.
pub struct ValueStore<'c> {
    cache: &'c ResultCache,
}

impl<'c> ValueStore<'c> {
    pub fn new(cache: &'c ResultCache) -> Self {
        Self { cache }
    }

    /// Cache key of the values entry for a scope.
    pub fn key(model: &dyn OptionModel, item: Option<ItemId>, extra: &ExtraScope) -> CacheKey {
        CacheKey::new(
            model.id(),
            CacheDomain::Values,
            model.cache_key_hint(CacheDomain::Values, item, extra),
        )
    }

    /// Get the cached values for a scope, populating on a miss.
    ///
    /// The returned flag is `true` only for the call that populated the
    /// entry.
    pub fn get(
        &self,
        model: &dyn OptionModel,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<(ValueMap, bool)> {
        let key = Self::key(model, item, extra);

        if let Lookup::Hit(values) = self.cache.values(&key) {
            tracing::trace!(%key, "Values cache hit");
            return Ok((values, false));
        }

        let values = Self::load_fresh(model, item, extra)?;
        tracing::debug!(%key, count = values.len(), "Populated values cache");
        self.cache.set(key.clone(), CachedEntry::Values(values.clone()));
        self.cache.arm_merge(key);

        Ok((values, true))
    }

    /// Read values straight from the backing store, bypassing the cache.
    pub fn load_fresh(
        model: &dyn OptionModel,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<ValueMap> {
        Ok(coerce_map(model.load_values(item, extra)?))
    }

    /// Drop the values entry for a scope.
    pub fn invalidate(&self, model: &dyn OptionModel, item: Option<ItemId>, extra: &ExtraScope) {
        let key = Self::key(model, item, extra);
        tracing::debug!(%key, "Invalidated values cache");
        self.cache.delete(&key);
    }
}

/// Treat anything but an object as an empty map.
pub fn coerce_map(value: Value) -> ValueMap {
    match value {
        Value::Object(map) => map,
        _ => ValueMap::new(),
    }
}
