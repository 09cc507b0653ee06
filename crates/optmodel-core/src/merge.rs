//! One-shot default back-fill

use crate::ValueMap;
use crate::cache::{CacheKey, CachedEntry, ResultCache};
use crate::model::OptionModel;
use crate::schema::Schema;

/// Completes cached raw values with schema defaults once per population.
pub struct DefaultMerger<'c> {
    cache: &'c ResultCache,
}

impl<'c> DefaultMerger<'c> {
    pub fn new(cache: &'c ResultCache) -> Self {
        Self { cache }
    }

    /// Merge defaults into `values` if the entry at `key` still needs it.
    ///
    /// Persisted values win over defaults for the same key. The merged map
    /// replaces the cached entry. When no merge is pending, `values` is
    /// returned unchanged.
    pub fn merge_once(
        &self,
        key: &CacheKey,
        model: &dyn OptionModel,
        values: ValueMap,
        schema: &Schema,
    ) -> ValueMap {
        if !self.cache.take_merge(key) {
            return values;
        }

        let mut merged = model.extract_defaults(schema);
        merged.extend(values);
        tracing::debug!(%key, count = merged.len(), "Merged schema defaults into values");

        self.cache.set(key.clone(), CachedEntry::Values(merged.clone()));
        merged
    }
}
