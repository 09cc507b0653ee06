//! The collaborator contract implemented by each options model
//!
//! An options model knows where its values are persisted and where its
//! option declarations come from. The resolver owns caching, default
//! merging and codec dispatch; the model only supplies raw data.

use serde_json::{Value, json};

use crate::cache::CacheDomain;
use crate::error::Result;
use crate::registry::ModelRegistry;
use crate::schema::Schema;
use crate::{ExtraScope, ItemId, ValueMap};

/// A completed write, passed to [`OptionModel::after_set`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChange {
    /// Item scope of the write
    pub item: Option<ItemId>,
    /// Written option key, `None` for a whole-map write
    pub key: Option<String>,
    /// Sub-path inside the option value, if one was addressed
    pub sub_path: Option<String>,
    /// Previous stored value at the written location (whole map for
    /// whole-map writes, `null` when nothing was stored)
    pub old_value: Value,
    /// Extra scope the write was issued with
    pub extra: ExtraScope,
}

/// Storage and schema collaborator for one options model.
///
/// Implementations must be cheap to call repeatedly; the resolver caches
/// their results but calls them again after every invalidation.
pub trait OptionModel: Send + Sync {
    /// Model identity. Must be non-empty and must not contain `/`.
    fn id(&self) -> &str;

    /// Read persisted raw values. Anything other than an object is treated
    /// as an empty map.
    fn load_values(&self, item: Option<ItemId>, extra: &ExtraScope) -> Result<Value>;

    /// Persist the full raw value map.
    fn store_values(
        &self,
        item: Option<ItemId>,
        values: &ValueMap,
        extra: &ExtraScope,
    ) -> Result<()>;

    /// Read the option declarations as an arbitrary nested tree.
    ///
    /// The registry is passed so that declarations may themselves read
    /// option values, including values of this model. Writing to the same
    /// scope from here deadlocks while writes are serialized, because `set`
    /// loads the schema under the scope's write lock.
    fn load_descriptors(
        &self,
        registry: &ModelRegistry,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<Value>;

    /// Parameters forwarded verbatim to codecs.
    fn storage_params(&self, item: Option<ItemId>, _extra: &ExtraScope) -> ValueMap {
        let mut params = ValueMap::new();
        if let Some(item) = item {
            params.insert("item".to_string(), json!(item));
        }
        params
    }

    /// Scope fingerprint used in cache keys. `None` means unscoped.
    fn cache_key_hint(
        &self,
        _domain: CacheDomain,
        item: Option<ItemId>,
        _extra: &ExtraScope,
    ) -> Option<String> {
        item.map(|item| item.to_string())
    }

    /// Extract default values from a schema, run once per cache population.
    fn extract_defaults(&self, schema: &Schema) -> ValueMap {
        schema.defaults()
    }

    /// Called after every successful write.
    fn after_set(&self, _registry: &ModelRegistry, _change: &OptionChange) {}

    /// Called once when the model is added to a registry.
    fn on_register(&self) {}
}
