//! `get` / `set` entry points for one options model
//!
//! # Read path
//!
//! 1. Split the option identifier into key and sub-path.
//! 2. Fetch raw values through the values cache (arming the default merge
//!    on a fresh population).
//! 3. If the caller supplied a default and nothing is stored at the
//!    requested location, return the default right away. The schema is not
//!    loaded and no codec runs. This keeps option declarations that read
//!    their own model's values from recursing into the schema load.
//! 4. Fetch the schema through the schema cache.
//! 5. Merge schema defaults into the values, once per population.
//! 6. Run codec `load` for the requested option (or every declared option)
//!    and write the result back to the values cache.
//! 7. Return the whole map, the option value, or the sub-path value.
//!
//! # Write path
//!
//! The values entry is invalidated before the write and again after it, the
//! new map is read from and written to the backing store directly, and the
//! model's [`OptionModel::after_set`] hook runs last.

use std::sync::PoisonError;

use serde_json::Value;

use crate::cache::CachedEntry;
use crate::error::Result;
use crate::index::SchemaIndex;
use crate::merge::DefaultMerger;
use crate::model::{OptionChange, OptionModel};
use crate::path::{self, OptionPath};
use crate::registry::ModelRegistry;
use crate::values::{ValueStore, coerce_map};
use crate::{ExtraScope, ItemId, ValueMap};

/// Resolver bound to one registered model.
///
/// Obtained from [`ModelRegistry::resolver`].
#[derive(Clone, Copy)]
pub struct OptionResolver<'r> {
    registry: &'r ModelRegistry,
    model: &'r dyn OptionModel,
}

impl std::fmt::Debug for OptionResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionResolver")
            .field("model", &self.model.id())
            .finish()
    }
}

impl<'r> OptionResolver<'r> {
    pub(crate) fn new(registry: &'r ModelRegistry, model: &'r dyn OptionModel) -> Self {
        Self { registry, model }
    }

    /// Identity of the underlying model.
    pub fn id(&self) -> &str {
        self.model.id()
    }

    /// Resolve an option value.
    ///
    /// `option_id` may be empty (whole value map), a key (`color`) or a key
    /// with a sub-path (`layout/cols`). A `null` default counts as no
    /// default. Missing values without a default resolve to `null`.
    pub fn get(
        &self,
        item: Option<ItemId>,
        option_id: &str,
        default: Option<Value>,
        extra: &ExtraScope,
    ) -> Result<Value> {
        let address = path::split(option_id);
        let default = default.filter(|value| !value.is_null());
        let cache = self.registry.cache();
        let values_key = ValueStore::key(self.model, item, extra);

        let (values, fresh) = ValueStore::new(cache).get(self.model, item, extra)?;
        if fresh {
            tracing::debug!(model = self.id(), ?item, "Fresh values population");
        }

        if let Some(default) = &default {
            if nothing_stored(&values, address.as_ref(), default) {
                return Ok(default.clone());
            }
        }

        let lookup = SchemaIndex::new(cache).get(self.registry, self.model, item, extra)?;
        let schema = lookup.schema.as_ref();

        let mut values = if lookup.placeholder {
            values
        } else {
            DefaultMerger::new(cache).merge_once(&values_key, self.model, values, schema)
        };

        let targets: Vec<_> = match &address {
            Some(address) => schema
                .get(&address.key)
                .map(|descriptor| (address.key.as_str(), descriptor))
                .into_iter()
                .collect(),
            None => schema.iter().collect(),
        };

        if !targets.is_empty() {
            let params = self.model.storage_params(item, extra);
            let codecs = self.registry.codecs();
            for (key, descriptor) in targets {
                let current = values.remove(key).unwrap_or(Value::Null);
                let loaded = codecs.load(key, descriptor, current, &params)?;
                values.insert(key.to_string(), loaded);
            }
            cache.set(values_key, CachedEntry::Values(values.clone()));
        }

        Ok(match address.as_ref() {
            None => match default {
                Some(default) if values.is_empty() && is_structured(&default) => default,
                _ => Value::Object(values),
            },
            Some(OptionPath {
                key,
                sub_path: None,
            }) => match values.remove(key) {
                Some(value) if !value.is_null() => value,
                _ => default.unwrap_or(Value::Null),
            },
            Some(OptionPath {
                key,
                sub_path: Some(sub_path),
            }) => values
                .get(key)
                .and_then(|value| path::get_at(value, sub_path))
                .cloned()
                .or(default)
                .unwrap_or(Value::Null),
        })
    }

    /// Store an option value.
    ///
    /// With an empty `option_id` the whole value map is replaced; a
    /// non-object `value` then stores an empty map. With a sub-path the value
    /// is spliced into the option's current stored value.
    pub fn set(
        &self,
        item: Option<ItemId>,
        option_id: &str,
        value: Value,
        extra: &ExtraScope,
    ) -> Result<()> {
        let address = path::split(option_id);
        let cache = self.registry.cache();
        let values_key = ValueStore::key(self.model, item, extra);

        let lock = self.registry.write_lock(&values_key);
        let guard = lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));

        cache.delete(&values_key);
        let written = self.write(item, address.as_ref(), value, extra);
        cache.delete(&values_key);
        drop(guard);
        self.registry.release_write_lock(&values_key, lock);

        let old_value = written?;
        tracing::debug!(model = self.id(), ?item, option = option_id, "Stored option value");

        let (key, sub_path) = match address {
            Some(OptionPath { key, sub_path }) => (Some(key), sub_path),
            None => (None, None),
        };
        self.model.after_set(
            self.registry,
            &OptionChange {
                item,
                key,
                sub_path,
                old_value,
                extra: extra.clone(),
            },
        );

        Ok(())
    }

    /// Persist a write and return the previous value at the written location.
    fn write(
        &self,
        item: Option<ItemId>,
        address: Option<&OptionPath>,
        value: Value,
        extra: &ExtraScope,
    ) -> Result<Value> {
        let cache = self.registry.cache();
        let lookup = SchemaIndex::new(cache).get(self.registry, self.model, item, extra)?;
        let schema = lookup.schema.as_ref();
        let params = self.model.storage_params(item, extra);
        let codecs = self.registry.codecs();
        let mut stored = ValueStore::load_fresh(self.model, item, extra)?;

        match address {
            Some(address) => {
                let mut old_value = stored.get(&address.key).cloned().unwrap_or(Value::Null);
                let mut value = value;

                if let Some(sub_path) = &address.sub_path {
                    let mut new_value = old_value.clone();
                    path::set_at(&mut new_value, sub_path, value);
                    value = new_value;
                    old_value = path::get_at(&old_value, sub_path)
                        .cloned()
                        .unwrap_or(Value::Null);
                }

                if let Some(descriptor) = schema.get(&address.key) {
                    value = codecs.save(&address.key, descriptor, value, &params)?;
                }

                stored.insert(address.key.clone(), value);
                self.model.store_values(item, &stored, extra)?;
                Ok(old_value)
            }
            None => {
                let mut incoming = coerce_map(value);
                for (key, value) in incoming.iter_mut() {
                    if let Some(descriptor) = schema.get(key) {
                        let raw = std::mem::take(value);
                        *value = codecs.save(key, descriptor, raw, &params)?;
                    }
                }

                self.model.store_values(item, &incoming, extra)?;
                Ok(Value::Object(stored))
            }
        }
    }

    /// Drop the cached values and schema for a scope.
    pub fn invalidate(&self, item: Option<ItemId>, extra: &ExtraScope) {
        let cache = self.registry.cache();
        ValueStore::new(cache).invalidate(self.model, item, extra);
        SchemaIndex::new(cache).invalidate(self.model, item, extra);
    }

    /// Resolve the whole value map of a scope.
    pub fn all(&self, item: Option<ItemId>, extra: &ExtraScope) -> Result<ValueMap> {
        Ok(coerce_map(self.get(item, "", None, extra)?))
    }
}

/// Whether the requested location holds nothing, so a supplied default can
/// be returned without consulting the schema.
fn nothing_stored(values: &ValueMap, address: Option<&OptionPath>, default: &Value) -> bool {
    match address {
        None => values.is_empty() && is_structured(default),
        Some(OptionPath {
            key,
            sub_path: None,
        }) => values.get(key).is_none_or(Value::is_null),
        Some(OptionPath {
            key,
            sub_path: Some(sub_path),
        }) => values
            .get(key)
            .and_then(|value| path::get_at(value, sub_path))
            .is_none(),
    }
}

fn is_structured(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ValueMap {
        coerce_map(value)
    }

    #[test]
    fn test_nothing_stored_whole_map_needs_structured_default() {
        let empty = ValueMap::new();
        assert!(nothing_stored(&empty, None, &json!({})));
        assert!(nothing_stored(&empty, None, &json!([])));
        assert!(!nothing_stored(&empty, None, &json!("scalar")));
        assert!(!nothing_stored(&map(json!({"a": 1})), None, &json!({})));
    }

    #[test]
    fn test_nothing_stored_key() {
        let values = map(json!({"a": 1, "b": null}));
        let a = path::split("a").unwrap();
        let b = path::split("b").unwrap();
        let c = path::split("c").unwrap();
        assert!(!nothing_stored(&values, Some(&a), &json!(0)));
        assert!(nothing_stored(&values, Some(&b), &json!(0)));
        assert!(nothing_stored(&values, Some(&c), &json!(0)));
    }

    #[test]
    fn test_nothing_stored_sub_path() {
        let values = map(json!({"layout": {"cols": 2}}));
        let cols = path::split("layout/cols").unwrap();
        let rows = path::split("layout/rows").unwrap();
        assert!(!nothing_stored(&values, Some(&cols), &json!(1)));
        assert!(nothing_stored(&values, Some(&rows), &json!(1)));
    }
}
