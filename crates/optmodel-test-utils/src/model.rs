//! [`MemoryModel`] builder for resolver test scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use optmodel_core::{
    CacheDomain, Error, ExtraScope, ItemId, ModelRegistry, OptionChange, OptionModel, Result,
    Schema, ValueMap,
};
use serde_json::Value;

type StorageKey = (Option<ItemId>, Option<String>);

/// An options model backed by in-process maps.
///
/// Every collaborator call is counted so tests can assert how often the
/// resolver reached the backing store or the schema source.
///
/// # Example
///
/// ```rust
/// use optmodel_test_utils::MemoryModel;
/// use serde_json::json;
///
/// let model = MemoryModel::new("theme")
///     .with_descriptors(json!({"color": {"type": "text", "value": "blue"}}))
///     .with_values(None, json!({"color": "red"}));
///
/// assert_eq!(model.stored(None), json!({"color": "red"}));
/// ```
#[derive(Default)]
pub struct MemoryModel {
    id: String,
    descriptors: Mutex<Value>,
    values: Mutex<HashMap<StorageKey, Value>>,
    scope_field: Option<String>,
    probe: Option<(String, Option<Value>)>,
    schema_delay: Option<Duration>,
    probe_results: Mutex<Vec<Value>>,
    fail_writes: AtomicBool,
    changes: Mutex<Vec<OptionChange>>,
    load_values_calls: AtomicUsize,
    store_values_calls: AtomicUsize,
    load_descriptors_calls: AtomicUsize,
    extract_defaults_calls: AtomicUsize,
    register_calls: AtomicUsize,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("MemoryModel: poisoned lock")
}

impl MemoryModel {
    /// Create a model with no descriptors and no stored values.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the descriptor tree returned by `load_descriptors`.
    pub fn with_descriptors(self, descriptors: Value) -> Self {
        *locked(&self.descriptors) = descriptors;
        self
    }

    /// Seed the stored values for an item scope.
    pub fn with_values(self, item: Option<ItemId>, values: Value) -> Self {
        locked(&self.values).insert((item, None), values);
        self
    }

    /// Seed stored values for an item scope qualified by the extra-scope
    /// field configured with [`MemoryModel::scoped_by`].
    pub fn with_scoped_values(self, item: Option<ItemId>, scope: &str, values: Value) -> Self {
        locked(&self.values).insert((item, Some(scope.to_string())), values);
        self
    }

    /// Qualify storage and cache keys by the string member `field` of the
    /// extra scope.
    pub fn scoped_by(mut self, field: impl Into<String>) -> Self {
        self.scope_field = Some(field.into());
        self
    }

    /// Read `option_id` of this same model from inside `load_descriptors`.
    pub fn reading_during_schema_load(mut self, option_id: &str, default: Option<Value>) -> Self {
        self.probe = Some((option_id.to_string(), default));
        self
    }

    /// Sleep for `delay` inside every `load_descriptors` call.
    pub fn with_schema_delay(mut self, delay: Duration) -> Self {
        self.schema_delay = Some(delay);
        self
    }

    /// Make every `store_values` call fail.
    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    fn scope_of(&self, extra: &ExtraScope) -> Option<String> {
        let field = self.scope_field.as_ref()?;
        extra.get(field).and_then(Value::as_str).map(str::to_string)
    }

    /// Currently stored raw value for an unqualified item scope
    /// (`null` if nothing was stored).
    pub fn stored(&self, item: Option<ItemId>) -> Value {
        self.stored_in(item, None)
    }

    /// Currently stored raw value for a qualified item scope.
    pub fn stored_in(&self, item: Option<ItemId>, scope: Option<&str>) -> Value {
        locked(&self.values)
            .get(&(item, scope.map(str::to_string)))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Overwrite stored values behind the resolver's back.
    pub fn put_raw(&self, item: Option<ItemId>, values: Value) {
        locked(&self.values).insert((item, None), values);
    }

    /// Replace the descriptor tree behind the resolver's back.
    pub fn set_descriptors(&self, descriptors: Value) {
        *locked(&self.descriptors) = descriptors;
    }

    /// Changes reported through `after_set`, oldest first.
    pub fn changes(&self) -> Vec<OptionChange> {
        locked(&self.changes).clone()
    }

    /// Values read by the schema-load probe, oldest first.
    pub fn probe_results(&self) -> Vec<Value> {
        locked(&self.probe_results).clone()
    }

    pub fn load_values_calls(&self) -> usize {
        self.load_values_calls.load(Ordering::SeqCst)
    }

    pub fn store_values_calls(&self) -> usize {
        self.store_values_calls.load(Ordering::SeqCst)
    }

    pub fn load_descriptors_calls(&self) -> usize {
        self.load_descriptors_calls.load(Ordering::SeqCst)
    }

    pub fn extract_defaults_calls(&self) -> usize {
        self.extract_defaults_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

impl OptionModel for MemoryModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn load_values(&self, item: Option<ItemId>, extra: &ExtraScope) -> Result<Value> {
        self.load_values_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored_in(item, self.scope_of(extra).as_deref()))
    }

    fn store_values(
        &self,
        item: Option<ItemId>,
        values: &ValueMap,
        extra: &ExtraScope,
    ) -> Result<()> {
        self.store_values_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::backend(&self.id, "store rejected"));
        }
        locked(&self.values).insert((item, self.scope_of(extra)), Value::Object(values.clone()));
        Ok(())
    }

    fn load_descriptors(
        &self,
        registry: &ModelRegistry,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<Value> {
        self.load_descriptors_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.schema_delay {
            thread::sleep(delay);
        }

        if let Some((option_id, default)) = &self.probe {
            let value = registry
                .resolver(&self.id)?
                .get(item, option_id, default.clone(), extra)?;
            locked(&self.probe_results).push(value);
        }

        Ok(locked(&self.descriptors).clone())
    }

    fn cache_key_hint(
        &self,
        _domain: CacheDomain,
        item: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Option<String> {
        match (item, self.scope_of(extra)) {
            (None, None) => None,
            (Some(item), None) => Some(item.to_string()),
            (Some(item), Some(scope)) => Some(format!("{item}:{scope}")),
            (None, Some(scope)) => Some(format!("-:{scope}")),
        }
    }

    fn extract_defaults(&self, schema: &Schema) -> ValueMap {
        self.extract_defaults_calls.fetch_add(1, Ordering::SeqCst);
        schema.defaults()
    }

    fn after_set(&self, _registry: &ModelRegistry, change: &OptionChange) {
        locked(&self.changes).push(change.clone());
    }

    fn on_register(&self) {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
    }
}
