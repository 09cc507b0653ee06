//! End-to-end scenarios across several registered models
//!
//! Exercises the full flow: engine config -> registry -> cross-model reads
//! during schema load -> change hooks writing to another model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use optmodel_core::{
    CodecRegistry, EngineConfig, ExtraScope, ItemId, ModelRegistry, OptionChange, OptionModel,
    Result, ResultCache, ValueMap,
};
use optmodel_test_utils::{EnvelopeCodec, MemoryModel, logging};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Per-post settings whose declared defaults depend on the site theme and
/// whose writes are recorded in the audit model.
#[derive(Default)]
struct PostSettings {
    stored: Mutex<HashMap<Option<ItemId>, ValueMap>>,
}

impl OptionModel for PostSettings {
    fn id(&self) -> &str {
        "post"
    }

    fn load_values(&self, item: Option<ItemId>, _: &ExtraScope) -> Result<Value> {
        let stored = self.stored.lock().unwrap();
        Ok(stored.get(&item).cloned().map(Value::Object).unwrap_or(Value::Null))
    }

    fn store_values(&self, item: Option<ItemId>, values: &ValueMap, _: &ExtraScope) -> Result<()> {
        self.stored.lock().unwrap().insert(item, values.clone());
        Ok(())
    }

    fn load_descriptors(
        &self,
        registry: &ModelRegistry,
        _: Option<ItemId>,
        extra: &ExtraScope,
    ) -> Result<Value> {
        let accent = registry
            .resolver("theme")?
            .get(None, "accent", Some(json!("#000")), extra)?;

        Ok(json!({
            "display": {
                "type": "tab",
                "options": [
                    {"id": "accent", "type": "color-picker", "value": accent},
                    {"id": "sidebar", "type": "switch", "value": true},
                ],
            },
            "secret": {"type": "envelope"},
        }))
    }

    fn after_set(&self, registry: &ModelRegistry, change: &OptionChange) {
        let Ok(audit) = registry.resolver("audit") else {
            return;
        };
        let extra = ExtraScope::new();
        let mut log = audit
            .get(None, "entries", Some(json!([])), &extra)
            .unwrap_or(json!([]));
        if let Value::Array(entries) = &mut log {
            entries.push(json!({
                "item": change.item,
                "key": change.key,
                "old": change.old_value,
            }));
        }
        if let Err(err) = audit.set(None, "entries", log, &extra) {
            tracing::warn!(%err, "Failed to record audit entry");
        }
    }
}

fn site() -> (ModelRegistry, Arc<MemoryModel>, Arc<PostSettings>) {
    logging::init();

    let config = EngineConfig::parse(
        r#"
[codecs]
unknown-types = "reject"

[writes]
serialize = true
"#,
    )
    .unwrap();

    let mut codecs = CodecRegistry::with_builtins();
    codecs.register("envelope", EnvelopeCodec);
    let mut registry = ModelRegistry::with_config(Arc::new(ResultCache::new()), codecs, config);

    let theme = Arc::new(
        MemoryModel::new("theme")
            .with_descriptors(json!({"accent": {"type": "color-picker", "value": "#336"}})),
    );
    let posts = Arc::new(PostSettings::default());
    registry.register(Arc::clone(&theme)).unwrap();
    registry.register(Arc::clone(&posts)).unwrap();
    registry
        .register(Arc::new(
            MemoryModel::new("audit").with_descriptors(json!({"entries": {"type": "hidden"}})),
        ))
        .unwrap();

    (registry, theme, posts)
}

#[test]
fn test_defaults_follow_other_model() {
    let (registry, _, _) = site();
    let posts = registry.resolver("post").unwrap();
    let extra = ExtraScope::new();

    // Theme has nothing stored, so the post schema sees the caller default.
    assert_eq!(posts.get(Some(1), "accent", None, &extra).unwrap(), json!("#000"));
    assert_eq!(posts.get(Some(1), "sidebar", None, &extra).unwrap(), json!(true));

    registry
        .resolver("theme")
        .unwrap()
        .set(None, "accent", json!("#f00"), &extra)
        .unwrap();
    assert_eq!(posts.get(Some(2), "accent", None, &extra).unwrap(), json!("#f00"));
}

#[test]
fn test_writes_are_audited() {
    let (registry, _, stored_posts) = site();
    let posts = registry.resolver("post").unwrap();
    let extra = ExtraScope::new();

    posts.set(Some(7), "sidebar", json!(false), &extra).unwrap();
    posts.set(Some(7), "sidebar", json!(true), &extra).unwrap();

    let audit = registry.resolver("audit").unwrap();
    assert_eq!(
        audit.get(None, "entries", None, &extra).unwrap(),
        json!([
            {"item": 7, "key": "sidebar", "old": null},
            {"item": 7, "key": "sidebar", "old": false},
        ])
    );
    assert_eq!(
        stored_posts.stored.lock().unwrap()[&Some(7)]["sidebar"],
        json!(true)
    );
}

#[test]
fn test_codec_params_carry_item_scope() {
    let (registry, _, stored_posts) = site();
    let posts = registry.resolver("post").unwrap();
    let extra = ExtraScope::new();

    posts.set(Some(9), "secret", json!("hunter2"), &extra).unwrap();

    assert_eq!(
        stored_posts.stored.lock().unwrap()[&Some(9)]["secret"],
        json!({"stored": "hunter2", "params": {"item": 9}})
    );
    assert_eq!(posts.get(Some(9), "secret", None, &extra).unwrap(), json!("hunter2"));
}

#[test]
fn test_whole_map_for_fresh_item() {
    let (registry, theme, _) = site();
    let posts = registry.resolver("post").unwrap();
    let extra = ExtraScope::new();

    theme.put_raw(None, json!({"accent": "#0f0"}));
    let all = posts.all(Some(3), &extra).unwrap();

    assert_eq!(all["accent"], json!("#0f0"));
    assert_eq!(all["sidebar"], json!(true));
    assert_eq!(all["secret"], Value::Null);
    assert_eq!(theme.load_descriptors_calls(), 1);
}
