//! [`EnvelopeCodec`] for exercising codec dispatch.

use optmodel_core::{OptionCodec, OptionDescriptor, ValueMap};
use serde_json::{Value, json};

/// Stores values wrapped as `{"stored": value, "params": storage_params}`
/// and unwraps them again on load.
///
/// Loading a value that is not an envelope returns it unchanged, so loading
/// an already loaded value is harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Whether `value` has the stored envelope shape.
    pub fn is_envelope(value: &Value) -> bool {
        value.as_object().is_some_and(|map| map.contains_key("stored"))
    }
}

impl OptionCodec for EnvelopeCodec {
    fn load(&self, _: &str, _: &OptionDescriptor, current: Value, _: &ValueMap) -> Value {
        match current {
            Value::Object(mut map) if map.contains_key("stored") => {
                map.remove("stored").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    fn save(&self, _: &str, _: &OptionDescriptor, value: Value, params: &ValueMap) -> Value {
        json!({"stored": value, "params": params})
    }
}
