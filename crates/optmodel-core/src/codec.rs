//! Type-specific load/save transforms
//!
//! Each option type tag maps to an [`OptionCodec`]. On read the resolver
//! passes the raw value through [`OptionCodec::load`]; on write the incoming
//! value goes through [`OptionCodec::save`] before it is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::ValueMap;
use crate::config::UnknownTypePolicy;
use crate::error::{Error, Result};
use crate::schema::OptionDescriptor;

/// Load/save transform pair for one option type.
///
/// Codecs are total over well-formed input. `load` may be handed a value it
/// produced itself on an earlier read and must leave such values intact.
pub trait OptionCodec: Send + Sync {
    /// Transform a stored value into the value handed to callers.
    ///
    /// `current` is `null` when nothing is stored for the option.
    fn load(
        &self,
        key: &str,
        descriptor: &OptionDescriptor,
        current: Value,
        params: &ValueMap,
    ) -> Value;

    /// Transform a caller value into its stored form.
    fn save(
        &self,
        key: &str,
        descriptor: &OptionDescriptor,
        value: Value,
        params: &ValueMap,
    ) -> Value;
}

/// Codec that stores values unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl OptionCodec for IdentityCodec {
    fn load(&self, _: &str, _: &OptionDescriptor, current: Value, _: &ValueMap) -> Value {
        current
    }

    fn save(&self, _: &str, _: &OptionDescriptor, value: Value, _: &ValueMap) -> Value {
        value
    }
}

/// Registry selecting a codec by option type tag.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn OptionCodec>>,
    unknown_types: UnknownTypePolicy,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.list_types())
            .field("unknown_types", &self.unknown_types)
            .finish()
    }
}

impl CodecRegistry {
    /// Create an empty registry that passes unknown types through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the identity codec registered for the
    /// built-in scalar types.
    ///
    /// Currently registers: `text`, `textarea`, `select`, `checkbox`,
    /// `switch`, `radio`, `color-picker`, `hidden`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for tag in [
            "text",
            "textarea",
            "select",
            "checkbox",
            "switch",
            "radio",
            "color-picker",
            "hidden",
        ] {
            registry.register(tag, IdentityCodec);
        }
        registry
    }

    /// Set how options with an unregistered type are handled.
    pub fn with_unknown_types(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_types = policy;
        self
    }

    /// Register a codec for a type tag, replacing any previous one.
    pub fn register(&mut self, option_type: impl Into<String>, codec: impl OptionCodec + 'static) {
        self.codecs.insert(option_type.into(), Arc::new(codec));
    }

    /// Get the codec for a type tag.
    pub fn get(&self, option_type: &str) -> Option<&Arc<dyn OptionCodec>> {
        self.codecs.get(option_type)
    }

    /// Check if a codec is registered for a type tag.
    pub fn has_codec(&self, option_type: &str) -> bool {
        self.codecs.contains_key(option_type)
    }

    /// Sorted list of registered type tags.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.codecs.keys().cloned().collect();
        types.sort();
        types
    }

    /// Current unknown-type policy.
    pub fn unknown_types(&self) -> UnknownTypePolicy {
        self.unknown_types
    }

    fn resolve(
        &self,
        key: &str,
        descriptor: &OptionDescriptor,
    ) -> Result<Option<&dyn OptionCodec>> {
        match self.codecs.get(&descriptor.option_type) {
            Some(codec) => Ok(Some(codec.as_ref())),
            None => match self.unknown_types {
                UnknownTypePolicy::PassThrough => {
                    tracing::debug!(
                        option = key,
                        option_type = %descriptor.option_type,
                        "No codec for option type, passing value through"
                    );
                    Ok(None)
                }
                UnknownTypePolicy::Reject => Err(Error::UnknownOptionType {
                    key: key.to_string(),
                    option_type: descriptor.option_type.clone(),
                }),
            },
        }
    }

    /// Run the load transform for an option.
    pub fn load(
        &self,
        key: &str,
        descriptor: &OptionDescriptor,
        current: Value,
        params: &ValueMap,
    ) -> Result<Value> {
        Ok(match self.resolve(key, descriptor)? {
            Some(codec) => codec.load(key, descriptor, current, params),
            None => current,
        })
    }

    /// Run the save transform for an option.
    pub fn save(
        &self,
        key: &str,
        descriptor: &OptionDescriptor,
        value: Value,
        params: &ValueMap,
    ) -> Result<Value> {
        Ok(match self.resolve(key, descriptor)? {
            Some(codec) => codec.save(key, descriptor, value, params),
            None => value,
        })
    }
}
