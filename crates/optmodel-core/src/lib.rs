//! Option value resolution with cached schema defaults
//!
//! An options model persists raw option values somewhere and declares its
//! options (type and default) somewhere else. This crate sits between the
//! two and provides:
//!
//! - **Path addressing**: `key/sub/path` identifiers into nested values
//! - **Result cache**: three-state slots with explicit invalidation and a
//!   recursion guard for schemas that read their own options
//! - **Default merge**: declared defaults back-filled once per population
//! - **Codec dispatch**: per-type load/save transforms selected by type tag
//! - **Resolver**: `get` / `set` over a registered model
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use optmodel_core::{
//!     CodecRegistry, ExtraScope, ItemId, ModelRegistry, OptionModel, Result, ResultCache,
//!     ValueMap,
//! };
//! use serde_json::{Value, json};
//!
//! struct Theme {
//!     stored: Mutex<ValueMap>,
//! }
//!
//! impl OptionModel for Theme {
//!     fn id(&self) -> &str {
//!         "theme"
//!     }
//!
//!     fn load_values(&self, _item: Option<ItemId>, _extra: &ExtraScope) -> Result<Value> {
//!         Ok(Value::Object(self.stored.lock().unwrap().clone()))
//!     }
//!
//!     fn store_values(&self, _item: Option<ItemId>, values: &ValueMap, _extra: &ExtraScope) -> Result<()> {
//!         *self.stored.lock().unwrap() = values.clone();
//!         Ok(())
//!     }
//!
//!     fn load_descriptors(&self, _: &ModelRegistry, _: Option<ItemId>, _: &ExtraScope) -> Result<Value> {
//!         Ok(json!({"color": {"type": "text", "value": "blue"}}))
//!     }
//! }
//!
//! let mut registry = ModelRegistry::new(Arc::new(ResultCache::new()), CodecRegistry::with_builtins());
//! registry.register(Arc::new(Theme { stored: Mutex::new(ValueMap::new()) })).unwrap();
//!
//! let theme = registry.resolver("theme").unwrap();
//! let extra = ExtraScope::new();
//! assert_eq!(theme.get(None, "color", None, &extra).unwrap(), json!("blue"));
//!
//! theme.set(None, "color", json!("red"), &extra).unwrap();
//! assert_eq!(theme.get(None, "color", None, &extra).unwrap(), json!("red"));
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod merge;
pub mod model;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod values;

/// Identifier of the entity an option set belongs to.
pub type ItemId = u64;

/// Option key to value map.
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// Auxiliary parameters further qualifying cache and storage scope.
pub type ExtraScope = serde_json::Map<String, serde_json::Value>;

pub use cache::{CacheDomain, CacheKey, CachedEntry, Lookup, ResultCache};
pub use codec::{CodecRegistry, IdentityCodec, OptionCodec};
pub use config::{EngineConfig, UnknownTypePolicy};
pub use error::{Error, Result};
pub use index::{SchemaIndex, SchemaLookup};
pub use merge::DefaultMerger;
pub use model::{OptionChange, OptionModel};
pub use path::{OptionPath, split};
pub use registry::ModelRegistry;
pub use resolver::OptionResolver;
pub use schema::{OptionDescriptor, Schema};
pub use values::ValueStore;
