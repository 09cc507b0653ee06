//! Option descriptors and schema normalization
//!
//! Collaborators declare options as an arbitrary nested tree: keyed
//! collections, sequences of descriptors carrying an `id`, and layout
//! containers (`box`, `tab`, `group`) holding further options. A [`Schema`]
//! is the flat `key -> descriptor` view of that tree with everything that is
//! not a leaf option thrown away.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ValueMap;

/// Descriptor types that only group other options.
pub const CONTAINER_TYPES: &[&str] = &["box", "tab", "group"];

/// Declaration of a single option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    /// Type tag selecting the codec
    #[serde(rename = "type")]
    pub option_type: String,

    /// Declared default value
    #[serde(rename = "value", alias = "default", default)]
    pub default: Value,

    /// Any other declared attributes, forwarded to codecs untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl OptionDescriptor {
    /// Create a descriptor with no extra attributes.
    pub fn new(option_type: impl Into<String>, default: Value) -> Self {
        Self {
            option_type: option_type.into(),
            default,
            attributes: Map::new(),
        }
    }
}

/// Flat map of option key to descriptor for one model scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    options: BTreeMap<String, OptionDescriptor>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a collaborator's descriptor tree into a schema.
    ///
    /// # Example
    ///
    /// ```
    /// use optmodel_core::Schema;
    /// use serde_json::json;
    ///
    /// let schema = Schema::from_descriptors(&json!({
    ///     "general": {
    ///         "type": "box",
    ///         "options": {
    ///             "color": {"type": "text", "value": "blue"},
    ///         },
    ///     },
    ///     "footer": {"type": "textarea"},
    ///     "note": "not an option",
    /// }));
    ///
    /// assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["color", "footer"]);
    /// ```
    pub fn from_descriptors(tree: &Value) -> Self {
        let mut schema = Self::new();
        schema.collect(tree, None);
        schema
    }

    fn collect(&mut self, node: &Value, key: Option<&str>) {
        match node {
            Value::Object(map) => match map.get("type").and_then(Value::as_str) {
                Some(tag) if CONTAINER_TYPES.contains(&tag) => {
                    if let Some(children) = map.get("options") {
                        self.collect(children, None);
                    }
                }
                Some(_) => {
                    let Some(id) = key.or_else(|| map.get("id").and_then(Value::as_str)) else {
                        tracing::trace!("Discarding option descriptor without an id");
                        return;
                    };
                    match serde_json::from_value::<OptionDescriptor>(node.clone()) {
                        Ok(descriptor) => {
                            self.options.insert(id.to_string(), descriptor);
                        }
                        Err(err) => {
                            tracing::trace!(option = id, %err, "Discarding malformed descriptor");
                        }
                    }
                }
                None => {
                    for (child_key, child) in map {
                        self.collect(child, Some(child_key));
                    }
                }
            },
            Value::Array(items) => {
                for item in items {
                    self.collect(item, None);
                }
            }
            _ => {}
        }
    }

    /// Add or replace a descriptor.
    pub fn insert(&mut self, key: impl Into<String>, descriptor: OptionDescriptor) {
        self.options.insert(key.into(), descriptor);
    }

    /// Get the descriptor for an option key.
    pub fn get(&self, key: &str) -> Option<&OptionDescriptor> {
        self.options.get(key)
    }

    /// Check whether an option key is declared.
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Declared option keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// Iterate over `(key, descriptor)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionDescriptor)> {
        self.options.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Number of declared options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Check if no options are declared.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Map every declared option to its default value.
    pub fn defaults(&self) -> ValueMap {
        self.options
            .iter()
            .map(|(key, descriptor)| (key.clone(), descriptor.default.clone()))
            .collect()
    }
}

impl FromIterator<(String, OptionDescriptor)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, OptionDescriptor)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().collect(),
        }
    }
}
