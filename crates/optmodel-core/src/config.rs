//! Engine configuration
//!
//! The engine reads an optional TOML document:
//!
//! ```toml
//! [codecs]
//! unknown-types = "pass-through"   # or "reject"
//!
//! [writes]
//! serialize = true                 # per-scope write lock in set()
//! ```
//!
//! Every key is optional; an empty document yields [`EngineConfig::default`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How options whose type tag has no registered codec are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownTypePolicy {
    /// Values are loaded and saved unchanged
    #[default]
    PassThrough,
    /// Loading or saving such an option fails with
    /// [`Error::UnknownOptionType`]
    Reject,
}

impl FromStr for UnknownTypePolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass-through" | "passthrough" | "permissive" => Ok(UnknownTypePolicy::PassThrough),
            "reject" | "strict" => Ok(UnknownTypePolicy::Reject),
            _ => Err(Error::InvalidPolicy {
                policy: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UnknownTypePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownTypePolicy::PassThrough => write!(f, "pass-through"),
            UnknownTypePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Codec dispatch settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CodecsConfig {
    /// Handling of unregistered option types
    #[serde(default)]
    pub unknown_types: UnknownTypePolicy,
}

fn default_serialize() -> bool {
    true
}

/// Write path settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritesConfig {
    /// Serialize concurrent writes to the same model scope
    #[serde(default = "default_serialize")]
    pub serialize: bool,
}

impl Default for WritesConfig {
    fn default() -> Self {
        Self {
            serialize: default_serialize(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub codecs: CodecsConfig,
    #[serde(default)]
    pub writes: WritesConfig,
}

impl EngineConfig {
    /// Parse configuration from TOML content.
    ///
    /// # Example
    ///
    /// ```
    /// use optmodel_core::config::{EngineConfig, UnknownTypePolicy};
    ///
    /// let config = EngineConfig::parse(r#"
    /// [codecs]
    /// unknown-types = "reject"
    /// "#).unwrap();
    ///
    /// assert_eq!(config.codecs.unknown_types, UnknownTypePolicy::Reject);
    /// assert!(config.writes.serialize);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        Ok(config)
    }
}
