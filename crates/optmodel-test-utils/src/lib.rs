//! Shared test utilities for the optmodel workspace.
//!
//! This crate provides in-memory collaborators so resolver tests don't
//! each hand-roll their own storage. It is a dev-dependency only and is
//! never published.
//!
//! # Modules
//!
//! - [`model`]: [`MemoryModel`], an in-memory options model with call counters
//! - [`codec`]: [`EnvelopeCodec`], a codec whose stored form differs from its loaded form
//! - [`logging`]: tracing subscriber setup for test runs

pub mod codec;
pub mod logging;
pub mod model;

pub use codec::EnvelopeCodec;
pub use model::MemoryModel;

use std::sync::Arc;

use optmodel_core::{CodecRegistry, ModelRegistry, ResultCache};

/// Build a registry with the built-in codecs plus `envelope`, holding the
/// given models.
pub fn registry_with(models: &[Arc<MemoryModel>]) -> ModelRegistry {
    let mut codecs = CodecRegistry::with_builtins();
    codecs.register("envelope", EnvelopeCodec);

    let mut registry = ModelRegistry::new(Arc::new(ResultCache::new()), codecs);
    for model in models {
        registry
            .register(Arc::clone(model))
            .expect("registry_with: duplicate or invalid model id");
    }
    registry
}
