//! Tests for engine configuration loading and its effect on a registry

use std::sync::Arc;

use optmodel_core::{
    CodecRegistry, EngineConfig, Error, ModelRegistry, ResultCache, UnknownTypePolicy,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case::pass_through("pass-through", UnknownTypePolicy::PassThrough)]
#[case::reject("reject", UnknownTypePolicy::Reject)]
fn test_parse_unknown_types(#[case] raw: &str, #[case] expected: UnknownTypePolicy) {
    let config = EngineConfig::parse(&format!("[codecs]\nunknown-types = \"{raw}\"\n")).unwrap();
    assert_eq!(config.codecs.unknown_types, expected);
}

#[test]
fn test_parse_writes_section() {
    let config = EngineConfig::parse("[writes]\nserialize = false\n").unwrap();
    assert!(!config.writes.serialize);
    assert_eq!(config.codecs.unknown_types, UnknownTypePolicy::PassThrough);
}

#[rstest]
#[case::bad_policy("[codecs]\nunknown-types = \"maybe\"\n")]
#[case::bad_type("[writes]\nserialize = \"yes\"\n")]
#[case::not_toml("[codecs")]
fn test_parse_errors(#[case] content: &str) {
    let err = EngineConfig::parse(content).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_config_overrides_codec_policy() {
    let codecs = CodecRegistry::with_builtins().with_unknown_types(UnknownTypePolicy::Reject);
    let registry = ModelRegistry::with_config(
        Arc::new(ResultCache::new()),
        codecs,
        EngineConfig::default(),
    );

    assert_eq!(registry.codecs().unknown_types(), UnknownTypePolicy::PassThrough);
    assert_eq!(registry.config(), &EngineConfig::default());
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = EngineConfig::parse("[codecs]\nunknown-types = \"reject\"\n").unwrap();
    let rendered = toml::to_string(&config).unwrap();
    assert!(rendered.contains("unknown-types = \"reject\""));
    assert_eq!(EngineConfig::parse(&rendered).unwrap(), config);
}
