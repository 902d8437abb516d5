//! Runtime setting resolution: database, environment, TOML

mod helpers;

use helpers::memory_db;
use serial_test::serial;
use std::env;
use std::time::Duration;
use vocab_common::config::TomlConfig;
use vocab_seed::config::{
    lease_ttl, resolve_generation_api_key, resolve_generation_settings, resolve_trigger_secret,
    GENERATION_API_KEY_ENV, TRIGGER_SECRET_ENV,
};
use vocab_seed::db::settings;

fn toml_with_key(key: Option<&str>) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.generation.api_key = key.map(str::to_string);
    config
}

#[tokio::test]
#[serial]
async fn test_database_key_wins() {
    let pool = memory_db().await;
    settings::set_generation_api_key(&pool, "db-key".to_string()).await.unwrap();
    env::set_var(GENERATION_API_KEY_ENV, "env-key");

    let key = resolve_generation_api_key(&pool, &toml_with_key(Some("toml-key"))).await;
    env::remove_var(GENERATION_API_KEY_ENV);

    assert_eq!(key.unwrap(), "db-key");
}

#[tokio::test]
#[serial]
async fn test_env_key_beats_toml() {
    let pool = memory_db().await;
    env::set_var(GENERATION_API_KEY_ENV, "env-key");

    let key = resolve_generation_api_key(&pool, &toml_with_key(Some("toml-key"))).await;
    env::remove_var(GENERATION_API_KEY_ENV);

    assert_eq!(key.unwrap(), "env-key");
}

#[tokio::test]
#[serial]
async fn test_blank_keys_are_skipped() {
    let pool = memory_db().await;
    settings::set_generation_api_key(&pool, "   ".to_string()).await.unwrap();
    env::remove_var(GENERATION_API_KEY_ENV);

    let key = resolve_generation_api_key(&pool, &toml_with_key(Some("toml-key"))).await;
    assert_eq!(key.unwrap(), "toml-key");
}

#[tokio::test]
#[serial]
async fn test_missing_key_is_config_error() {
    let pool = memory_db().await;
    env::remove_var(GENERATION_API_KEY_ENV);

    let err = resolve_generation_api_key(&pool, &toml_with_key(None)).await.unwrap_err();
    assert!(matches!(err, vocab_common::Error::Config(_)));
    assert!(err.to_string().contains("set-api-key"));
}

#[tokio::test]
#[serial]
async fn test_model_setting_overrides_toml() {
    let pool = memory_db().await;
    env::remove_var(GENERATION_API_KEY_ENV);
    settings::set_generation_model(&pool, "db-model".to_string()).await.unwrap();

    let mut toml = toml_with_key(Some("toml-key"));
    toml.generation.timeout_secs = 9;
    let resolved = resolve_generation_settings(&pool, &toml).await.unwrap();

    assert_eq!(resolved.model, "db-model");
    assert_eq!(resolved.api_key, "toml-key");
    assert_eq!(resolved.timeout, Duration::from_secs(9));
}

#[test]
#[serial]
fn test_trigger_secret_resolution() {
    env::remove_var(TRIGGER_SECRET_ENV);
    let mut toml = TomlConfig::default();
    assert_eq!(resolve_trigger_secret(&toml), None);

    toml.trigger_secret = Some(" from-toml ".to_string());
    assert_eq!(resolve_trigger_secret(&toml).as_deref(), Some("from-toml"));

    env::set_var(TRIGGER_SECRET_ENV, "from-env");
    let secret = resolve_trigger_secret(&toml);
    env::remove_var(TRIGGER_SECRET_ENV);
    assert_eq!(secret.as_deref(), Some("from-env"));
}

#[test]
fn test_lease_ttl_is_opt_in() {
    let mut toml = TomlConfig::default();
    assert_eq!(lease_ttl(&toml), None);

    toml.lease_ttl_secs = Some(0);
    assert_eq!(lease_ttl(&toml), None);

    toml.lease_ttl_secs = Some(600);
    assert_eq!(lease_ttl(&toml), Some(Duration::from_secs(600)));
}
