//! Configuration resolution for vocab-seed
//!
//! Multi-tier resolution for runtime secrets and service settings:
//! - generation API key: Database → ENV → TOML
//! - trigger secret: ENV → TOML
//! - generation model: Database → TOML

use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tracing::{info, warn};
use vocab_common::config::TomlConfig;
use vocab_common::{Error, Result};

use crate::services::GenerationSettings;

/// Environment variable holding the generation API key
pub const GENERATION_API_KEY_ENV: &str = "VOCAB_GENERATION_API_KEY";

/// Environment variable holding the trigger bearer secret
pub const TRIGGER_SECRET_ENV: &str = "VOCAB_TRIGGER_SECRET";

/// Resolve generation API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_generation_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_generation_api_key(db).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(GENERATION_API_KEY_ENV).ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.generation.api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    if sources.len() > 1 {
        warn!(
            "Generation API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key.filter(|k| is_valid_key(k)) {
        info!("Generation API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
        info!("Generation API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key.filter(|k| is_valid_key(k)) {
        info!("Generation API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "Generation API key not configured. Please configure using one of:\n\
         1. CLI: vocab-seed set-api-key <key>\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: [generation] api_key = \"your-key\"",
        GENERATION_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Connection settings for the generation client
pub async fn resolve_generation_settings(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<GenerationSettings> {
    let api_key = resolve_generation_api_key(db, toml_config).await?;
    let model = crate::db::settings::get_generation_model(db)
        .await?
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| toml_config.generation.model.clone());

    Ok(GenerationSettings {
        api_base: toml_config.generation.api_base.clone(),
        model,
        api_key,
        timeout: Duration::from_secs(toml_config.generation.timeout_secs),
    })
}

/// Bearer secret for trigger endpoints; `None` disables authorization
///
/// **Priority:** ENV → TOML
pub fn resolve_trigger_secret(toml_config: &TomlConfig) -> Option<String> {
    if let Ok(secret) = std::env::var(TRIGGER_SECRET_ENV) {
        if is_valid_key(&secret) {
            return Some(secret.trim().to_string());
        }
    }

    toml_config
        .trigger_secret
        .as_deref()
        .filter(|s| is_valid_key(s))
        .map(|s| s.trim().to_string())
}

/// Lease expiry; unset means leases never expire
pub fn lease_ttl(toml_config: &TomlConfig) -> Option<Duration> {
    toml_config.lease_ttl_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}
