//! Application configuration for eventloom.
//!
//! User config lives at `~/.eventloom/eventloom.toml`; the CLI's
//! `--config` flag points at an alternate file. Missing values fall back
//! to defaults per field. Secrets never live in the file; each section
//! names the environment variable that holds its key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "eventloom.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".eventloom";

// ---------------------------------------------------------------------------
// Config structs (matching eventloom.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Language-model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Tabular store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Report-side defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Rendering strategy: "reader" (hosted conversion) or "browser"
    /// (headless rendering service).
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Ceiling for one fetch call, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Base URL of the hosted HTML-to-markdown conversion service.
    #[serde(default = "default_reader_endpoint")]
    pub reader_endpoint: String,

    /// Base URL of the headless-browser rendering service.
    #[serde(default = "default_browser_endpoint")]
    pub browser_endpoint: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            timeout_secs: default_fetch_timeout(),
            reader_endpoint: default_reader_endpoint(),
            browser_endpoint: default_browser_endpoint(),
        }
    }
}

fn default_strategy() -> String {
    "reader".into()
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_reader_endpoint() -> String {
    "https://r.jina.ai".into()
}
fn default_browser_endpoint() -> String {
    "http://localhost:3000".into()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model id passed to the completion backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; kept low for deterministic-leaning extraction.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_model_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key_env: default_model_key_env(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_tokens() -> u64 {
    1024
}
fn default_model_key_env() -> String {
    "OPENAI_API_KEY".into()
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the tabular store API.
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,

    /// Base (workspace) identifier within the store.
    #[serde(default)]
    pub base_id: String,

    /// Table receiving event rows.
    #[serde(default = "default_events_table")]
    pub events_table: String,

    /// Table receiving update rows.
    #[serde(default = "default_updates_table")]
    pub updates_table: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_store_key_env")]
    pub api_key_env: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            base_id: String::new(),
            events_table: default_events_table(),
            updates_table: default_updates_table(),
            api_key_env: default_store_key_env(),
        }
    }
}

fn default_store_endpoint() -> String {
    "https://api.airtable.com".into()
}
fn default_events_table() -> String {
    "Events".into()
}
fn default_updates_table() -> String {
    "Updates".into()
}
fn default_store_key_env() -> String {
    "AIRTABLE_API_KEY".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Recency window for event listings, in days.
    #[serde(default = "default_event_days")]
    pub event_days: i64,

    /// Recency window for update listings, in days.
    #[serde(default = "default_update_days")]
    pub update_days: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            event_days: default_event_days(),
            update_days: default_update_days(),
        }
    }
}

fn default_event_days() -> i64 {
    14
}
fn default_update_days() -> i64 {
    7
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.eventloom/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PipelineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.eventloom/eventloom.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PipelineError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let rendered =
        toml::to_string_pretty(&config).map_err(|e| PipelineError::config(e.to_string()))?;
    let content = format!(
        "# eventloom configuration\n\
         # Secrets never live here: the api_key_env fields name the environment\n\
         # variables holding the keys. Fill in store.base_id before submitting.\n\n{rendered}"
    );

    std::fs::write(&path, content).map_err(|e| PipelineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the named API key env var is set, and return its value.
///
/// The value is returned rather than printed so callers can hand it to a
/// backend client without it ever hitting the log.
pub fn validate_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(PipelineError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("AIRTABLE_API_KEY"));
        assert!(toml_str.contains("reader"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.timeout_secs, 30);
        assert_eq!(parsed.model.api_key_env, "OPENAI_API_KEY");
        assert_eq!(parsed.defaults.event_days, 14);
        assert_eq!(parsed.defaults.update_days, 7);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[fetch]
strategy = "browser"

[store]
base_id = "appXYZ"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fetch.strategy, "browser");
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.store.base_id, "appXYZ");
        assert_eq!(config.store.events_table, "Events");
        assert_eq!(config.model.model, "gpt-4o");
    }

    #[test]
    fn api_key_validation() {
        // Use a unique env var name to avoid interfering with other tests
        let result = validate_api_key("EVENTLOOM_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
