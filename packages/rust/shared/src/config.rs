//! Application configuration for ClauseForge.
//!
//! User config lives at `~/.clauseforge/clauseforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClauseForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "clauseforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".clauseforge";

// ---------------------------------------------------------------------------
// Config structs (matching clauseforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the clause database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Jurisdiction used when none is given on the command line.
    #[serde(default = "default_country")]
    pub country_code: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            country_code: default_country(),
        }
    }
}

fn default_db_path() -> String {
    "~/.clauseforge/clauseforge.db".into()
}
fn default_country() -> String {
    "KR".into()
}

/// `[provider]` section — the delegated text-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat-completions base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use for classification, dedup, and variable extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum ms between consecutive delegated calls.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_pacing_ms() -> u64 {
    1000
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of previously analyzed clauses sampled for dedup.
    #[serde(default = "default_dedup_sample")]
    pub dedup_sample: usize,

    /// Max chars of clause content embedded in a prompt.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Max candidates emitted by the paragraph-split fallback.
    #[serde(default = "default_max_fallback_paragraphs")]
    pub max_fallback_paragraphs: usize,

    /// Candidates below this confidence are flagged for human review.
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup_sample: default_dedup_sample(),
            preview_chars: default_preview_chars(),
            max_fallback_paragraphs: default_max_fallback_paragraphs(),
            review_threshold: default_review_threshold(),
        }
    }
}

fn default_dedup_sample() -> usize {
    5
}
fn default_preview_chars() -> usize {
    1500
}
fn default_max_fallback_paragraphs() -> usize {
    30
}
fn default_review_threshold() -> f64 {
    0.7
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.clauseforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ClauseForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.clauseforge/clauseforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ClauseForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ClauseForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ClauseForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ClauseForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ClauseForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the provider API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.provider.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(ClauseForgeError::config(format!(
            "completion-provider API key not found. Set the {var_name} environment variable."
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
        assert!(toml_str.contains("db_path"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.country_code, "KR");
        assert_eq!(parsed.provider.timeout_secs, 30);
        assert_eq!(parsed.provider.pacing_ms, 1000);
        assert_eq!(parsed.pipeline.dedup_sample, 5);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[provider]
model = "local/test-model"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.provider.model, "local/test-model");
        assert_eq!(config.provider.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.pipeline.review_threshold, 0.7);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.provider.api_key_env = "CF_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
