//! Application configuration for the AI tutor.
//!
//! User config lives at `~/.aitutor/aitutor.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "aitutor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".aitutor";

// ---------------------------------------------------------------------------
// Config structs (matching aitutor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Prompt context limits.
    #[serde(default)]
    pub context: ContextLimitsConfig,

    /// Questionnaire scoring behavior.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.aitutor/aitutor.db".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for chatbot answers.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[context]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextLimitsConfig {
    /// Hard cap on any single field injected into the prompt.
    #[serde(default = "default_max_field_chars")]
    pub max_field_chars: usize,

    /// Hard cap on the whole assembled context block.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for ContextLimitsConfig {
    fn default() -> Self {
        Self {
            max_field_chars: default_max_field_chars(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_max_field_chars() -> usize {
    4000
}
fn default_max_context_chars() -> usize {
    12_000
}

/// What to do with a response whose question is not in the loaded set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownQuestionPolicy {
    /// Log a warning and leave the response out of scoring.
    #[default]
    Skip,
    /// Fail the whole submission.
    Reject,
}

/// `[scoring]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub unknown_question: UnknownQuestionPolicy,
}

// ---------------------------------------------------------------------------
// Context config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime limits for context assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Per-field character cap.
    pub max_field_chars: usize,
    /// Whole-block character cap.
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ContextConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_field_chars: config.context.max_field_chars,
            max_context_chars: config.context.max_context_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.aitutor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| TutorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.aitutor/aitutor.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| TutorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TutorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TutorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| TutorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TutorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` in a configured path to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| TutorError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Read the OpenRouter API key from the configured env var.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(TutorError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
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
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("unknown_question = \"skip\""));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let toml_str = r#"
[context]
max_field_chars = 500

[scoring]
unknown_question = "reject"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.context.max_field_chars, 500);
        assert_eq!(config.context.max_context_chars, 12_000);
        assert_eq!(config.scoring.unknown_question, UnknownQuestionPolicy::Reject);
        assert_eq!(config.openrouter.timeout_secs, 60);
    }

    #[test]
    fn context_config_from_app_config() {
        let ctx = ContextConfig::default();
        assert_eq!(ctx.max_field_chars, 4000);
        assert_eq!(ctx.max_context_chars, 12_000);
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        let p = expand_home("/tmp/tutor.db").expect("expand");
        assert_eq!(p, PathBuf::from("/tmp/tutor.db"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "AITUTOR_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
