//! Configuration loading, validation, and management for autoclaw.
//!
//! Loads configuration from `~/.autoclaw/config.toml` with environment
//! variable overrides, and the agent's identity from a separate
//! `ai_settings.toml`. Both are plain values built once at startup and
//! passed by reference to whoever needs them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.autoclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for planning cycles and self-feedback
    #[serde(default = "default_fast_llm_model")]
    pub fast_llm_model: String,

    /// Model used when `--gpt4only` is given
    #[serde(default = "default_smart_llm_model")]
    pub smart_llm_model: String,

    /// Context window of the fast model, in tokens
    #[serde(default = "default_fast_token_limit")]
    pub fast_token_limit: usize,

    /// Context window of the smart model, in tokens
    #[serde(default = "default_smart_token_limit")]
    pub smart_token_limit: usize,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Upper bound on a single backend call
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Control loop settings
    #[serde(default, rename = "loop")]
    pub agent_loop: LoopConfig,

    /// Workspace sandbox settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Plugin allow/deny lists
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Built-in command settings
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Per-cycle log mirroring
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_fast_llm_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_smart_llm_model() -> String {
    "gpt-4".into()
}
fn default_fast_token_limit() -> usize {
    4000
}
fn default_smart_token_limit() -> usize {
    8000
}
fn default_backend_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("fast_llm_model", &self.fast_llm_model)
            .field("smart_llm_model", &self.smart_llm_model)
            .field("fast_token_limit", &self.fast_token_limit)
            .field("smart_token_limit", &self.smart_token_limit)
            .field("temperature", &self.temperature)
            .field("backend_timeout_secs", &self.backend_timeout_secs)
            .field("agent_loop", &self.agent_loop)
            .field("workspace", &self.workspace)
            .field("plugins", &self.plugins)
            .field("commands", &self.commands)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Authorize every cycle without asking the operator
    #[serde(default)]
    pub continuous_mode: bool,

    /// Cycle ceiling in continuous mode (0 = unlimited)
    #[serde(default)]
    pub continuous_limit: u64,

    #[serde(default = "default_authorise_key")]
    pub authorise_key: String,

    #[serde(default = "default_exit_key")]
    pub exit_key: String,

    #[serde(default = "default_self_feedback_key")]
    pub self_feedback_key: String,

    /// Tokens held back when checking a command result against the window
    #[serde(default = "default_budget_margin")]
    pub budget_margin: usize,

    /// Maximum length of the rolling summary memory, in characters
    #[serde(default = "default_summary_memory_limit")]
    pub summary_memory_limit: usize,
}

fn default_authorise_key() -> String {
    "y".into()
}
fn default_exit_key() -> String {
    "n".into()
}
fn default_self_feedback_key() -> String {
    "s".into()
}
fn default_budget_margin() -> usize {
    600
}
fn default_summary_memory_limit() -> usize {
    2000
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            continuous_mode: false,
            continuous_limit: 0,
            authorise_key: default_authorise_key(),
            exit_key: default_exit_key(),
            self_feedback_key: default_self_feedback_key(),
            budget_margin: default_budget_margin(),
            summary_memory_limit: default_summary_memory_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Sandbox root; defaults to `~/.autoclaw/workspace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(default = "default_true")]
    pub restrict_to_workspace: bool,

    #[serde(default)]
    pub forbidden_paths: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            directory: None,
            restrict_to_workspace: true,
            forbidden_paths: vec![
                "/etc".into(),
                "/proc".into(),
                "/sys".into(),
                "~/.ssh".into(),
                "~/.gnupg".into(),
                "~/.aws".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Register `execute_shell`
    #[serde(default)]
    pub allow_shell: bool,

    /// Programs `execute_shell` may start
    #[serde(default = "default_shell_allowlist")]
    pub shell_allowlist: Vec<String>,
}

fn default_shell_allowlist() -> Vec<String> {
    ["ls", "cat", "head", "tail", "echo", "pwd", "wc", "grep", "find", "git"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            allow_shell: false,
            shell_allowlist: default_shell_allowlist(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving per-cycle history/reply/input files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_log_dir: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.autoclaw/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `AUTOCLAW_API_KEY`, then `OPENAI_API_KEY`, when no key is configured
    /// - `AUTOCLAW_MODEL` for the fast model
    /// - `AUTOCLAW_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("AUTOCLAW_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }
        if let Some(model) = var("AUTOCLAW_MODEL") {
            self.fast_llm_model = model;
        }
        if let Some(url) = var("AUTOCLAW_BASE_URL") {
            self.base_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".autoclaw")
    }

    /// The sandbox root: the configured directory, or `~/.autoclaw/workspace`.
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace
            .directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("workspace"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let keys = &self.agent_loop;
        let normalized = [
            keys.authorise_key.trim().to_lowercase(),
            keys.exit_key.trim().to_lowercase(),
            keys.self_feedback_key.trim().to_lowercase(),
        ];
        if normalized.iter().any(|k| k.is_empty()) {
            return Err(ConfigError::ValidationError(
                "authorise_key, exit_key and self_feedback_key must not be empty".into(),
            ));
        }
        if normalized[0] == normalized[1] || normalized[0] == normalized[2] || normalized[1] == normalized[2] {
            return Err(ConfigError::ValidationError(
                "authorise_key, exit_key and self_feedback_key must be distinct".into(),
            ));
        }

        if self.fast_token_limit <= keys.budget_margin || self.smart_token_limit <= keys.budget_margin {
            return Err(ConfigError::ValidationError(
                "token limits must exceed loop.budget_margin".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            fast_llm_model: default_fast_llm_model(),
            smart_llm_model: default_smart_llm_model(),
            fast_token_limit: default_fast_token_limit(),
            smart_token_limit: default_smart_token_limit(),
            temperature: 0.0,
            backend_timeout_secs: default_backend_timeout_secs(),
            agent_loop: LoopConfig::default(),
            workspace: WorkspaceConfig::default(),
            plugins: PluginsConfig::default(),
            commands: CommandsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Who the agent is and what it is trying to achieve.
///
/// Stored separately from [`AppConfig`] in `ai_settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    pub ai_name: String,

    pub ai_role: String,

    #[serde(default)]
    pub ai_goals: Vec<String>,

    /// Spending cap in USD (0 = unlimited)
    #[serde(default)]
    pub api_budget: f64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            ai_name: "Entrepreneur-GPT".into(),
            ai_role: "an AI designed to autonomously develop and run businesses".into(),
            ai_goals: vec![],
            api_budget: 0.0,
        }
    }
}

impl AiSettings {
    /// Default location: `~/.autoclaw/ai_settings.toml`.
    pub fn default_path() -> PathBuf {
        AppConfig::config_dir().join("ai_settings.toml")
    }

    /// Load settings; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No AI settings found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if settings.ai_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("ai_name must not be empty".into()));
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Human-readable budget, e.g. "infinite" or "$2.5".
    pub fn budget_label(&self) -> String {
        if self.api_budget <= 0.0 {
            "infinite".into()
        } else {
            format!("${}", self.api_budget)
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent_loop.authorise_key, "y");
        assert_eq!(config.agent_loop.budget_margin, 600);
        assert!(!config.agent_loop.continuous_mode);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.fast_llm_model, config.fast_llm_model);
        assert_eq!(parsed.agent_loop.exit_key, config.agent_loop.exit_key);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clashing_keys_rejected() {
        let mut config = AppConfig::default();
        config.agent_loop.exit_key = "Y".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn margin_must_fit_window() {
        let mut config = AppConfig::default();
        config.fast_token_limit = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.fast_llm_model, "gpt-3.5-turbo");
    }

    #[test]
    fn loop_section_parses() {
        let toml_str = r#"
fast_llm_model = "gpt-4o-mini"

[loop]
continuous_mode = true
continuous_limit = 5
authorise_key = "ok"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.agent_loop.continuous_mode);
        assert_eq!(config.agent_loop.continuous_limit, 5);
        assert_eq!(config.agent_loop.authorise_key, "ok");
        assert_eq!(config.agent_loop.exit_key, "n");
        assert_eq!(config.fast_llm_model, "gpt-4o-mini");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "AUTOCLAW_MODEL" => Some("gpt-4o".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.fast_llm_model, "gpt-4o");
        assert_eq!(config.base_url, default_base_url());
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn workspace_dir_prefers_configured_directory() {
        let mut config = AppConfig::default();
        config.workspace.directory = Some("/srv/agent".into());
        assert_eq!(config.workspace_dir(), PathBuf::from("/srv/agent"));
    }

    #[test]
    fn ai_settings_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai_settings.toml");
        let settings = AiSettings {
            ai_name: "Researcher".into(),
            ai_role: "summarise papers".into(),
            ai_goals: vec!["find three papers".into()],
            api_budget: 2.5,
        };
        settings.save(&path).unwrap();

        let loaded = AiSettings::load_from(&path).unwrap();
        assert_eq!(loaded.ai_name, "Researcher");
        assert_eq!(loaded.ai_goals.len(), 1);
        assert_eq!(loaded.budget_label(), "$2.5");
    }

    #[test]
    fn unlimited_budget_label() {
        assert_eq!(AiSettings::default().budget_label(), "infinite");
    }
}
