//! Configuration loading and management for subline.
//!
//! Loads settings from `subline.toml` with environment variable overrides for sensitive data.

use crate::analysis::ResponseFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
    #[error("Google Sheets is not configured: {0}")]
    MissingSheetConfig(&'static str),
    #[error("database is not configured: {0}")]
    MissingDatabaseConfig(&'static str),
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider: "openai" or "gemini"
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,
    /// Shape the model is asked to reply in
    pub format: ResponseFormat,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub timeout_secs: u64,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
    #[serde(default)]
    pub openai_key: Option<String>,
}

/// Where accepted results are written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Sheet,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub target: Target,
}

/// Google Sheets destination
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SheetsConfig {
    /// Path to a service-account key file
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    /// Service-account key as raw JSON, preferred over `credentials`
    #[serde(default)]
    pub credentials_json: Option<String>,
    #[serde(default)]
    pub sheet_id: Option<String>,
    /// Worksheet title; the first worksheet when empty
    #[serde(default)]
    pub worksheet: Option<String>,
}

/// MySQL destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location (subline.toml in cwd or home),
    /// falling back to built-in defaults when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Override secrets from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.api.gemini_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.api.openai_key = Some(key);
        }
        if let Ok(id) = std::env::var("SUBLINE_SHEET_ID") {
            self.sheets.sheet_id = Some(id);
        }
        if let Ok(json) = std::env::var("SUBLINE_SHEETS_CREDENTIALS") {
            self.sheets.credentials_json = Some(json);
        }
        if let Ok(password) = std::env::var("SUBLINE_DB_PASSWORD") {
            self.database.password = Some(password);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SUBLINE_CONFIG") {
            return Some(PathBuf::from(path));
        }

        // Check current directory first
        let local_config = PathBuf::from("subline.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("subline").join("subline.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Get the API key for the configured provider
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.agent.provider.as_str() {
            "gemini" => self
                .api
                .gemini_key
                .as_deref()
                .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string())),
            "openai" => self
                .api
                .openai_key
                .as_deref()
                .ok_or_else(|| ConfigError::MissingApiKey("openai".to_string())),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    /// Spreadsheet id, required before any sheet write
    pub fn sheet_id(&self) -> Result<&str, ConfigError> {
        non_empty(self.sheets.sheet_id.as_deref())
            .ok_or(ConfigError::MissingSheetConfig("sheet_id"))
    }

    /// Check that the database section has everything a connection needs
    pub fn database_ready(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if non_empty(db.host.as_deref()).is_none() {
            return Err(ConfigError::MissingDatabaseConfig("host"));
        }
        if non_empty(db.user.as_deref()).is_none() {
            return Err(ConfigError::MissingDatabaseConfig("user"));
        }
        if non_empty(db.database.as_deref()).is_none() {
            return Err(ConfigError::MissingDatabaseConfig("database"));
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_db_port() -> u16 {
    3306
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("subline")
        .join("logs")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            format: ResponseFormat::default(),
            base_url: default_openai_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_db_port(),
            user: None,
            password: None,
            database: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
        }
    }
}
