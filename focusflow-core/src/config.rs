//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/focusflow/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/focusflow/` (~/.config/focusflow/)
//! - Data: `$XDG_DATA_HOME/focusflow/` (~/.local/share/focusflow/)
//! - State/Logs: `$XDG_STATE_HOME/focusflow/` (~/.local/state/focusflow/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Accepted completion trend windows, in days.
pub const TREND_DAYS_RANGE: RangeInclusive<u32> = 1..=365;

/// Accepted activity heatmap windows, in months.
pub const HEATMAP_MONTHS_RANGE: RangeInclusive<u32> = 1..=24;

/// Accepted upcoming-deadline horizons, in days.
pub const UPCOMING_DAYS_RANGE: RangeInclusive<u32> = 1..=365;

/// Longest time a metric may stay cached (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Plan generation model (optional; without it every plan is the fallback plan)
    #[serde(default)]
    pub llm: Option<LlmConfig>,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Planner configuration
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database file override
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// LLM provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider type
    pub provider: LlmProvider,
    /// Model to use
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Supported LLM providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Ollama,
    Claude,
    OpenAI,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Claude => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    /// Environment variable consulted when no `api_key` is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("GEMINI_API_KEY"),
            LlmProvider::Ollama => None,
            LlmProvider::Claude => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
        }
    }
}

fn default_llm_timeout() -> u64 {
    30
}

/// Analytics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Seconds a computed metric stays cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Default completion trend window in days
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,

    /// Default activity heatmap window in months
    #[serde(default = "default_heatmap_months")]
    pub heatmap_months: u32,

    /// Horizon for upcoming deadlines in days
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,

    /// Number of recently completed tasks on the dashboard
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            trend_days: default_trend_days(),
            heatmap_months: default_heatmap_months(),
            upcoming_days: default_upcoming_days(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl AnalyticsConfig {
    /// Rejects windows the analytics queries would refuse anyway, so a bad
    /// value fails at startup instead of on every dashboard read.
    pub fn validate(&self) -> Result<()> {
        check_range("analytics.trend_days", self.trend_days, &TREND_DAYS_RANGE)?;
        check_range(
            "analytics.heatmap_months",
            self.heatmap_months,
            &HEATMAP_MONTHS_RANGE,
        )?;
        check_range(
            "analytics.upcoming_days",
            self.upcoming_days,
            &UPCOMING_DAYS_RANGE,
        )?;
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::Config(format!(
                "analytics.cache_ttl_secs must be at most {} (got {})",
                MAX_CACHE_TTL_SECS, self.cache_ttl_secs
            )));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: u32, range: &RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be in {}..={} (got {})",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_trend_days() -> u32 {
    30
}

fn default_heatmap_months() -> u32 {
    6
}

fn default_upcoming_days() -> u32 {
    7
}

fn default_recent_limit() -> usize {
    5
}

/// Planner configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    /// Default number of plans returned by history listings
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.analytics.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/focusflow/config.toml` (~/.config/focusflow/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("focusflow").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("focusflow")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("focusflow")
    }

    /// Returns the database file path, honouring `database_path` when set
    ///
    /// Default: `$XDG_DATA_HOME/focusflow/focusflow.db`
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("focusflow.db"))
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/focusflow/focusflow.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("focusflow.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
