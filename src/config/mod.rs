//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `USASPENDING__` (sections separated by
//! `__`, e.g. `USASPENDING__API__TIMEOUT_SECS=60`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "https://api.usaspending.gov/api/v2/"
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [tools]
//! default_pages_to_fetch = 3
//! default_max_concurrent = 10
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::USASPENDING_API_BASE;
use crate::fetch::{DEFAULT_PAGES_TO_FETCH, MAX_CONCURRENT_CEILING};

/// File name searched for in the working directory
pub const CONFIG_FILE_NAME: &str = "usaspending-mcp.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "USASPENDING";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Defaults applied when a tool call omits an argument
    #[serde(default)]
    pub tools: ToolDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout; a hung call fails instead of holding its slot
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Overrides the `usaspending-mcp/<version>` user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    USASPENDING_API_BASE.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Tool argument defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefaults {
    /// Page budget for `search_spending_by_award`
    #[serde(default = "default_pages_to_fetch")]
    pub default_pages_to_fetch: u32,

    /// Concurrency for `get_award_details`, still capped at 10
    #[serde(default = "default_max_concurrent")]
    pub default_max_concurrent: usize,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            default_pages_to_fetch: default_pages_to_fetch(),
            default_max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_pages_to_fetch() -> u32 {
    DEFAULT_PAGES_TO_FETCH
}

fn default_max_concurrent() -> usize {
    MAX_CONCURRENT_CEILING
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a configuration file in the working directory or the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("usaspending-mcp").join("config.toml"))
        .filter(|path| path.is_file())
}
