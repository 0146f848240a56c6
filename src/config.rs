//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub theme: ThemeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_auth_redirect_delay")]
    pub auth_redirect_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_auth_redirect_delay() -> u64 {
    2000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            login_path: default_login_path(),
            auth_redirect_delay_ms: default_auth_redirect_delay(),
        }
    }
}

impl ApiConfig {
    pub fn auth_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.auth_redirect_delay_ms)
    }
}

/// Real-time channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_ws_url")]
    pub url: String,

    /// Fixed delay before a reconnect attempt (ms)
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Give up on a connection attempt after this long (ms)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_connect_timeout() -> u64 {
    10_000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            reconnect_delay_ms: default_reconnect_delay(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Toast notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_timeout")]
    pub default_timeout_ms: u64,
}

fn default_notification_timeout() -> u64 {
    3000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_notification_timeout(),
        }
    }
}

impl NotificationConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Auto-refresh configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,
}

fn default_refresh_interval() -> u64 {
    30_000
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Theme persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_state_file() -> String {
    dirs::config_dir()
        .map(|p| {
            p.join("forwarder-dash")
                .join("preferences.json")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./preferences.json".to_string())
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh.interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.realtime.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "realtime.connect_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("forwarder-dash").join("config.toml")),
            Some(PathBuf::from("./forwarder-dash.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FORWARDER_DASH_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(url) = std::env::var("FORWARDER_DASH_WS_URL") {
            self.realtime.url = url;
        }
        if let Ok(delay) = std::env::var("FORWARDER_DASH_RECONNECT_MS") {
            if let Ok(ms) = delay.parse() {
                self.realtime.reconnect_delay_ms = ms;
            }
        }

        if let Ok(interval) = std::env::var("FORWARDER_DASH_REFRESH_MS") {
            match interval.parse::<u64>() {
                Ok(ms) if ms > 0 => self.refresh.interval_ms = ms,
                _ => tracing::warn!(value = %interval, "Ignoring invalid FORWARDER_DASH_REFRESH_MS"),
            }
        }

        if let Ok(level) = std::env::var("FORWARDER_DASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FORWARDER_DASH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Forwarder Dashboard Configuration
#
# Environment variables override these settings:
# - FORWARDER_DASH_API_URL
# - FORWARDER_DASH_WS_URL
# - FORWARDER_DASH_RECONNECT_MS
# - FORWARDER_DASH_REFRESH_MS
# - FORWARDER_DASH_LOG_LEVEL
# - FORWARDER_DASH_LOG_FORMAT

[api]
# Prefix for every backend API call
base_url = "http://localhost:5000"

# Request timeout in seconds
request_timeout_secs = 30

# Where to send the user when the session has expired
login_path = "/login"

# Delay before the login redirect (ms)
auth_redirect_delay_ms = 2000

[realtime]
# Real-time status channel endpoint
url = "ws://localhost:5000/ws"

# Fixed delay before reconnecting after a drop (ms)
reconnect_delay_ms = 5000

# Abandon a connection attempt after this long (ms)
connect_timeout_ms = 10000

[notifications]
# How long a toast stays visible (ms, 0 = until dismissed)
default_timeout_ms = 3000

[refresh]
# Auto-refresh interval for live pages (ms)
interval_ms = 30000

[theme]
# File holding the persisted theme preference
# state_file = "~/.config/forwarder-dash/preferences.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/forwarder-dash/dash.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.login_path, "/login");
        assert_eq!(config.realtime.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.realtime.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.notifications.default_timeout(), Duration::from_secs(3));
        assert_eq!(config.refresh.interval(), Duration::from_secs(30));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.realtime.url, "ws://localhost:5000/ws");
        assert_eq!(config.api.auth_redirect_delay_ms, 2000);
        assert_eq!(config.refresh.interval_ms, 30_000);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse(
            r#"
            [realtime]
            reconnect_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.realtime.reconnect_delay_ms, 250);
        assert_eq!(config.realtime.url, "ws://localhost:5000/ws");
        assert_eq!(config.notifications.default_timeout_ms, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://10.0.0.2:8080\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.2:8080");
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        let broken = Config::load(file.path());
        assert!(matches!(broken, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[refresh]\ninterval_ms = 0").unwrap();
        let result = Config::load(file.path());
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "refresh.interval_ms", .. })
        ));

        let config = Config::parse("[realtime]\nconnect_timeout_ms = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "realtime.connect_timeout_ms", .. })
        ));
        assert!(Config::default().validate().is_ok());
    }
}
