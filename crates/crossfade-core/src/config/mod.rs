//! Configuration management for Crossfade.
//!
//! This module handles loading, saving, and validating Crossfade configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/crossfade/config.toml` |
//! | macOS | `~/Library/Application Support/app.crossfade.Crossfade/config.toml` |
//! | Windows | `%APPDATA%\crossfade\Crossfade\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use crossfade_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Backend: {}", config.server.url);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::{ServiceDescriptor, ServiceId, ServiceRegistry};

/// Main configuration struct for Crossfade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend server settings
    pub server: ServerConfig,
    /// Polling cadences
    pub polling: PollingConfig,
    /// Transfer settings
    pub transfer: TransferConfig,
    /// Known services
    pub services: Vec<ServiceDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            transfer: TransferConfig::default(),
            services: ServiceDescriptor::defaults(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the transfer backend
    pub url: String,
    /// Timeout for every request except transfer submission
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: crate::DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Polling cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between auth status polls
    #[serde(with = "humantime_serde")]
    pub auth_interval: Duration,
    /// Interval between transfer progress polls
    #[serde(with = "humantime_serde")]
    pub progress_interval: Duration,
    /// How long a finished run stays visible before being reset
    #[serde(with = "humantime_serde")]
    pub completion_window: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            auth_interval: Duration::from_millis(crate::DEFAULT_AUTH_POLL_INTERVAL_MS),
            progress_interval: Duration::from_millis(crate::DEFAULT_PROGRESS_POLL_INTERVAL_MS),
            completion_window: Duration::from_secs(crate::DEFAULT_COMPLETION_WINDOW_SECS),
        }
    }
}

/// Transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Service playlists are read from
    pub source: ServiceId,
    /// Give up on a submission after this long (None waits indefinitely)
    #[serde(
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub submit_timeout: Option<Duration>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            source: ServiceId::from(crate::DEFAULT_SOURCE_SERVICE),
            submit_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that serde can't.
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig {
                key: "server.url".to_string(),
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }

        for (key, value) in [
            ("polling.auth_interval", self.polling.auth_interval),
            ("polling.progress_interval", self.polling.progress_interval),
            ("server.request_timeout", self.server.request_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidConfig {
                    key: key.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.transfer.submit_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig {
                key: "transfer.submit_timeout".to_string(),
                reason: "must be greater than zero when set".to_string(),
            });
        }

        let registry = self.registry()?;
        if !registry.contains(&self.transfer.source) {
            return Err(Error::InvalidConfig {
                key: "transfer.source".to_string(),
                reason: format!("'{}' is not a configured service", self.transfer.source),
            });
        }
        Ok(())
    }

    /// Build the service registry from `services`.
    pub fn registry(&self) -> Result<ServiceRegistry> {
        ServiceRegistry::new(self.services.clone())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("app", "crossfade", "Crossfade")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn format_duration(duration: Duration) -> String {
        if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let parse = |n: &str| n.trim().parse::<u64>().map_err(|e| e.to_string());

        if let Some(ms) = s.strip_suffix("ms") {
            parse(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            parse(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            parse(mins).map(|m| Duration::from_secs(m * 60))
        } else {
            Err(format!("invalid duration format: '{s}'"))
        }
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::AuthFlow;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.server.url, crate::DEFAULT_SERVER_URL);
        assert_eq!(config.polling.progress_interval, Duration::from_millis(800));
        assert_eq!(config.polling.completion_window, Duration::from_secs(5));
        assert!(config.transfer.submit_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config").join("config.toml");

        let mut original = Config::default();
        original.server.url = "https://transfer.example.com".to_string();
        original.polling.progress_interval = Duration::from_millis(250);
        original.transfer.submit_timeout = Some(Duration::from_secs(120));
        original.save_to(&config_path).expect("save");

        let loaded = Config::load_from(&config_path).expect("load");

        assert_eq!(loaded.server.url, "https://transfer.example.com");
        assert_eq!(loaded.polling.progress_interval, Duration::from_millis(250));
        assert_eq!(loaded.transfer.submit_timeout, Some(Duration::from_secs(120)));
        assert_eq!(loaded.services.len(), 3);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.transfer.source, ServiceId::from("spotify"));
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial_toml = r#"
[server]
url = "http://10.0.0.2:5000"

[polling]
auth_interval = "3s"
"#;

        let config: Config = toml::from_str(partial_toml).expect("parse partial config");

        assert_eq!(config.server.url, "http://10.0.0.2:5000");
        assert_eq!(config.polling.auth_interval, Duration::from_secs(3));
        assert_eq!(config.polling.progress_interval, Duration::from_millis(800));
        assert_eq!(config.services.len(), 3);
    }

    #[test]
    fn test_custom_services() {
        let toml_str = r#"
[[services]]
id = "spotify"
display_name = "Spotify"

[[services]]
id = "deezer"
display_name = "Deezer"
color_tag = "pink"
enabled = false
auth_flow = "credential"
"#;

        let config: Config = toml::from_str(toml_str).expect("parse services");
        let registry = config.registry().expect("registry");
        let deezer = registry.get(&"deezer".into()).expect("deezer");

        assert!(!deezer.enabled);
        assert_eq!(deezer.auth_flow, AuthFlow::Credential);
        assert!(registry.get(&"spotify".into()).unwrap().enabled);
        assert_eq!(
            registry.get(&"spotify".into()).unwrap().auth_flow,
            AuthFlow::OAuth
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.server.url = "localhost:5000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.polling.progress_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transfer.source = ServiceId::from("napster");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.polling.auth_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transfer.submit_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        config.transfer.submit_timeout = Some(Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(
            humantime_serde::parse_duration("800ms"),
            Ok(Duration::from_millis(800))
        );
        assert_eq!(
            humantime_serde::parse_duration("2s"),
            Ok(Duration::from_secs(2))
        );
        assert_eq!(
            humantime_serde::parse_duration("5m"),
            Ok(Duration::from_secs(300))
        );
        assert!(humantime_serde::parse_duration("soon").is_err());
    }

    #[test]
    fn test_humantime_duration_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");

        assert!(toml_str.contains("progress_interval = \"800ms\""));
        assert!(toml_str.contains("completion_window = \"5s\""));
        assert!(!toml_str.contains("submit_timeout"));
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.ends_with("config.toml"));
    }
}
