//! Configuration for the voxhub-am daemon
//!
//! A minimal TOML bootstrap file covers everything; there is no runtime
//! settings store because the daemon keeps no persistent state.
//!
//! Resolution priority for the config file path:
//! 1. Command-line argument (`--config`)
//! 2. `VOXHUB_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/voxhub/config.toml`)
//! 4. Built-in defaults (no file required)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration loaded from TOML (all fields optional)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub chime: ChimeConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Queue and completion-tracker tuning
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending (not yet played) items
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// How long an unfilled reservation may sit at the head of the queue
    /// before it is expired and auto-cancelled
    #[serde(default = "default_reservation_ttl_secs")]
    pub reservation_ttl_secs: u64,

    /// Default timeout for /wait when none is given
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// How long completion signals are retained after an item finishes
    #[serde(default = "default_tracker_grace_secs")]
    pub tracker_grace_secs: u64,

    /// How long completed item ids stay recognizable after their
    /// completion signal has been pruned
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_secs: u64,
}

/// Chime rate-limiting
#[derive(Debug, Clone, Deserialize)]
pub struct ChimeConfig {
    /// Minimum spacing between chimes, shared across all sessions
    #[serde(default = "default_chime_cooldown_secs")]
    pub cooldown_secs: u64,
}

/// Audio output settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_port() -> u16 {
    8881
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_pending() -> usize {
    64
}

fn default_reservation_ttl_secs() -> u64 {
    30
}

fn default_wait_timeout_secs() -> u64 {
    120
}

fn default_tracker_grace_secs() -> u64 {
    60
}

fn default_completed_retention_secs() -> u64 {
    600
}

fn default_chime_cooldown_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            queue: QueueConfig::default(),
            chime: ChimeConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            reservation_ttl_secs: default_reservation_ttl_secs(),
            wait_timeout_secs: default_wait_timeout_secs(),
            tracker_grace_secs: default_tracker_grace_secs(),
            completed_retention_secs: default_completed_retention_secs(),
        }
    }
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_chime_cooldown_secs(),
        }
    }
}

impl Config {
    /// Load configuration, resolving the file path per the priority order.
    ///
    /// A missing file is not an error; built-in defaults apply. Returns the
    /// path actually read, if any, so the caller can log it once tracing is
    /// up.
    pub fn load(cli_path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let path = cli_path
            .or_else(|| std::env::var("VOXHUB_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                let config: Config = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                Ok((config, Some(path)))
            }
            _ => Ok((Config::default(), None)),
        }
    }

    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.queue.reservation_ttl_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.wait_timeout_secs)
    }

    pub fn tracker_grace(&self) -> Duration {
        Duration::from_secs(self.queue.tracker_grace_secs)
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_secs(self.queue.completed_retention_secs)
    }

    pub fn chime_cooldown(&self) -> Duration {
        Duration::from_secs(self.chime.cooldown_secs)
    }
}

/// Platform config file path (`<config_dir>/voxhub/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("voxhub").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8881);
        assert_eq!(config.queue.max_pending, 64);
        assert_eq!(config.reservation_ttl(), Duration::from_secs(30));
        assert_eq!(config.chime_cooldown(), Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
        assert!(config.audio.device.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            port = 9001

            [queue]
            reservation_ttl_secs = 5

            [chime]
            cooldown_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.queue.reservation_ttl_secs, 5);
        assert_eq!(config.chime.cooldown_secs, 10);
        // Untouched sections keep defaults
        assert_eq!(config.queue.wait_timeout_secs, 120);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let (config, path) =
            Config::load(Some(PathBuf::from("/nonexistent/voxhub.toml"))).unwrap();
        assert_eq!(config.port, 8881);
        assert!(path.is_none());
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        let err = Config::load(Some(path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
