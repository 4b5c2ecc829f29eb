//! Shared configuration for castsync front ends.
//!
//! A TOML document with `[synchronizer]` tuning and `[preferences]`, layered
//! as defaults, then the config file, then `CASTSYNC_` environment variables,
//! and translated into `castsync_core` types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use castsync_core::{LAG_MAX, Preferences, SynchronizerConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub synchronizer: SynchronizerSection,

    #[serde(default)]
    pub preferences: Preferences,
}

/// Owner-context pacing, in plain integer units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SynchronizerSection {
    /// Delay before a requested hide takes effect.
    #[serde(default = "default_hide_delay_ms")]
    pub hide_delay_ms: u64,

    /// Address re-enumeration interval; `0` disables the watcher.
    #[serde(default = "default_address_poll_secs")]
    pub address_poll_secs: u64,

    /// Bound on cross-context calls into the owner.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Transcript retention in bytes.
    #[serde(default = "default_transcript_limit")]
    pub transcript_limit: usize,

    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,
}

impl Default for SynchronizerSection {
    fn default() -> Self {
        Self {
            hide_delay_ms: default_hide_delay_ms(),
            address_poll_secs: default_address_poll_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            transcript_limit: default_transcript_limit(),
            event_channel_size: default_event_channel_size(),
        }
    }
}

fn default_hide_delay_ms() -> u64 {
    1000
}
fn default_address_poll_secs() -> u64 {
    5
}
fn default_call_timeout_secs() -> u64 {
    5
}
fn default_transcript_limit() -> usize {
    1024 * 1024
}
fn default_event_channel_size() -> usize {
    256
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "castsync", "castsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("castsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, still honouring `CASTSYNC_` overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CASTSYNC_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.synchronizer.call_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "synchronizer.call_timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.synchronizer.event_channel_size == 0 {
            return Err(ConfigError::Validation {
                field: "synchronizer.event_channel_size".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.preferences.lag_value > LAG_MAX {
            return Err(ConfigError::Validation {
                field: "preferences.lag_value".into(),
                reason: format!("must be at most {LAG_MAX}, got {}", self.preferences.lag_value),
            });
        }
        Ok(())
    }

    pub fn to_synchronizer_config(&self) -> SynchronizerConfig {
        let s = &self.synchronizer;
        SynchronizerConfig {
            hide_delay: Duration::from_millis(s.hide_delay_ms),
            address_poll_interval: Duration::from_secs(s.address_poll_secs),
            call_timeout: Duration::from_secs(s.call_timeout_secs),
            transcript_limit: s.transcript_limit,
            event_channel_size: s.event_channel_size,
        }
    }

    pub fn to_preferences(&self) -> Preferences {
        self.preferences.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_core_defaults() {
        let config = Config::default();
        assert_eq!(config.to_synchronizer_config(), SynchronizerConfig::default());
        assert_eq!(config.to_preferences(), Preferences::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[synchronizer]\nhide_delay_ms = 250\n\n[preferences]\nauto_restart = true\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(
            config.to_synchronizer_config().hide_delay,
            Duration::from_millis(250)
        );
        assert_eq!(config.synchronizer.address_poll_secs, 5);
        assert!(config.preferences.auto_restart);
        assert!(config.preferences.show_log);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn out_of_range_lag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[preferences]\nlag_value = 20000\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.preferences.lag_value = 3000;
        config.synchronizer.address_poll_secs = 0;

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.preferences.lag_value, 3000);
        assert!(loaded.to_synchronizer_config().address_poll_interval.is_zero());
    }
}
