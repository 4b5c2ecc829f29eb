//! CLI configuration: a thin wrapper around `castsync_config`.
//!
//! Adds `--config` / `CASTSYNC_CONFIG` path overrides and the `run`
//! command's flag overrides on top of the shared loader.

use std::path::PathBuf;

use castsync_core::SynchronizerConfig;

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

pub use castsync_config::{Config, config_path, load_config_from, load_config_or_default, save_config, save_config_to};

/// The config file this invocation reads and writes.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load configuration. An explicit path must parse; the default location
/// falls back to built-in defaults.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    match global.config {
        Some(ref path) => Ok(load_config_from(path)?),
        None => Ok(load_config_or_default()),
    }
}

/// Apply `run` flag overrides on top of the configured tuning.
pub fn synchronizer_config(cfg: &Config, args: &RunArgs) -> SynchronizerConfig {
    let mut config = cfg.to_synchronizer_config();
    if let Some(interval) = args.poll_interval {
        config.address_poll_interval = interval;
    }
    if let Some(delay) = args.hide_delay {
        config.hide_delay = delay;
    }
    config
}
