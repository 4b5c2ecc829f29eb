//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use castsync_config::ConfigError;
use castsync_core::{CoreError, Lifecycle};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const NETWORK: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Network ──────────────────────────────────────────────────────

    #[error("Could not enumerate local network interfaces: {reason}")]
    #[diagnostic(
        code(castsync::network),
        help("Run with --no-network to feed addresses through stdin instead.")
    )]
    Network { reason: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(castsync::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Lifecycle ────────────────────────────────────────────────────

    #[error("Operation '{operation}' rejected: synchronizer is {state}")]
    #[diagnostic(code(castsync::lifecycle))]
    Lifecycle {
        operation: String,
        state: Lifecycle,
    },

    #[error("Presentation context did not answer within {millis}ms")]
    #[diagnostic(code(castsync::timeout))]
    Timeout { millis: u64 },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(castsync::config_exists),
        help("Use --force to overwrite it, or edit the file directly.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(castsync::config),
        help("Check the file with: castsync config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(castsync::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(castsync::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network { .. } => exit_code::NETWORK,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownDevice { identity } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: identity.to_string(),
                hint: "Devices appear once a device_discovered event names them.".into(),
            },

            CoreError::AddressNotTracked { address } => CliError::NotFound {
                resource_type: "address".into(),
                identifier: address.to_string(),
                hint: "Run: castsync addresses".into(),
            },

            CoreError::UnknownRecordingDevice { id } => CliError::NotFound {
                resource_type: "recording device".into(),
                identifier: id,
                hint: "Only announced recording devices can be selected.".into(),
            },

            CoreError::LifecycleViolation { operation, state } => CliError::Lifecycle {
                operation: operation.into(),
                state,
            },

            CoreError::Timeout { timeout_ms } => CliError::Timeout { millis: timeout_ms },

            CoreError::NetworkEnumeration { reason } => CliError::Network { reason },

            CoreError::TeardownNoop => {
                CliError::Internal("presentation context already torn down".into())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn untracked_address_maps_to_not_found() {
        let err = CliError::from(CoreError::AddressNotTracked {
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn enumeration_failure_maps_to_network() {
        let err = CliError::from(CoreError::NetworkEnumeration {
            reason: "no adapters".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NETWORK);
    }

    #[test]
    fn lifecycle_violation_is_general() {
        let err = CliError::from(CoreError::LifecycleViolation {
            operation: "add_device",
            state: Lifecycle::Uninitialized,
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert!(err.to_string().contains("uninitialized"));
    }
}
