// ── Core error types ──
//
// Nothing in this crate is fatal to the process. Every variant describes
// an operation that left presentation state unchanged; callers decide
// whether to surface it or move on.

use std::net::IpAddr;

use thiserror::Error;

use crate::model::DeviceId;
use crate::synchronizer::Lifecycle;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── State errors ─────────────────────────────────────────────────
    #[error("Unknown device: {identity}")]
    UnknownDevice { identity: DeviceId },

    #[error("Address {address} is not in the current snapshot")]
    AddressNotTracked { address: IpAddr },

    #[error("Recording device not listed: {id}")]
    UnknownRecordingDevice { id: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Operation '{operation}' rejected in {state} state")]
    LifecycleViolation {
        operation: &'static str,
        state: Lifecycle,
    },

    /// The owner context is gone. Public operations absorb this silently.
    #[error("Presentation surface already torn down")]
    TeardownNoop,

    #[error("Owner context did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Network enumeration failed: {reason}")]
    NetworkEnumeration { reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error is the teardown signal that public operations swallow.
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::TeardownNoop)
    }
}

/// Collapse [`CoreError::TeardownNoop`] into the provided fallback value.
///
/// Every public synchronizer operation funnels its gate result through this
/// so shutdown races never reach callers.
pub(crate) fn absorb_teardown<T>(result: Result<T, CoreError>, fallback: T) -> Result<T, CoreError> {
    match result {
        Err(CoreError::TeardownNoop) => Ok(fallback),
        other => other,
    }
}
