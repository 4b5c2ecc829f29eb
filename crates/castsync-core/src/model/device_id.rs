// ── Device identity ──
//
// The key that follows one cast device across every discovery and state
// event. Whatever text the discovery backend hands us is kept verbatim;
// nothing is parsed or normalized.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable identity of a discovered device.
///
/// Two ids name the same device only if their text is byte-for-byte equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
