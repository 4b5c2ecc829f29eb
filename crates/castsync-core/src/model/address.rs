// ── Local address types ──

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Identity of the network adapter an address was enumerated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterId(String);

impl AdapterId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One usable local address and the adapter it belongs to.
///
/// Two entries are the same tracked address when their IP values match;
/// the adapter is carried along for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub address: IpAddr,
    pub adapter: AdapterId,
}

impl AddressEntry {
    pub fn new(address: IpAddr, adapter: impl Into<String>) -> Self {
        Self {
            address,
            adapter: AdapterId::new(adapter),
        }
    }
}
