// ── Host network layer ──
//
// Real `NetworkLayer` backed by the OS interface table.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use tracing::debug;

use crate::collab::NetworkLayer;
use crate::error::CoreError;
use crate::model::AddressEntry;

// Connecting a UDP socket sends nothing; it only asks the routing table
// which local address would be used.
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 53);

/// Enumerates non-loopback IPv4 addresses of the host's interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNetwork;

impl SystemNetwork {
    pub fn new() -> Self {
        Self
    }

    fn routed_address() -> Option<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect(ROUTE_PROBE).ok()?;
        let local = socket.local_addr().ok()?.ip();
        (!local.is_unspecified()).then_some(local)
    }
}

impl NetworkLayer for SystemNetwork {
    fn enumerate_ipv4(&self) -> Result<Vec<AddressEntry>, CoreError> {
        let interfaces = NetworkInterface::show().map_err(|e| CoreError::NetworkEnumeration {
            reason: e.to_string(),
        })?;

        let mut entries: Vec<AddressEntry> = Vec::new();
        for iface in interfaces {
            for addr in &iface.addr {
                let IpAddr::V4(ip) = addr.ip() else { continue };
                if ip.is_loopback() || ip.is_unspecified() {
                    continue;
                }
                let address = IpAddr::V4(ip);
                if entries.iter().any(|e| e.address == address) {
                    continue;
                }
                entries.push(AddressEntry::new(address, iface.name.clone()));
            }
        }

        debug!(count = entries.len(), "enumerated local IPv4 addresses");
        Ok(entries)
    }

    fn resolve_default_address(&self) -> Option<IpAddr> {
        if let Some(routed) = Self::routed_address() {
            return Some(routed);
        }
        self.enumerate_ipv4()
            .ok()
            .and_then(|entries| entries.first().map(|e| e.address))
    }
}
