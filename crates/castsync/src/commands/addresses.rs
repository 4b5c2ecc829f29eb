//! `castsync addresses`: one-shot listing of local IPv4 addresses.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;

use castsync_core::{NoopActions, Preferences, Synchronizer, SynchronizerConfig, SystemNetwork};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct AddressListing {
    address: IpAddr,
    adapter: String,
    selected: bool,
}

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Adapter")]
    adapter: String,
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = SynchronizerConfig {
        address_poll_interval: Duration::ZERO,
        ..SynchronizerConfig::default()
    };
    let sync = Synchronizer::new(
        config,
        Preferences::default(),
        Arc::new(SystemNetwork::new()),
        Arc::new(NoopActions),
    );

    sync.start().await?;
    // Surface enumeration failures instead of an empty list.
    let refreshed = sync.add_ip4_addresses();
    let snapshot = sync.snapshot().await;
    sync.shutdown().await;
    refreshed?;
    let snapshot = snapshot?;

    let listing: Vec<AddressListing> = snapshot
        .addresses
        .iter()
        .map(|entry| AddressListing {
            address: entry.address,
            adapter: entry.adapter.to_string(),
            selected: Some(entry.address) == snapshot.selected_address,
        })
        .collect();

    let rendered = output::render_list(
        &global.output,
        &listing,
        |l| AddressRow {
            marker: if l.selected { "*" } else { "" },
            address: l.address.to_string(),
            adapter: l.adapter.clone(),
        },
        |l| l.address.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
