//! `castsync run`: drive the synchronizer from stdin.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use castsync_core::{
    ActionSink, AddressEntry, CoreError, NetworkLayer, PresentationSnapshot, RecordingDevice,
    SyncEvent, Synchronizer, SystemNetwork,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Collaborators ───────────────────────────────────────────────────

/// Network layer for `--no-network`: nothing is enumerated, so addresses
/// only arrive through `network_addresses_changed` events.
struct OfflineNetwork;

impl NetworkLayer for OfflineNetwork {
    fn enumerate_ipv4(&self) -> Result<Vec<AddressEntry>, CoreError> {
        Ok(Vec::new())
    }

    fn resolve_default_address(&self) -> Option<IpAddr> {
        None
    }
}

/// Headless stand-in for playback control and settings: forwarded actions
/// are logged.
struct LoggedActions;

impl ActionSink for LoggedActions {
    fn change_ip_address_used(&self, address: IpAddr) {
        info!(%address, "streaming address changed");
    }
    fn set_lag_threshold(&self, value: u32) {
        info!(value, "lag threshold changed");
    }
    fn on_set_hooks(&self, enabled: bool) {
        info!(enabled, "keyboard hooks toggled");
    }
    fn on_set_auto_restart(&self, enabled: bool) {
        info!(enabled, "auto restart toggled");
    }
    fn recording_device_changed(&self, device: &RecordingDevice) {
        info!(device = %device.id, "recording device changed");
    }
    fn scan_for_devices(&self) {
        info!("device scan requested");
    }
    fn reset_settings(&self) {
        info!("settings reset requested");
    }
    fn close_application(&self) {
        info!("close requested");
    }
    fn volume_up(&self) {
        info!("volume up");
    }
    fn volume_down(&self) {
        info!("volume down");
    }
    fn volume_mute(&self) {
        info!("volume mute");
    }
    fn sync_devices(&self) {
        info!("device sync requested");
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let network: Arc<dyn NetworkLayer> = if args.no_network {
        Arc::new(OfflineNetwork)
    } else {
        Arc::new(SystemNetwork::new())
    };

    let sync = Synchronizer::new(
        config::synchronizer_config(&cfg, &args),
        cfg.to_preferences(),
        network,
        Arc::new(LoggedActions),
    );

    // Subscribe before start so the initial load is printed too.
    let mut events = sync.events();
    let format = global.output.clone();
    let color = output::should_color(&global.color);
    let quiet = global.quiet;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next_event().await {
            match output::render_event(&format, &event, color) {
                Ok(line) => output::print_output(&line, quiet),
                Err(e) => warn!(error = %e, "event not printed"),
            }
        }
    });

    sync.start().await?;
    let result = pump_stdin(&sync).await;

    let snapshot = if args.snapshot && result.is_ok() {
        Some(sync.snapshot().await?)
    } else {
        None
    };

    sync.shutdown().await;
    // Dropping the last handle closes the event feed and ends the printer.
    drop(sync);
    if printer.await.is_err() {
        warn!("event printer stopped abnormally");
    }

    result?;
    if let Some(snapshot) = snapshot {
        let rendered = output::render_single(
            &global.output,
            &snapshot,
            snapshot_detail,
            |s| s.selected_address.map(|ip| ip.to_string()).unwrap_or_default(),
        )?;
        output::print_output(&rendered, global.quiet);
    }
    Ok(())
}

/// Feed stdin lines to the synchronizer until EOF or ctrl-c.
async fn pump_stdin(sync: &Synchronizer) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0_usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!(lines = line_no, "stdin closed");
                    break;
                };
                line_no += 1;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<SyncEvent>(trimmed) {
                    Ok(event) => {
                        if let Err(e) = sync.handle(event).await {
                            warn!(line = line_no, error = %e, "event rejected");
                        }
                    }
                    Err(e) => warn!(line = line_no, error = %e, "unparseable event line"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn snapshot_detail(snapshot: &PresentationSnapshot) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "Devices ({}):", snapshot.devices.len());
    for device in &snapshot.devices {
        let _ = writeln!(out, "  {:<24} {:<14} {}", device.name, device.state, device.id);
    }
    let _ = writeln!(out, "Sync eligible: {}", snapshot.sync_eligible);
    let _ = writeln!(out, "Addresses ({}):", snapshot.addresses.len());
    for entry in &snapshot.addresses {
        let marker = if Some(entry.address) == snapshot.selected_address { "*" } else { " " };
        let _ = writeln!(out, "  {marker} {:<16} {}", entry.address, entry.adapter);
    }
    let _ = writeln!(out, "Visible: {}", snapshot.visible);
    if let Some(ref label) = snapshot.keep_alive {
        let _ = writeln!(out, "{label}");
    }
    let _ = write!(out, "Lag: {}", snapshot.preferences.lag_value);
    out
}
