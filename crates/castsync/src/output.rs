//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use castsync_core::PresentationEvent;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Presentation events ──────────────────────────────────────────────

/// One line per event. Structured formats always emit compact JSON so the
/// stream stays line-delimited.
pub fn render_event(
    format: &OutputFormat,
    event: &PresentationEvent,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => render_json(event, true),
        OutputFormat::Yaml => render_yaml(event),
        OutputFormat::Plain => Ok(event_kind(event).to_owned()),
        OutputFormat::Table => {
            let kind = event_kind(event);
            let detail = event_detail(event);
            let stamp = chrono::Local::now().format("%H:%M:%S");
            if color {
                Ok(format!("{} {:<26} {detail}", stamp.dimmed(), kind.cyan()))
            } else {
                Ok(format!("{stamp} {kind:<26} {detail}"))
            }
        }
    }
}

fn event_kind(event: &PresentationEvent) -> &'static str {
    match event {
        PresentationEvent::LifecycleChanged { .. } => "lifecycle_changed",
        PresentationEvent::DeviceAdded { .. } => "device_added",
        PresentationEvent::DeviceStateChanged { .. } => "device_state_changed",
        PresentationEvent::SyncEligibilityChanged { .. } => "sync_eligibility_changed",
        PresentationEvent::AddressesChanged { .. } => "addresses_changed",
        PresentationEvent::AddressSelected { .. } => "address_selected",
        PresentationEvent::KeepAlive { .. } => "keep_alive",
        PresentationEvent::LogAppended { .. } => "log_appended",
        PresentationEvent::LogTabHidden => "log_tab_hidden",
        PresentationEvent::VisibilityChanged { .. } => "visibility_changed",
        PresentationEvent::LagValueChanged { .. } => "lag_value_changed",
        PresentationEvent::PreferencesChanged { .. } => "preferences_changed",
        PresentationEvent::RecordingDevicesChanged { .. } => "recording_devices_changed",
    }
}

fn event_detail(event: &PresentationEvent) -> String {
    match event {
        PresentationEvent::LifecycleChanged { lifecycle } => lifecycle.to_string(),
        PresentationEvent::DeviceAdded {
            device,
            position,
            name_collision,
        } => {
            let collision = if *name_collision { " (duplicate name)" } else { "" };
            format!("{} [{}] at {position}{collision}", device.name, device.id)
        }
        PresentationEvent::DeviceStateChanged { device } => {
            format!("{} -> {}", device.name, device.state)
        }
        PresentationEvent::SyncEligibilityChanged { eligible } => format!("eligible={eligible}"),
        PresentationEvent::AddressesChanged {
            snapshot,
            selection,
        } => {
            let selected = selection.map_or_else(|| "-".to_owned(), |ip| ip.to_string());
            format!("{} tracked, selected {selected}", snapshot.len())
        }
        PresentationEvent::AddressSelected { address } => address.to_string(),
        PresentationEvent::KeepAlive { label, .. } => label.clone(),
        PresentationEvent::LogAppended { message } => message.clone(),
        PresentationEvent::LogTabHidden => String::new(),
        PresentationEvent::VisibilityChanged { visible } => format!("visible={visible}"),
        PresentationEvent::LagValueChanged { value } => value.to_string(),
        PresentationEvent::PreferencesChanged { preferences } => format!(
            "lag={} auto_restart={} auto_start={} hooks={}",
            preferences.lag_value,
            preferences.auto_restart,
            preferences.auto_start_devices,
            preferences.use_keyboard_shortcuts
        ),
        PresentationEvent::RecordingDevicesChanged { devices, selected } => format!(
            "{} listed, selected {}",
            devices.len(),
            selected.as_ref().map_or("-", |d| d.name.as_str())
        ),
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
