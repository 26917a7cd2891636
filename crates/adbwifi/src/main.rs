//! adbwifi command line entry point.
//!
//! Wires the `adb` bridge, the device registry file, and the configuration
//! file into a [`ConnectionOrchestrator`] and runs one subcommand.
//!
//! # Usage
//!
//! ```text
//! adbwifi [OPTIONS] <COMMAND>
//!
//! Commands:
//!   devices               List saved devices (with status) and USB devices
//!   connect <LABEL>       Reconnect a saved device
//!   connect-usb <SERIAL>  Switch a USB device to network mode and save it
//!   disconnect <ADDRESS>  Disconnect one network device
//!   forget <LABEL>        Remove one saved device
//!   forget-all            Disconnect every saved device and clear the registry
//!   config [--write]      Print (or save) the effective configuration
//!
//! Options:
//!   --config <PATH>       Config file      [env: ADBWIFI_CONFIG]
//!   --registry <PATH>     Device registry  [env: ADBWIFI_REGISTRY]
//!   --adb <PATH>          adb binary       [env: ADBWIFI_ADB]
//!   --settle-ms <MS>      Wait after enabling network mode
//! ```
//!
//! CLI flags take precedence over the config file.  The log level comes from
//! `RUST_LOG`, falling back to `general.log_level`.
//!
//! Labels may be given as `devices` prints them; a trailing `[saved]` is
//! ignored.  Ctrl+C during `connect-usb` aborts it with a non-zero exit; all
//! other commands keep the default signal behaviour.

use std::fmt::Write as _;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use adbwifi::application::orchestrator::{ConnectionOrchestrator, TeardownReport};
use adbwifi::infrastructure::bridge::AdbBridge;
use adbwifi::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, AppConfig,
};
use adbwifi::infrastructure::storage::registry::FileDeviceRegistry;
use adbwifi_core::{strip_saved_marker, SavedDeviceStatus, UsbDeviceObservation};

const NO_USB_DEVICES: &str = "No USB devices found.\n\
    To establish the first wireless connection please plug in your device via USB.";
const CONNECTED_OVER_WIFI: &str = "Your device is now connected over Wi-Fi.\n\
    You can safely unplug the USB cable.\n\
    Next time you can connect without USB.";
const ALL_DEVICES_REMOVED: &str = "All saved devices removed.";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Connect to Android devices over Wi-Fi.
///
/// Plug a device in once, run `connect-usb`, and reconnect by label from then
/// on without the cable.
#[derive(Debug, Parser)]
#[command(name = "adbwifi", version)]
struct Cli {
    /// Configuration file.  Defaults to the platform config directory.
    #[arg(long, env = "ADBWIFI_CONFIG")]
    config: Option<PathBuf>,

    /// Device registry file.  Overrides `storage.registry_path`.
    #[arg(long, env = "ADBWIFI_REGISTRY")]
    registry: Option<PathBuf>,

    /// Path to the `adb` binary.  Overrides `bridge.adb_path`.
    #[arg(long, env = "ADBWIFI_ADB")]
    adb: Option<PathBuf>,

    /// Milliseconds to wait after enabling network mode.  Overrides
    /// `connect.settle_delay_ms`.
    #[arg(long)]
    settle_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// List saved devices with their connection status, then USB devices.
    Devices,
    /// Reconnect a saved device by label.
    Connect { label: String },
    /// Switch a USB device to network mode, connect, and save it.
    ConnectUsb { serial: String },
    /// Disconnect one network device.  The registry is not changed.
    Disconnect { address: String },
    /// Disconnect and remove one saved device.
    Forget { label: String },
    /// Disconnect every saved device and clear the registry.
    ForgetAll,
    /// Print the effective configuration.
    Config {
        /// Save it to the config file.
        #[arg(long)]
        write: bool,
    },
}

impl Cli {
    /// Applies command line overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(path) = &self.registry {
            config.storage.registry_path = Some(path.clone());
        }
        if let Some(adb) = &self.adb {
            config.bridge.adb_path = adb.display().to_string();
        }
        if let Some(ms) = self.settle_ms {
            config.connect.settle_delay_ms = ms;
        }
    }
}

// ── Output rendering ──────────────────────────────────────────────────────────

fn render_devices(saved: &[SavedDeviceStatus], usb: &[UsbDeviceObservation]) -> String {
    if saved.is_empty() && usb.is_empty() {
        return NO_USB_DEVICES.to_string();
    }

    let mut out = String::new();
    if !saved.is_empty() {
        out.push_str("Saved devices:\n");
        for status in saved {
            let state = if status.connected {
                "connected"
            } else {
                "disconnected"
            };
            let _ = writeln!(
                out,
                "  {}  {}  {state}",
                status.device.display_name(),
                status.device.address
            );
        }
    }
    if !usb.is_empty() {
        out.push_str("USB devices:\n");
        for observation in usb {
            let _ = writeln!(out, "  {}", observation.label());
        }
    }
    out.trim_end().to_string()
}

fn render_teardown(report: &TeardownReport) -> String {
    let mut out = ALL_DEVICES_REMOVED.to_string();
    if let Some(e) = &report.unreadable {
        let _ = write!(out, "\nThe saved device list could not be read and was reset: {e}");
    }
    if let Some(failure) = report.partial_failure() {
        let _ = write!(out, "\n{failure}");
    }
    out
}

// ── Cancellation ──────────────────────────────────────────────────────────────

/// Runs `operation` until it finishes or `cancel` fires.
///
/// The operation is polled first, so a cancellation it observes itself
/// (settle wait, address poll) surfaces as its own error.  Otherwise it is
/// dropped, which kills any `adb` child it is waiting on.
async fn until_cancelled<T, E>(
    operation: impl Future<Output = Result<T, E>>,
    cancel: &CancellationToken,
) -> anyhow::Result<T>
where
    E: Into<anyhow::Error>,
{
    tokio::select! {
        biased;
        result = operation => result.map_err(Into::into),
        _ = cancel.cancelled() => Err(anyhow::anyhow!("interrupted")),
    }
}

/// Cancels the returned token on the first Ctrl+C.
///
/// Installing the listener replaces the default SIGINT action for the rest
/// of the process, so only commands that handle the token call this.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, cancelling");
                cancel_on_signal.cancel();
            }
            Err(e) => warn!("failed to listen for Ctrl+C: {e}"),
        }
    });
    cancel
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    cli.apply_overrides(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry_path = config.registry_path()?;
    info!("using device registry {}", registry_path.display());
    let orchestrator = ConnectionOrchestrator::new(
        Arc::new(AdbBridge::new(config.adb_settings())),
        Arc::new(FileDeviceRegistry::new(registry_path)),
        config.orchestrator_config(),
    );

    match cli.command {
        Command::Devices => {
            let saved = orchestrator.saved_device_statuses().await?;
            let usb = orchestrator.discover_usb_devices().await?;
            println!("{}", render_devices(&saved, &usb));
        }
        Command::Connect { label } => {
            let result = orchestrator
                .connect_saved(strip_saved_marker(&label))
                .await?;
            println!("{}", result.status);
        }
        Command::ConnectUsb { serial } => {
            let cancel = cancel_on_ctrl_c();
            let result = until_cancelled(
                orchestrator.connect_usb_with_cancel(&serial, &cancel),
                &cancel,
            )
            .await?;
            println!("{}", result.status);
            println!("Saved as '{}'.", result.label);
            println!("{CONNECTED_OVER_WIFI}");
        }
        Command::Disconnect { address } => {
            println!("{}", orchestrator.disconnect(&address).await?);
        }
        Command::Forget { label } => {
            let device = orchestrator.forget(strip_saved_marker(&label)).await?;
            println!("Removed '{}' ({}).", device.label, device.address);
        }
        Command::ForgetAll => {
            let report = orchestrator.disconnect_all().await?;
            println!("{}", render_teardown(&report));
        }
        Command::Config { write } => {
            if write {
                save_config_to(&config_path, &config)
                    .with_context(|| format!("failed to write {}", config_path.display()))?;
                info!("wrote {}", config_path.display());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
