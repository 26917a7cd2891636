//! ConnectionOrchestrator: sequences bridge calls and registry updates.
//!
//! The orchestrator holds no state between calls.  Every operation re-reads
//! the registry and re-queries the bridge, so there is nothing to invalidate.
//!
//! # USB to network sequence
//!
//! ```text
//! get_model(serial)        (while the USB link is known to be up)
//!        │
//! enable_network_mode(serial)
//!        │
//!   settle wait            (configurable, cancellable)
//!        │
//! get_network_address ◄─┐  (bounded poll while the address is absent)
//!        │ None ────────┘──► IpUnavailable
//!        │ Some(address)
//! connect(address)
//!        │
//! registry.save(label, address)   (upsert by label or serial)
//! ```
//!
//! Step 1 is never rolled back.  If the address cannot be resolved or the
//! connect fails, the device stays in network mode; this is expected, and a
//! later `connect_usb` simply re-enables it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use adbwifi_core::{
    is_network_serial, ConnectTarget, DeviceLabel, SavedDevice, SavedDeviceStatus,
    UsbDeviceObservation,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::bridge::{BridgeClient, BridgeError};
use super::registry::{DeviceRegistry, StorageError};

/// Timing knobs for the connect sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Wait after enabling network mode before the first address query.
    pub settle_delay: Duration,
    /// Extra address queries made while the address is still absent.
    pub address_poll_attempts: u32,
    /// Wait between address queries.
    pub address_poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            address_poll_attempts: 2,
            address_poll_interval: Duration::from_millis(500),
        }
    }
}

/// The stage of an operation at which a bridge failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    ListDevices,
    EnableNetworkMode,
    SettleWait,
    QueryAddress,
    Disconnect,
}

impl fmt::Display for ConnectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectStep::ListDevices => "listing USB devices",
            ConnectStep::EnableNetworkMode => "enabling network mode",
            ConnectStep::SettleWait => "waiting for the network listener",
            ConnectStep::QueryAddress => "querying the device address",
            ConnectStep::Disconnect => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Error type for orchestrator operations.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no saved device labelled '{label}'")]
    DeviceNotFound { label: String },

    #[error("could not detect the IP address of {serial}; make sure Wi-Fi is on")]
    IpUnavailable { serial: String },

    /// The bridge's connect primitive failed; `source` carries its text.
    #[error("{source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: BridgeError,
    },

    #[error("{step} failed: {source}")]
    Bridge {
        step: ConnectStep,
        #[source]
        source: BridgeError,
    },

    #[error("cancelled while {step}")]
    Cancelled { step: ConnectStep },
}

/// Successful connect: the raw bridge status plus what it applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResult {
    pub label: String,
    pub address: String,
    /// The bridge's reply, e.g. `"connected to 192.168.1.20:5555"`.
    pub status: String,
}

/// One device whose disconnect failed during a bulk teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    pub label: String,
    pub address: String,
    pub error: BridgeError,
}

/// Informational summary of the devices a bulk teardown could not reach.
///
/// Never returned as an `Err`; the registry is cleared regardless.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{} of {total} saved devices could not be disconnected: {}", .addresses.len(), .addresses.join(", "))]
pub struct BulkTeardownPartialFailure {
    pub total: usize,
    pub addresses: Vec<String>,
}

/// Outcome of [`ConnectionOrchestrator::disconnect_all`].
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Every address a disconnect was attempted for, in registry order.
    pub attempted: Vec<String>,
    pub failures: Vec<TeardownFailure>,
    /// Set when the saved list could not be read.  No disconnects were
    /// attempted, but the registry was still reset.
    pub unreadable: Option<StorageError>,
}

impl TeardownReport {
    pub fn partial_failure(&self) -> Option<BulkTeardownPartialFailure> {
        if self.failures.is_empty() {
            return None;
        }
        Some(BulkTeardownPartialFailure {
            total: self.attempted.len(),
            addresses: self.failures.iter().map(|f| f.address.clone()).collect(),
        })
    }
}

/// Drives discovery, connect, and teardown against a bridge and a registry.
pub struct ConnectionOrchestrator {
    bridge: Arc<dyn BridgeClient>,
    registry: Arc<dyn DeviceRegistry>,
    config: OrchestratorConfig,
}

impl ConnectionOrchestrator {
    pub fn new(
        bridge: Arc<dyn BridgeClient>,
        registry: Arc<dyn DeviceRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            bridge,
            registry,
            config,
        }
    }

    /// Lists USB devices that are not already reachable over the network.
    ///
    /// Serials shaped like `a.b.c.d:port` are dropped before their model is
    /// resolved.  A model lookup failure does not drop the device; its label
    /// falls back to the serial.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Bridge`] if the device listing fails.
    pub async fn discover_usb_devices(&self) -> Result<Vec<UsbDeviceObservation>, ConnectError> {
        let serials = self
            .bridge
            .list_usb_devices()
            .await
            .map_err(|source| ConnectError::Bridge {
                step: ConnectStep::ListDevices,
                source,
            })?;

        let mut observations = Vec::with_capacity(serials.len());
        for serial in serials {
            if is_network_serial(&serial) {
                debug!("skipping {serial}: already connected over the network");
                continue;
            }
            let model = self.resolve_model(&serial).await;
            observations.push(UsbDeviceObservation::new(serial, &model));
        }
        Ok(observations)
    }

    /// Reconnects a saved device using its stored address.  Single attempt.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::DeviceNotFound`] if `label` is not saved; the bridge
    ///   is not called.
    /// - [`ConnectError::ConnectionFailed`] if the bridge refuses.
    pub async fn connect_saved(&self, label: &str) -> Result<ConnectResult, ConnectError> {
        let device = self
            .registry
            .find(label)?
            .ok_or_else(|| ConnectError::DeviceNotFound {
                label: label.to_string(),
            })?;

        let status = self.connect_address(&device.address).await?;
        info!("connected to {} at {}", device.label, device.address);
        Ok(ConnectResult {
            label: device.label,
            address: device.address,
            status,
        })
    }

    /// Switches a USB device to network mode, connects, and saves it.
    ///
    /// # Errors
    ///
    /// See [`ConnectionOrchestrator::connect_usb_with_cancel`].
    pub async fn connect_usb(&self, serial: &str) -> Result<ConnectResult, ConnectError> {
        self.connect_usb_with_cancel(serial, &CancellationToken::new())
            .await
    }

    /// [`connect_usb`](Self::connect_usb) with a token that aborts the settle
    /// wait and the address poll.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::Bridge`] with step `EnableNetworkMode` or `QueryAddress`.
    /// - [`ConnectError::Cancelled`] if `cancel` fires during a wait.
    /// - [`ConnectError::IpUnavailable`] if no address appears; nothing is saved.
    /// - [`ConnectError::ConnectionFailed`] if the bridge refuses the connect.
    /// - [`ConnectError::Storage`] if the device cannot be saved.
    pub async fn connect_usb_with_cancel(
        &self,
        serial: &str,
        cancel: &CancellationToken,
    ) -> Result<ConnectResult, ConnectError> {
        // `tcpip` restarts the device daemon and can drop the USB link, so
        // the model is read first.
        let model = self.resolve_model(serial).await;
        let label = DeviceLabel::new(&model, serial);

        info!("enabling network mode on {serial}");
        self.bridge
            .enable_network_mode(serial)
            .await
            .map_err(|source| ConnectError::Bridge {
                step: ConnectStep::EnableNetworkMode,
                source,
            })?;

        self.pause(self.config.settle_delay, ConnectStep::SettleWait, cancel)
            .await?;

        let address = self.wait_for_address(serial, cancel).await?;
        let status = self.connect_address(&address).await?;

        let device = SavedDevice::new(&label, address.clone());
        self.registry.save(device)?;

        info!("connected to {label} at {address} and saved it");
        Ok(ConnectResult {
            label: label.to_string(),
            address,
            status,
        })
    }

    /// Connects whichever kind of target the user picked.
    ///
    /// # Errors
    ///
    /// Same as [`connect_saved`](Self::connect_saved) or
    /// [`connect_usb`](Self::connect_usb).
    pub async fn connect(&self, target: &ConnectTarget) -> Result<ConnectResult, ConnectError> {
        match target {
            ConnectTarget::Saved(device) => self.connect_saved(&device.label).await,
            ConnectTarget::Usb(observation) => self.connect_usb(&observation.serial).await,
        }
    }

    /// Everything the user could connect to: saved devices first, then fresh
    /// USB devices.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Storage`] or a listing [`ConnectError::Bridge`].
    pub async fn list_targets(&self) -> Result<Vec<ConnectTarget>, ConnectError> {
        let saved = self.registry.list()?;
        let usb = self.discover_usb_devices().await?;
        Ok(saved
            .into_iter()
            .map(ConnectTarget::Saved)
            .chain(usb.into_iter().map(ConnectTarget::Usb))
            .collect())
    }

    /// Saved devices annotated with whether the bridge currently lists them.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Storage`] if the registry cannot be read.
    pub async fn saved_device_statuses(&self) -> Result<Vec<SavedDeviceStatus>, ConnectError> {
        let devices = self.registry.list()?;
        let mut statuses = Vec::with_capacity(devices.len());
        for device in devices {
            let connected = self.bridge.is_reachable(&device.address).await;
            statuses.push(SavedDeviceStatus { device, connected });
        }
        Ok(statuses)
    }

    /// Disconnects one network device.  The registry is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Bridge`] with step `Disconnect`.
    pub async fn disconnect(&self, address: &str) -> Result<String, ConnectError> {
        let status = self
            .bridge
            .disconnect(address)
            .await
            .map_err(|source| ConnectError::Bridge {
                step: ConnectStep::Disconnect,
                source,
            })?;
        info!("disconnected {address}");
        Ok(status)
    }

    /// Disconnects (best effort) and removes one saved device.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::DeviceNotFound`] if `label` is not saved, or
    /// [`ConnectError::Storage`].
    pub async fn forget(&self, label: &str) -> Result<SavedDevice, ConnectError> {
        let device = self
            .registry
            .find(label)?
            .ok_or_else(|| ConnectError::DeviceNotFound {
                label: label.to_string(),
            })?;

        if let Err(e) = self.bridge.disconnect(&device.address).await {
            warn!("ignoring disconnect failure for {}: {e}", device.address);
        }
        self.registry.remove(&device.label)?;
        info!("forgot {}", device.label);
        Ok(device)
    }

    /// Disconnects every saved device and clears the registry.
    ///
    /// Per-device bridge failures are collected in the report and never stop
    /// the loop or the clear.  An unreadable registry is reset as well; the
    /// read error is kept in [`TeardownReport::unreadable`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Storage`] if the registry cannot be cleared.
    pub async fn disconnect_all(&self) -> Result<TeardownReport, ConnectError> {
        let mut report = TeardownReport::default();
        let devices = match self.registry.list() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("resetting unreadable device registry: {e}");
                report.unreadable = Some(e);
                Vec::new()
            }
        };

        for device in devices {
            report.attempted.push(device.address.clone());
            if let Err(error) = self.bridge.disconnect(&device.address).await {
                warn!("ignoring disconnect failure for {}: {error}", device.address);
                report.failures.push(TeardownFailure {
                    label: device.label,
                    address: device.address,
                    error,
                });
            }
        }

        self.registry.clear()?;
        info!(
            "removed all saved devices ({} disconnected, {} failed)",
            report.attempted.len() - report.failures.len(),
            report.failures.len()
        );
        Ok(report)
    }

    async fn connect_address(&self, address: &str) -> Result<String, ConnectError> {
        self.bridge
            .connect(address)
            .await
            .map_err(|source| ConnectError::ConnectionFailed {
                address: address.to_string(),
                source,
            })
    }

    async fn resolve_model(&self, serial: &str) -> String {
        match self.bridge.get_model(serial).await {
            Ok(model) => model,
            Err(e) => {
                warn!("could not resolve model of {serial}, labelling by serial: {e}");
                String::new()
            }
        }
    }

    async fn wait_for_address(
        &self,
        serial: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ConnectError> {
        let attempts = self.config.address_poll_attempts + 1;
        for attempt in 1..=attempts {
            let address = self
                .bridge
                .get_network_address(serial)
                .await
                .map_err(|source| ConnectError::Bridge {
                    step: ConnectStep::QueryAddress,
                    source,
                })?;
            if let Some(address) = address {
                debug!("{serial} has address {address} (query {attempt}/{attempts})");
                return Ok(address);
            }
            if attempt < attempts {
                debug!("{serial} has no address yet (query {attempt}/{attempts})");
                self.pause(
                    self.config.address_poll_interval,
                    ConnectStep::QueryAddress,
                    cancel,
                )
                .await?;
            }
        }
        Err(ConnectError::IpUnavailable {
            serial: serial.to_string(),
        })
    }

    async fn pause(
        &self,
        duration: Duration,
        step: ConnectStep,
        cancel: &CancellationToken,
    ) -> Result<(), ConnectError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConnectError::Cancelled { step }),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
