//! Device records: what the registry persists and what discovery observes.
//!
//! # Device lifecycle
//!
//! ```text
//! USB cable ──► UsbDeviceObservation ──connect_usb──► SavedDevice ──connect_saved──► network session
//!                                                          │
//!                                                   remove / clear
//! ```
//!
//! A [`UsbDeviceObservation`] only lives for the duration of one discovery
//! call.  A [`SavedDevice`] is created once a USB device has been switched to
//! network mode and its address resolved; it is then read on every reconnect.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::output::address::is_network_serial;

/// Suffix appended to a saved device's label when it is listed next to live
/// USB devices.
pub const SAVED_MARKER: &str = "[saved]";

/// Human-readable identity of a device: `"<model> (<serial>)"`.
///
/// When the model is unknown or blank the label is just the serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabel {
    model: Option<String>,
    serial: String,
}

impl DeviceLabel {
    /// Builds a label from a model name and serial.  The model is trimmed;
    /// an empty model is treated as unknown.
    pub fn new(model: &str, serial: impl Into<String>) -> Self {
        let model = model.trim();
        Self {
            model: (!model.is_empty()).then(|| model.to_string()),
            serial: serial.into(),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{model} ({})", self.serial),
            None => f.write_str(&self.serial),
        }
    }
}

/// A registry entry linking a device label to its last-known network address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDevice {
    /// Unique key within the registry.
    pub label: String,
    /// USB serial the device was first connected through.  Older records
    /// that only carry `label` and `address` load with an empty serial.
    #[serde(default)]
    pub serial: String,
    /// `host:port` of the device's network-mode listener.
    pub address: String,
}

impl SavedDevice {
    pub fn new(label: &DeviceLabel, address: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            serial: label.serial().to_string(),
            address: address.into(),
        }
    }

    /// The label with the saved marker, e.g. `"Pixel 7 (ABC123) [saved]"`.
    pub fn display_name(&self) -> String {
        format!("{} {SAVED_MARKER}", self.label)
    }

}

/// Recovers the label from a name as printed by
/// [`SavedDevice::display_name`].  Names without the marker are returned
/// trimmed but otherwise unchanged.
pub fn strip_saved_marker(name: &str) -> &str {
    let name = name.trim();
    name.strip_suffix(SAVED_MARKER)
        .map(str::trim_end)
        .unwrap_or(name)
}

/// A physically attached device as reported by one bridge listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceObservation {
    pub serial: String,
    pub model: String,
}

impl UsbDeviceObservation {
    pub fn new(serial: impl Into<String>, model: &str) -> Self {
        Self {
            serial: serial.into(),
            model: model.trim().to_string(),
        }
    }

    pub fn label(&self) -> DeviceLabel {
        DeviceLabel::new(&self.model, self.serial.clone())
    }

    /// `true` when the serial is a `host:port` endpoint, meaning the bridge
    /// already reaches this device over the network.
    pub fn is_network_connected(&self) -> bool {
        is_network_serial(&self.serial)
    }
}

/// Something the user can pick to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// Reconnect over the network using the stored address.
    Saved(SavedDevice),
    /// Switch a USB-attached device to network mode first.
    Usb(UsbDeviceObservation),
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectTarget::Saved(device) => f.write_str(&device.display_name()),
            ConnectTarget::Usb(observation) => write!(f, "{}", observation.label()),
        }
    }
}

/// A saved device together with its live connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDeviceStatus {
    pub device: SavedDevice,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_with_model_wraps_serial_in_parentheses() {
        let label = DeviceLabel::new("Pixel 7", "ABC123");
        assert_eq!(label.to_string(), "Pixel 7 (ABC123)");
    }

    #[test]
    fn test_label_trims_model_whitespace() {
        let label = DeviceLabel::new("  SM-G991B\r\n", "R58M81XYZ");
        assert_eq!(label.to_string(), "SM-G991B (R58M81XYZ)");
        assert_eq!(label.model(), Some("SM-G991B"));
    }

    #[test]
    fn test_label_with_blank_model_falls_back_to_serial() {
        let label = DeviceLabel::new("   ", "ABC123");
        assert_eq!(label.to_string(), "ABC123");
        assert_eq!(label.model(), None);
    }

    #[test]
    fn test_saved_device_carries_serial_from_label() {
        let device = SavedDevice::new(&DeviceLabel::new("Pixel 7", "ABC123"), "192.168.1.20:5555");
        assert_eq!(device.label, "Pixel 7 (ABC123)");
        assert_eq!(device.serial, "ABC123");
        assert_eq!(device.address, "192.168.1.20:5555");
    }

    #[test]
    fn test_saved_device_display_name_appends_marker() {
        let device = SavedDevice::new(&DeviceLabel::new("Pixel 7", "ABC123"), "10.0.0.2:5555");
        assert_eq!(device.display_name(), "Pixel 7 (ABC123) [saved]");
    }

    #[test]
    fn test_strip_saved_marker_reverses_display_name() {
        let device = SavedDevice::new(&DeviceLabel::new("Pixel 7", "ABC123"), "10.0.0.2:5555");
        assert_eq!(strip_saved_marker(&device.display_name()), "Pixel 7 (ABC123)");
    }

    #[test]
    fn test_strip_saved_marker_leaves_bare_label_alone() {
        assert_eq!(strip_saved_marker("Pixel 7 (ABC123)"), "Pixel 7 (ABC123)");
        assert_eq!(strip_saved_marker("  ABC123 \n"), "ABC123");
    }

    #[test]
    fn test_observation_with_network_serial_is_network_connected() {
        let obs = UsbDeviceObservation::new("192.168.1.5:5555", "Pixel 7");
        assert!(obs.is_network_connected());
    }

    #[test]
    fn test_observation_with_usb_serial_is_not_network_connected() {
        let obs = UsbDeviceObservation::new("R58M81XYZ", "SM-G991B");
        assert!(!obs.is_network_connected());
    }

    #[test]
    fn test_connect_target_display_distinguishes_saved_and_usb() {
        let saved = ConnectTarget::Saved(SavedDevice::new(
            &DeviceLabel::new("Pixel 7", "ABC123"),
            "10.0.0.2:5555",
        ));
        let usb = ConnectTarget::Usb(UsbDeviceObservation::new("R58M81XYZ", "SM-G991B"));
        assert_eq!(saved.to_string(), "Pixel 7 (ABC123) [saved]");
        assert_eq!(usb.to_string(), "SM-G991B (R58M81XYZ)");
    }
}
