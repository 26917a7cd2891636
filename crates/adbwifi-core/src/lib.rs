//! # adbwifi-core
//!
//! Shared foundation for adbwifi: the device model and the parsers that turn
//! the bridge tool's text output into typed values.
//!
//! This crate has zero dependencies on processes, the file system, or any
//! async runtime.  Everything in it can be tested with plain string inputs.
//!
//! - **`domain`** – `SavedDevice`, `UsbDeviceObservation`, `DeviceLabel`,
//!   `ConnectTarget` and `SavedDeviceStatus`.
//!
//! - **`output`** – Parsers for `adb devices`, `ip addr show` and the
//!   free-text replies of `adb connect` / `adb disconnect`, plus the
//!   network-serial pattern used to keep network-mode devices out of the
//!   USB listing.

pub mod domain;
pub mod output;

// Re-export the most-used types at the crate root so callers can write
// `adbwifi_core::SavedDevice` instead of `adbwifi_core::domain::device::SavedDevice`.
pub use domain::device::{
    strip_saved_marker, ConnectTarget, DeviceLabel, SavedDevice, SavedDeviceStatus,
    UsbDeviceObservation, SAVED_MARKER,
};
pub use output::address::{is_network_serial, network_address, parse_inet_address};
pub use output::devices::{attached_serials, parse_device_list, DeviceState, ListedDevice};
pub use output::reply::{classify_reply, BridgeReply};
