//! Storage infrastructure: files adbwifi reads and writes.
//!
//! - **`registry`** – `FileDeviceRegistry`, the TOML-backed `DeviceRegistry`
//!   stored in the platform data directory.
//! - **`config`** – `AppConfig`, loaded from the platform config directory,
//!   with defaults for every field so a missing file is a valid first run.

pub mod config;
pub mod registry;
