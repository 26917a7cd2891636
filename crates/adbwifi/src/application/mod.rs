//! Application layer for adbwifi.
//!
//! Use cases here depend on abstractions (traits) rather than concrete
//! implementations, so the `adb` binary and the registry file can be swapped
//! for test doubles without touching this code.
//!
//! # Sub-modules
//!
//! - **`bridge`** – The `BridgeClient` capability: list USB devices, resolve
//!   models, enable network mode, query addresses, connect, disconnect.
//!
//! - **`registry`** – The `DeviceRegistry` contract for the persisted list of
//!   saved devices.
//!
//! - **`orchestrator`** – `ConnectionOrchestrator`, which drives discovery,
//!   the USB-to-network connect sequence, reconnects, and bulk teardown.

pub mod bridge;
pub mod orchestrator;
pub mod registry;
