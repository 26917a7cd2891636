//! adbwifi library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Layers
//!
//! - **`application`** – The `DeviceRegistry` and `BridgeClient` traits and the
//!   `ConnectionOrchestrator` that sequences them.  No process spawning and no
//!   file access happen here.
//! - **`infrastructure`** – The `adb` process adapter, the TOML registry file,
//!   the configuration file, and a scripted bridge for tests.

pub mod application;
pub mod infrastructure;
