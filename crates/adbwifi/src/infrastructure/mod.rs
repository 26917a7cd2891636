//! Infrastructure layer for adbwifi.
//!
//! Contains OS-facing adapters: the `adb` child-process bridge and the files
//! the tool persists.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `adbwifi_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`bridge`** – `AdbBridge`, the `BridgeClient` implementation that spawns
//!   the `adb` binary, and `ScriptedBridge`, a recording in-memory stand-in.
//!
//! - **`storage`** – The TOML device registry file and the TOML configuration
//!   file.

pub mod bridge;
pub mod storage;
