//! The Bridge Client capability.
//!
//! A thin abstraction over the device-bridge command line tool.  The
//! production implementation ([`crate::infrastructure::bridge::AdbBridge`])
//! spawns `adb`; tests inject [`crate::infrastructure::bridge::mock::ScriptedBridge`]
//! or a `mockall` mock.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the bridge tool, or by the attempt to run it.
///
/// The `Display` output is meant to be shown to users verbatim.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge binary could not be started (missing, not executable).
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bridge exited unsuccessfully.  `output` is stderr, or stdout when
    /// stderr was empty.
    #[error("`{command}` exited with {}: {output}", describe_exit_code(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The bridge exited successfully but its reply reports a failure
    /// (`adb connect` does this for unreachable hosts).
    #[error("{message}")]
    Rejected { command: String, message: String },

    /// The bridge did not finish within the configured command timeout.
    #[error("`{command}` did not finish within {after:?}")]
    Timeout { command: String, after: Duration },
}

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Operations the orchestrator needs from the device bridge.
///
/// Every method maps to one bridge invocation.  Implementations must not
/// retry; the orchestrator owns all timing decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Serials of every attached device in the ready state, in bridge order.
    async fn list_usb_devices(&self) -> Result<Vec<String>, BridgeError>;

    /// Human-readable model name of `serial`.
    async fn get_model(&self, serial: &str) -> Result<String, BridgeError>;

    /// Restarts the device's bridge daemon listening on TCP.
    async fn enable_network_mode(&self, serial: &str) -> Result<(), BridgeError>;

    /// `host:port` the device listens on, or `None` when it has no address
    /// (Wi-Fi off, not associated).
    async fn get_network_address(&self, serial: &str) -> Result<Option<String>, BridgeError>;

    /// Connects to a network-mode device and returns the bridge's reply.
    async fn connect(&self, address: &str) -> Result<String, BridgeError>;

    /// Disconnects a network-mode device and returns the bridge's reply.
    async fn disconnect(&self, address: &str) -> Result<String, BridgeError>;

    /// `true` if `address` is currently listed as a ready device.
    async fn is_reachable(&self, address: &str) -> bool;
}
