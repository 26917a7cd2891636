//! Scripted bridge for tests.
//!
//! Lets tests describe the devices a bridge would see without an `adb`
//! binary or a phone, and records every call made against it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::bridge::{BridgeClient, BridgeError};

/// One call received by a [`ScriptedBridge`], with its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    ListUsbDevices,
    GetModel(String),
    EnableNetworkMode(String),
    GetNetworkAddress(String),
    Connect(String),
    Disconnect(String),
    IsReachable(String),
}

#[derive(Debug, Default)]
struct Script {
    /// Attached serials in listing order, with their model.
    usb: Vec<(String, String)>,
    addresses: HashMap<String, Option<String>>,
    reachable: HashSet<String>,
    fail_enable: HashSet<String>,
    fail_connect: HashSet<String>,
    fail_disconnect: HashSet<String>,
    calls: Vec<BridgeCall>,
}

/// A [`BridgeClient`] whose replies are configured up front.
///
/// - `connect` succeeds with `"connected to A"` and marks `A` reachable,
///   unless `A` was passed to [`fail_connect`](Self::fail_connect).
/// - `disconnect` succeeds with `"disconnected A"` and marks `A`
///   unreachable, unless `A` was passed to
///   [`fail_disconnect`](Self::fail_disconnect).
/// - `get_network_address` returns `None` for serials with no scripted
///   address.
/// - `get_model` fails for serials that were never added.
#[derive(Clone, Default)]
pub struct ScriptedBridge {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attached device.  Network serials (`a.b.c.d:port`) may be
    /// added too; they show up in the listing like real `adb` does.
    pub fn with_usb_device(self, serial: &str, model: &str) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .usb
            .push((serial.to_string(), model.to_string()));
        self
    }

    /// Sets what the address query for `serial` reports.
    pub fn with_network_address(self, serial: &str, address: Option<&str>) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .addresses
            .insert(serial.to_string(), address.map(str::to_string));
        self
    }

    /// Marks `address` as already listed by the bridge.
    pub fn with_reachable(self, address: &str) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .reachable
            .insert(address.to_string());
        self
    }

    /// Makes `enable_network_mode(serial)` fail.
    pub fn fail_enable(self, serial: &str) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .fail_enable
            .insert(serial.to_string());
        self
    }

    /// Makes `connect(address)` fail with a refusal reply.
    pub fn fail_connect(self, address: &str) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .fail_connect
            .insert(address.to_string());
        self
    }

    /// Makes `disconnect(address)` fail.
    pub fn fail_disconnect(self, address: &str) -> Self {
        self.script
            .lock()
            .expect("lock poisoned")
            .fail_disconnect
            .insert(address.to_string());
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.script.lock().expect("lock poisoned").calls.clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.script.lock().expect("lock poisoned").calls.len()
    }

    fn record(&self, call: BridgeCall) -> std::sync::MutexGuard<'_, Script> {
        let mut script = self.script.lock().expect("lock poisoned");
        script.calls.push(call);
        script
    }
}

fn rejected(command: String, message: String) -> BridgeError {
    BridgeError::Rejected { command, message }
}

#[async_trait]
impl BridgeClient for ScriptedBridge {
    async fn list_usb_devices(&self) -> Result<Vec<String>, BridgeError> {
        let script = self.record(BridgeCall::ListUsbDevices);
        Ok(script.usb.iter().map(|(serial, _)| serial.clone()).collect())
    }

    async fn get_model(&self, serial: &str) -> Result<String, BridgeError> {
        let script = self.record(BridgeCall::GetModel(serial.to_string()));
        script
            .usb
            .iter()
            .find(|(s, _)| s == serial)
            .map(|(_, model)| model.clone())
            .ok_or_else(|| {
                rejected(
                    format!("adb -s {serial} shell getprop ro.product.model"),
                    format!("error: device '{serial}' not found"),
                )
            })
    }

    async fn enable_network_mode(&self, serial: &str) -> Result<(), BridgeError> {
        let script = self.record(BridgeCall::EnableNetworkMode(serial.to_string()));
        if script.fail_enable.contains(serial) {
            return Err(rejected(
                format!("adb -s {serial} tcpip 5555"),
                format!("error: device '{serial}' not found"),
            ));
        }
        Ok(())
    }

    async fn get_network_address(&self, serial: &str) -> Result<Option<String>, BridgeError> {
        let script = self.record(BridgeCall::GetNetworkAddress(serial.to_string()));
        Ok(script.addresses.get(serial).cloned().flatten())
    }

    async fn connect(&self, address: &str) -> Result<String, BridgeError> {
        let mut script = self.record(BridgeCall::Connect(address.to_string()));
        if script.fail_connect.contains(address) {
            return Err(rejected(
                format!("adb connect {address}"),
                format!("failed to connect to '{address}': Connection refused"),
            ));
        }
        script.reachable.insert(address.to_string());
        Ok(format!("connected to {address}"))
    }

    async fn disconnect(&self, address: &str) -> Result<String, BridgeError> {
        let mut script = self.record(BridgeCall::Disconnect(address.to_string()));
        if script.fail_disconnect.contains(address) {
            return Err(rejected(
                format!("adb disconnect {address}"),
                format!("error: no such device '{address}'"),
            ));
        }
        script.reachable.remove(address);
        Ok(format!("disconnected {address}"))
    }

    async fn is_reachable(&self, address: &str) -> bool {
        let script = self.record(BridgeCall::IsReachable(address.to_string()));
        script.reachable.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_bridge_lists_devices_in_insertion_order() {
        // Arrange
        let bridge = ScriptedBridge::new()
            .with_usb_device("B", "Model B")
            .with_usb_device("A", "Model A");

        // Act
        let serials = bridge.list_usb_devices().await.unwrap();

        // Assert
        assert_eq!(serials, vec!["B", "A"]);
        assert_eq!(bridge.calls(), vec![BridgeCall::ListUsbDevices]);
    }

    #[tokio::test]
    async fn test_scripted_bridge_connect_makes_address_reachable() {
        let bridge = ScriptedBridge::new();
        assert!(!bridge.is_reachable("10.0.0.2:5555").await);

        let status = bridge.connect("10.0.0.2:5555").await.unwrap();

        assert_eq!(status, "connected to 10.0.0.2:5555");
        assert!(bridge.is_reachable("10.0.0.2:5555").await);
    }

    #[tokio::test]
    async fn test_scripted_bridge_disconnect_makes_address_unreachable() {
        let bridge = ScriptedBridge::new().with_reachable("10.0.0.2:5555");

        bridge.disconnect("10.0.0.2:5555").await.unwrap();

        assert!(!bridge.is_reachable("10.0.0.2:5555").await);
    }

    #[tokio::test]
    async fn test_scripted_bridge_failures_are_rejections_with_bridge_text() {
        let bridge = ScriptedBridge::new()
            .fail_connect("10.0.0.2:5555")
            .fail_enable("ABC123");

        let connect = bridge.connect("10.0.0.2:5555").await.unwrap_err();
        let enable = bridge.enable_network_mode("ABC123").await.unwrap_err();

        assert_eq!(
            connect.to_string(),
            "failed to connect to '10.0.0.2:5555': Connection refused"
        );
        assert!(matches!(enable, BridgeError::Rejected { .. }));
        assert!(!bridge.is_reachable("10.0.0.2:5555").await);
    }

    #[tokio::test]
    async fn test_scripted_bridge_unscripted_address_is_absent() {
        let bridge = ScriptedBridge::new().with_network_address("A", Some("10.0.0.1:5555"));

        assert_eq!(
            bridge.get_network_address("A").await.unwrap().as_deref(),
            Some("10.0.0.1:5555")
        );
        assert_eq!(bridge.get_network_address("B").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scripted_bridge_clones_share_recorded_calls() {
        let bridge = ScriptedBridge::new();
        let handle = bridge.clone();

        bridge.disconnect("10.0.0.1:5555").await.unwrap();

        assert_eq!(
            handle.calls(),
            vec![BridgeCall::Disconnect("10.0.0.1:5555".to_string())]
        );
    }
}
