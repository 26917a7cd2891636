//! `adb` process adapter.
//!
//! Every [`BridgeClient`] call spawns one `adb` child process, captures its
//! output, and interprets it with the parsers from `adbwifi_core`.  Each
//! invocation is bounded by `command_timeout`; a child that overruns it is
//! killed when its future is dropped.
//!
//! | Operation             | Invocation                                        |
//! |-----------------------|---------------------------------------------------|
//! | `list_usb_devices`    | `adb devices`                                     |
//! | `get_model`           | `adb -s S shell getprop ro.product.model`         |
//! | `enable_network_mode` | `adb -s S tcpip <port>`                           |
//! | `get_network_address` | `adb -s S shell ip -f inet addr show <interface>` |
//! | `connect`             | `adb connect A`                                   |
//! | `disconnect`          | `adb disconnect A`                                |
//! | `is_reachable`        | `adb devices`                                     |

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use adbwifi_core::{
    attached_serials, classify_reply, network_address, parse_device_list, parse_inet_address,
    BridgeReply, DeviceState,
};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::application::bridge::{BridgeClient, BridgeError};

pub mod mock;

/// How to reach and drive the `adb` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbSettings {
    pub adb_path: PathBuf,
    pub tcpip_port: u16,
    pub network_interface: String,
    pub command_timeout: Duration,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            tcpip_port: 5555,
            network_interface: "wlan0".to_string(),
            command_timeout: Duration::from_secs(10),
        }
    }
}

/// [`BridgeClient`] backed by the `adb` command line tool.
pub struct AdbBridge {
    settings: AdbSettings,
}

impl AdbBridge {
    pub fn new(settings: AdbSettings) -> Self {
        Self { settings }
    }

    fn program(&self) -> String {
        self.settings.adb_path.display().to_string()
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program().as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs `adb <args>` and returns stdout, requiring a zero exit status.
    async fn run(&self, args: &[&str]) -> Result<String, BridgeError> {
        let command = self.describe(args);
        debug!("running {command}");

        let mut cmd = Command::new(&self.settings.adb_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.settings.command_timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| BridgeError::Spawn {
                program: self.program(),
                source,
            })?,
            Err(_) => {
                return Err(BridgeError::Timeout {
                    command,
                    after: self.settings.command_timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let text = if stderr.is_empty() {
                stdout.trim().to_string()
            } else {
                stderr
            };
            return Err(BridgeError::NonZeroExit {
                command,
                code: output.status.code(),
                output: text,
            });
        }
        Ok(stdout)
    }

    /// Runs a command whose reply text decides success (`connect`, `disconnect`).
    ///
    /// Older daemons exit 0 on failure, newer ones exit 1; either way a
    /// failure reply is reported as [`BridgeError::Rejected`] with its text.
    async fn run_reply(&self, args: &[&str]) -> Result<String, BridgeError> {
        let stdout = match self.run(args).await {
            Ok(stdout) => stdout,
            Err(BridgeError::NonZeroExit { output, .. })
                if matches!(classify_reply(&output), BridgeReply::Rejected(_)) =>
            {
                output
            }
            Err(e) => return Err(e),
        };
        match classify_reply(&stdout) {
            BridgeReply::Accepted(text) => Ok(text),
            BridgeReply::Rejected(message) => Err(BridgeError::Rejected {
                command: self.describe(args),
                message,
            }),
        }
    }
}

#[async_trait]
impl BridgeClient for AdbBridge {
    async fn list_usb_devices(&self) -> Result<Vec<String>, BridgeError> {
        let stdout = self.run(&["devices"]).await?;
        Ok(attached_serials(&stdout))
    }

    async fn get_model(&self, serial: &str) -> Result<String, BridgeError> {
        let stdout = self
            .run(&["-s", serial, "shell", "getprop", "ro.product.model"])
            .await?;
        Ok(stdout.trim().to_string())
    }

    async fn enable_network_mode(&self, serial: &str) -> Result<(), BridgeError> {
        let port = self.settings.tcpip_port.to_string();
        self.run(&["-s", serial, "tcpip", &port]).await?;
        Ok(())
    }

    async fn get_network_address(&self, serial: &str) -> Result<Option<String>, BridgeError> {
        let interface = self.settings.network_interface.as_str();
        let result = self
            .run(&["-s", serial, "shell", "ip", "-f", "inet", "addr", "show", interface])
            .await;

        let stdout = match result {
            Ok(stdout) => stdout,
            // Newer daemons propagate the shell's exit status; a missing
            // interface is "no address", not a bridge failure.
            Err(BridgeError::NonZeroExit { output, .. }) if output.contains("does not exist") => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        Ok(parse_inet_address(&stdout).map(|ip| network_address(ip, self.settings.tcpip_port)))
    }

    async fn connect(&self, address: &str) -> Result<String, BridgeError> {
        self.run_reply(&["connect", address]).await
    }

    async fn disconnect(&self, address: &str) -> Result<String, BridgeError> {
        self.run_reply(&["disconnect", address]).await
    }

    async fn is_reachable(&self, address: &str) -> bool {
        match self.run(&["devices"]).await {
            Ok(stdout) => parse_device_list(&stdout)
                .iter()
                .any(|d| d.serial == address && d.state == DeviceState::Device),
            Err(e) => {
                debug!("treating {address} as unreachable: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_joins_program_and_args() {
        let bridge = AdbBridge::new(AdbSettings::default());
        assert_eq!(
            bridge.describe(&["-s", "ABC123", "tcpip", "5555"]),
            "adb -s ABC123 tcpip 5555"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_failure() {
        let bridge = AdbBridge::new(AdbSettings {
            adb_path: PathBuf::from("/nonexistent/path/to/adb"),
            ..AdbSettings::default()
        });

        let err = bridge.list_usb_devices().await.unwrap_err();

        assert!(matches!(err, BridgeError::Spawn { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unreachable_not_an_error() {
        let bridge = AdbBridge::new(AdbSettings {
            adb_path: PathBuf::from("/nonexistent/path/to/adb"),
            ..AdbSettings::default()
        });
        assert!(!bridge.is_reachable("10.0.0.2:5555").await);
    }

    /// Tests against a shell script standing in for `adb`.
    #[cfg(unix)]
    mod fake_adb {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_adb(dir: &tempfile::TempDir, body: &str) -> AdbBridge {
            let path = dir.path().join("adb");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            AdbBridge::new(AdbSettings {
                adb_path: path,
                command_timeout: Duration::from_secs(5),
                ..AdbSettings::default()
            })
        }

        #[tokio::test]
        async fn test_list_usb_devices_parses_listing() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(
                &dir,
                r#"printf 'List of devices attached\nR58M81XYZ\tdevice\n192.168.1.5:5555\tdevice\nXYZ\tunauthorized\n'"#,
            );

            let serials = bridge.list_usb_devices().await.unwrap();

            assert_eq!(serials, vec!["R58M81XYZ", "192.168.1.5:5555"]);
        }

        #[tokio::test]
        async fn test_get_network_address_appends_tcpip_port() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(
                &dir,
                r#"echo "    inet 192.168.1.20/24 brd 192.168.1.255 scope global wlan0""#,
            );

            let address = bridge.get_network_address("ABC123").await.unwrap();

            assert_eq!(address.as_deref(), Some("192.168.1.20:5555"));
        }

        #[tokio::test]
        async fn test_get_network_address_missing_interface_is_absent() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(&dir, r#"echo 'Device "wlan0" does not exist.' >&2; exit 1"#);

            let address = bridge.get_network_address("ABC123").await.unwrap();

            assert_eq!(address, None);
        }

        #[tokio::test]
        async fn test_connect_failure_text_with_zero_exit_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(&dir, r#"echo "failed to connect to '$2': Connection refused""#);

            let err = bridge.connect("10.0.0.2:5555").await.unwrap_err();

            assert_eq!(
                err.to_string(),
                "failed to connect to '10.0.0.2:5555': Connection refused"
            );
        }

        #[tokio::test]
        async fn test_connect_failure_with_non_zero_exit_keeps_reply_verbatim() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(
                &dir,
                r#"echo "failed to connect to '$2': Connection refused"; exit 1"#,
            );

            let err = bridge.connect("10.0.0.2:5555").await.unwrap_err();

            assert!(matches!(err, BridgeError::Rejected { .. }), "got {err:?}");
            assert_eq!(
                err.to_string(),
                "failed to connect to '10.0.0.2:5555': Connection refused"
            );
        }

        #[tokio::test]
        async fn test_disconnect_unclassified_non_zero_exit_stays_exit_error() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(&dir, "echo 'Segmentation fault' >&2; exit 139");

            let err = bridge.disconnect("10.0.0.2:5555").await.unwrap_err();

            assert!(matches!(err, BridgeError::NonZeroExit { code: Some(139), .. }), "got {err:?}");
        }

        #[tokio::test]
        async fn test_connect_success_returns_reply() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(&dir, r#"echo "connected to $2""#);

            let status = bridge.connect("10.0.0.2:5555").await.unwrap();

            assert_eq!(status, "connected to 10.0.0.2:5555");
        }

        #[tokio::test]
        async fn test_non_zero_exit_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(&dir, r#"echo "error: device 'ABC123' not found" >&2; exit 1"#);

            let err = bridge.enable_network_mode("ABC123").await.unwrap_err();

            match err {
                BridgeError::NonZeroExit { code, output, .. } => {
                    assert_eq!(code, Some(1));
                    assert_eq!(output, "error: device 'ABC123' not found");
                }
                other => panic!("expected NonZeroExit, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_slow_command_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let mut bridge = fake_adb(&dir, "sleep 5");
            bridge.settings.command_timeout = Duration::from_millis(100);

            let err = bridge.list_usb_devices().await.unwrap_err();

            assert!(matches!(err, BridgeError::Timeout { .. }), "got {err:?}");
        }

        #[tokio::test]
        async fn test_is_reachable_requires_device_state() {
            let dir = tempfile::tempdir().unwrap();
            let bridge = fake_adb(
                &dir,
                r#"printf 'List of devices attached\n10.0.0.2:5555\tdevice\n10.0.0.3:5555\toffline\n'"#,
            );

            assert!(bridge.is_reachable("10.0.0.2:5555").await);
            assert!(!bridge.is_reachable("10.0.0.3:5555").await);
            assert!(!bridge.is_reachable("10.0.0.4:5555").await);
        }
    }
}
