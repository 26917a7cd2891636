//! Parser for the `adb devices` listing.
//!
//! ```text
//! * daemon not running; starting now at tcp:5037
//! * daemon started successfully
//! List of devices attached
//! R58M81XYZ	device
//! 192.168.1.5:5555	device
//! emulator-5554	offline
//! 0123456789ABCDEF	unauthorized
//! ```

/// Connection state column of one listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Authorised and ready for commands.
    Device,
    Offline,
    /// USB debugging prompt not yet accepted on the device.
    Unauthorized,
    Other(String),
}

impl DeviceState {
    fn parse(raw: &str) -> Self {
        match raw {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDevice {
    pub serial: String,
    pub state: DeviceState,
}

const LISTING_HEADER: &str = "List of devices attached";

/// Parses every row after the header.  Daemon start-up chatter (`* ...`) and
/// blank lines are skipped; rows without a state column are ignored.
pub fn parse_device_list(output: &str) -> Vec<ListedDevice> {
    let mut rows = output.lines().map(str::trim);
    // Without a header, treat the whole output as rows.
    let has_header = output.lines().any(|line| line.trim() == LISTING_HEADER);
    if has_header {
        for line in rows.by_ref() {
            if line == LISTING_HEADER {
                break;
            }
        }
    }

    rows.filter(|line| !line.is_empty() && !line.starts_with('*'))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let serial = columns.next()?;
            let state = columns.next()?;
            Some(ListedDevice {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}

/// Serials of every device in the `device` state, in listing order.
pub fn attached_serials(output: &str) -> Vec<String> {
    parse_device_list(output)
        .into_iter()
        .filter(|d| d.state == DeviceState::Device)
        .map(|d| d.serial)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
R58M81XYZ\tdevice
192.168.1.5:5555\tdevice
emulator-5554\toffline
0123456789ABCDEF\tunauthorized

";

    #[test]
    fn test_parse_device_list_reads_every_row_after_header() {
        let rows = parse_device_list(LISTING);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].serial, "R58M81XYZ");
        assert_eq!(rows[0].state, DeviceState::Device);
        assert_eq!(rows[2].state, DeviceState::Offline);
        assert_eq!(rows[3].state, DeviceState::Unauthorized);
    }

    #[test]
    fn test_attached_serials_keeps_only_ready_devices_in_order() {
        assert_eq!(
            attached_serials(LISTING),
            vec!["R58M81XYZ".to_string(), "192.168.1.5:5555".to_string()]
        );
    }

    #[test]
    fn test_parse_device_list_empty_listing_has_no_rows() {
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn test_parse_device_list_handles_crlf_line_endings() {
        let rows = parse_device_list("List of devices attached\r\nABC123\tdevice\r\n\r\n");
        assert_eq!(
            rows,
            vec![ListedDevice {
                serial: "ABC123".to_string(),
                state: DeviceState::Device
            }]
        );
    }

    #[test]
    fn test_parse_device_list_unknown_state_is_preserved() {
        let rows = parse_device_list("List of devices attached\nABC123\trecovery\n");
        assert_eq!(rows[0].state, DeviceState::Other("recovery".to_string()));
    }

    #[test]
    fn test_parse_device_list_ignores_rows_without_state() {
        let rows = parse_device_list("List of devices attached\nABC123\n");
        assert!(rows.is_empty());
    }
}
