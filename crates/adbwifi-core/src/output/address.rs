//! Network address helpers.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::OnceLock;

use regex::Regex;

fn network_serial_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+\.\d+\.\d+\.\d+:\d+$").expect("network serial pattern is valid")
    })
}

fn inet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\binet\s+(\d+\.\d+\.\d+\.\d+)(?:/\d+)?").expect("inet pattern is valid")
    })
}

/// Returns `true` if `serial` has the shape `a.b.c.d:port`.
///
/// Some bridge versions list network-mode devices in the same table as USB
/// devices, using their endpoint as the serial.
pub fn is_network_serial(serial: &str) -> bool {
    network_serial_pattern().is_match(serial.trim())
}

/// Extracts the first non-loopback IPv4 address from `ip addr show` output.
///
/// Returns `None` when the interface has no address assigned (Wi-Fi off,
/// not associated) or the output is an error message.
pub fn parse_inet_address(output: &str) -> Option<Ipv4Addr> {
    inet_pattern()
        .captures_iter(output)
        .filter_map(|caps| caps[1].parse::<Ipv4Addr>().ok())
        .find(|ip| !ip.is_loopback() && !ip.is_unspecified())
}

/// Formats the `host:port` endpoint the bridge's connect command expects.
pub fn network_address(ip: Ipv4Addr, port: u16) -> String {
    SocketAddrV4::new(ip, port).to_string()
}
