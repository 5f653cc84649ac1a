//! Utilities for IpcamScan

use super::types::WebProtocol;

pub const DEFAULT_TIMEOUT_MS: u64 = 600;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 1200;
pub const DEFAULT_CONCURRENCY: usize = 128;
pub const DEFAULT_MAX_HOSTS: usize = 1024;
pub const DEFAULT_ONVIF_TIMEOUT_MS: u64 = 2000;

/// Per-host ceiling for port probes
pub const PORT_PROBE_CONCURRENCY: usize = 64;

/// Per-host ceiling for fingerprint fetches
pub const FINGERPRINT_CONCURRENCY: usize = 8;

/// Web management ports fetched over plain HTTP
pub const HTTP_PORTS: &[u16] = &[80, 8000, 8080, 8899, 9000];

/// Web management ports fetched over HTTPS
pub const HTTPS_PORTS: &[u16] = &[443, 8443];

/// Ports tried for the ONVIF device service, in preference order
pub const ONVIF_PORTS: &[u16] = &[80, 8000, 8080];

/// Default scan ports
pub fn default_ports() -> Vec<u16> {
    vec![
        80,    // HTTP
        443,   // HTTPS
        554,   // RTSP
        8000,  // Hikvision SDK / NVR
        8080,  // Alt HTTP
        8443,  // Alt HTTPS
        8899,  // Vendor management
        37777, // Dahua TCP
        37778, // Dahua UDP/TCP
        34567, // XMeye DVR
        5060,  // SIP (Uniview)
        9000,  // Reolink
    ]
}

/// Protocol for a web management port, `None` for non-web ports
pub fn web_protocol_for(port: u16) -> Option<WebProtocol> {
    if HTTPS_PORTS.contains(&port) {
        Some(WebProtocol::Https)
    } else if HTTP_PORTS.contains(&port) {
        Some(WebProtocol::Http)
    } else {
        None
    }
}

/// Parse a comma separated port list, ignoring blanks and invalid entries
pub fn parse_port_list(value: &str) -> Vec<u16> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<u16>().ok())
        .filter(|p| *p != 0)
        .collect()
}
