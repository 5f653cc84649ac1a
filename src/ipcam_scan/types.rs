//! IpcamScan types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::utils::{
    default_ports, DEFAULT_CONCURRENCY, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_HOSTS,
    DEFAULT_ONVIF_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
};

/// ONVIF credentials used for enrichment
#[derive(Debug, Clone)]
pub struct OnvifCredentials {
    pub username: String,
    pub password: String,
}

/// Scan run configuration
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Target subnets in CIDR notation; empty means local interfaces
    pub subnets: Vec<String>,
    /// Candidate TCP ports
    pub ports: Vec<u16>,
    /// TCP connect timeout
    pub timeout_ms: u64,
    /// Fingerprint request timeout
    pub http_timeout_ms: u64,
    /// Host-level concurrency ceiling
    pub concurrency: usize,
    /// Host budget across all subnets
    pub max_hosts: usize,
    /// Allow non-private target ranges
    pub allow_public: bool,
    pub onvif: Option<OnvifCredentials>,
    pub onvif_timeout_ms: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            subnets: Vec::new(),
            ports: default_ports(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
            max_hosts: DEFAULT_MAX_HOSTS,
            allow_public: false,
            onvif: None,
            onvif_timeout_ms: DEFAULT_ONVIF_TIMEOUT_MS,
        }
    }
}

impl ScanOptions {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn onvif_timeout(&self) -> Duration {
        Duration::from_millis(self.onvif_timeout_ms)
    }
}

/// Web protocol used for a fingerprint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebProtocol {
    #[default]
    Http,
    Https,
}

impl WebProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            WebProtocol::Http => "http",
            WebProtocol::Https => "https",
        }
    }
}

/// Evidence from an unauthenticated HTTP(S) probe of one port
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub port: u16,
    pub protocol: WebProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Vendor classification result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorGuess {
    pub vendor: Option<String>,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl VendorGuess {
    /// No vendor rule matched
    pub fn none() -> Self {
        Self::default()
    }
}

/// Device kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceKind {
    Nvr,
    Camera,
    #[default]
    Unknown,
}

/// Data folded in from an authenticated ONVIF query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OnvifEnrichment {
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub profiles: usize,
    pub streams: usize,
}

/// Classified host with at least one open port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCandidate {
    pub host: String,
    pub open_ports: Vec<u16>,
    pub fingerprints: Vec<Fingerprint>,
    pub vendor_guess: VendorGuess,
    pub device_kind: DeviceKind,
    pub confidence: f64,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onvif: Option<OnvifEnrichment>,
}

/// Output of one scan invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scanned_at: DateTime<Utc>,
    pub subnets: Vec<String>,
    pub host_count: usize,
    pub devices: Vec<DeviceCandidate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&DeviceKind::Nvr).unwrap(), "\"NVR\"");
        assert_eq!(
            serde_json::to_string(&DeviceKind::Camera).unwrap(),
            "\"CAMERA\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceKind::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[test]
    fn test_candidate_uses_camel_case() {
        let candidate = DeviceCandidate {
            host: "192.168.1.10".to_string(),
            open_ports: vec![554],
            fingerprints: Vec::new(),
            vendor_guess: VendorGuess::none(),
            device_kind: DeviceKind::Camera,
            confidence: 0.4,
            reasons: Vec::new(),
            onvif: None,
        };
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["openPorts"][0], 554);
        assert_eq!(json["deviceKind"], "CAMERA");
        assert!(json["vendorGuess"]["vendor"].is_null());
        assert!(json.get("onvif").is_none());
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert!(!options.allow_public);
        assert!(options.ports.contains(&554));
        assert_eq!(options.probe_timeout(), Duration::from_millis(600));
    }
}
