//! Scanner stages for IpcamScan
//!
//! Evidence-based discovery: TCP reachability, web fingerprints, vendor
//! signatures, optional ONVIF, then a device-kind decision.

pub mod classify;
pub mod network;
pub mod probes;
pub mod vendor_rules;

pub use classify::{classify_device, classify_device_with, Classification, ClassifierThresholds};
pub use network::{
    expand_hosts,
    local_subnets,
    parse_cidr,
    scan_port,
    scan_ports,
    select_subnets,
    Cidr,
    PortScanResult,
};
pub use probes::{
    build_fingerprint_client,
    build_onvif_client,
    collect_fingerprints,
    enrich_onvif,
    fetch_fingerprint,
    OnvifDeviceInfo,
};
pub use vendor_rules::{guess_vendor, guess_vendor_with, VendorRule, VENDOR_RULES};

#[cfg(test)]
mod tests;
