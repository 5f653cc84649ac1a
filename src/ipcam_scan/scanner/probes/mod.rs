pub mod http;
pub mod onvif;

pub use http::{build_fingerprint_client, collect_fingerprints, fetch_fingerprint};
pub use onvif::{build_onvif_client, enrich_onvif, OnvifDeviceInfo};
