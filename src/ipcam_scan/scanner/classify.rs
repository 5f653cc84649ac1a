//! Device-kind scoring: NVR vs camera vs unknown

use crate::ipcam_scan::types::{DeviceKind, VendorGuess};

/// RTSP
pub const RTSP_PORT: u16 = 554;

/// Multiplexed recorder management ports (Dahua, XMeye, Hikvision SDK)
pub const NVR_PORTS: &[u16] = &[37777, 37778, 34567, 8000];

/// Vendor management port seen on both recorders and cameras
pub const SHARED_MANAGEMENT_PORT: u16 = 8899;

/// Generic web ports
pub const WEB_PORTS: &[u16] = &[80, 443];

/// Vendor families historically sold as recorders
pub const RECORDER_VENDORS: &[&str] = &["hikvision", "dahua", "uniview"];

/// Calibration constants for the scorers.
///
/// The defaults are empirical; change them here rather than in the scoring code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    /// NVR wins when nvr_score >= camera_score + nvr_margin
    pub nvr_margin: i32,
    /// Camera wins when camera_score >= nvr_score + camera_margin
    pub camera_margin: i32,
    pub nvr_score_ceiling: f64,
    pub camera_score_ceiling: f64,
    /// Vendor confidence is score / vendor_score_ceiling, capped at 1
    pub vendor_score_ceiling: f64,
    pub unknown_confidence: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            nvr_margin: 2,
            camera_margin: 1,
            nvr_score_ceiling: 6.0,
            camera_score_ceiling: 5.0,
            vendor_score_ceiling: 6.0,
            unknown_confidence: 0.2,
        }
    }
}

/// Device-kind decision
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: DeviceKind,
    pub confidence: f64,
    pub nvr_score: i32,
    pub camera_score: i32,
    pub reasons: Vec<String>,
}

/// Stage 4: Classify with default thresholds
pub fn classify_device(
    open_ports: &[u16],
    vendor_guess: &VendorGuess,
    onvif_streams: Option<usize>,
) -> Classification {
    classify_device_with(
        &ClassifierThresholds::default(),
        open_ports,
        vendor_guess,
        onvif_streams,
    )
}

/// Stage 4: Classify with explicit thresholds
pub fn classify_device_with(
    thresholds: &ClassifierThresholds,
    open_ports: &[u16],
    vendor_guess: &VendorGuess,
    onvif_streams: Option<usize>,
) -> Classification {
    let mut nvr_score = 0i32;
    let mut camera_score = 0i32;
    let mut reasons = Vec::new();

    if open_ports.contains(&RTSP_PORT) {
        camera_score += 2;
        reasons.push("rtsp-port".to_string());
    }
    if open_ports.iter().any(|p| NVR_PORTS.contains(p)) {
        nvr_score += 2;
        reasons.push("nvr-port".to_string());
    }
    if open_ports.contains(&SHARED_MANAGEMENT_PORT) {
        nvr_score += 1;
        camera_score += 1;
        reasons.push("mgmt-port".to_string());
    }
    if open_ports.iter().any(|p| WEB_PORTS.contains(p)) {
        camera_score += 1;
        reasons.push("web-port".to_string());
    }
    if let Some(vendor) = vendor_guess.vendor.as_deref() {
        if RECORDER_VENDORS.contains(&vendor) {
            nvr_score += 1;
            reasons.push(format!("recorder-vendor:{}", vendor));
        }
    }
    if onvif_streams.is_some_and(|streams| streams > 1) {
        nvr_score += 3;
        reasons.push("multi-stream".to_string());
    }

    let (kind, confidence) = if nvr_score >= camera_score + thresholds.nvr_margin {
        (
            DeviceKind::Nvr,
            ratio(nvr_score, thresholds.nvr_score_ceiling),
        )
    } else if camera_score >= nvr_score + thresholds.camera_margin {
        (
            DeviceKind::Camera,
            ratio(camera_score, thresholds.camera_score_ceiling),
        )
    } else {
        (DeviceKind::Unknown, thresholds.unknown_confidence)
    };

    Classification {
        kind,
        confidence,
        nvr_score,
        camera_score,
        reasons,
    }
}

/// score / ceiling, clamped to [0, 1]
pub(crate) fn ratio(score: i32, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (score as f64 / ceiling).clamp(0.0, 1.0)
}
