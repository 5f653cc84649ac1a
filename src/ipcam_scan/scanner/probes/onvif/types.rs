/// ONVIF device information retrieved via GetDeviceInformation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnvifDeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
}

/// Everything one authenticated ONVIF session yields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnvifSessionInfo {
    pub device_info: OnvifDeviceInfo,
    /// Media service endpoint used for GetProfiles
    pub media_xaddr: String,
    pub profile_count: usize,
}
