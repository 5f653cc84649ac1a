//! Provisioning document and inventory payloads

use serde::{Deserialize, Serialize};

use crate::deploy::DeployConfig;

/// Declarative provisioning document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionInput {
    #[serde(default)]
    pub nvrs: Vec<RecorderSpec>,
    #[serde(default)]
    pub cameras: Vec<CameraSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,
}

impl ProvisionInput {
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecorderProtocol {
    #[default]
    Onvif,
    Rtsp,
    Hybrid,
    Gb28181,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProfile {
    Main,
    #[default]
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CameraStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

/// Recorder (NVR) entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSpec {
    pub name: String,
    /// Symbolic name cameras use in `nvrRef`; defaults to `name`
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub host: String,
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub onvif_port: Option<u16>,
    #[serde(default)]
    pub rtsp_port: Option<u16>,
    #[serde(default)]
    pub rtsp_url_template: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub protocol: Option<RecorderProtocol>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sync_onvif: Option<bool>,
    #[serde(default)]
    pub overwrite_names: Option<bool>,
    #[serde(default)]
    pub disable_missing: Option<bool>,
    #[serde(default)]
    pub test_connection: Option<bool>,
}

impl RecorderSpec {
    pub fn symbolic_name(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.name)
    }

    /// Create payload with defaults applied
    pub fn payload(&self) -> RecorderPayload {
        RecorderPayload {
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            model: self.model.clone(),
            host: self.host.clone(),
            http_port: self.http_port.unwrap_or(80),
            onvif_port: self.onvif_port.unwrap_or(80),
            rtsp_port: self.rtsp_port.unwrap_or(554),
            rtsp_url_template: self.rtsp_url_template.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            protocol: self.protocol.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
        }
    }

    pub fn sync_request(&self) -> OnvifSyncRequest {
        OnvifSyncRequest {
            overwrite_names: self.overwrite_names.unwrap_or(false),
            disable_missing: self.disable_missing.unwrap_or(true),
        }
    }
}

/// Camera entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSpec {
    pub name: String,
    #[serde(default)]
    pub area_id: Option<String>,
    /// Existing recorder id; wins over `nvr_ref`
    #[serde(default)]
    pub nvr_id: Option<String>,
    /// Symbolic name of a recorder earlier in the same document
    #[serde(default)]
    pub nvr_ref: Option<String>,
    #[serde(default)]
    pub channel_no: Option<u32>,
    #[serde(default)]
    pub stream_profile: Option<StreamProfile>,
    #[serde(default)]
    pub auto_generate_url: Option<bool>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub status: Option<CameraStatus>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl CameraSpec {
    /// Create payload for a resolved (or absent) recorder id
    pub fn payload(&self, nvr_id: Option<String>) -> CameraPayload {
        let linked = nvr_id.is_some();
        CameraPayload {
            name: self.name.clone(),
            area_id: self.area_id.clone(),
            nvr_id,
            channel_no: self.channel_no,
            stream_profile: self.stream_profile.unwrap_or_default(),
            auto_generate_url: self.auto_generate_url.unwrap_or(linked),
            stream_url: self.stream_url.clone(),
            status: self.status.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            external_id: self.external_id.clone(),
        }
    }
}

/// `POST /schools/{id}/nvrs` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub host: String,
    pub http_port: u16,
    pub onvif_port: u16,
    pub rtsp_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtsp_url_template: Option<String>,
    pub username: String,
    pub password: String,
    pub protocol: RecorderProtocol,
    pub is_active: bool,
}

impl RecorderPayload {
    /// Copy safe for logs and dry-run output
    pub fn redacted(&self) -> Self {
        Self {
            password: "********".to_string(),
            ..self.clone()
        }
    }
}

/// `POST /schools/{id}/cameras` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nvr_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_no: Option<u32>,
    pub stream_profile: StreamProfile,
    pub auto_generate_url: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    pub status: CameraStatus,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// `POST /nvrs/{id}/onvif-sync` body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnvifSyncRequest {
    pub overwrite_names: bool,
    pub disable_missing: bool,
}

/// Recorder as returned by the inventory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecorder {
    pub id: String,
    pub name: String,
}
