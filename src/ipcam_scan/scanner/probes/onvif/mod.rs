//! ONVIF enrichment probe
//!
//! ## Responsibilities
//!
//! - Authenticated GetDeviceInformation on the device service
//! - Media service lookup via GetCapabilities
//! - GetProfiles to count media profiles
//! - Overall deadline: a session that outlives it is dropped

pub mod soap;
pub mod types;
pub mod xml;

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;

use crate::error::{Error, Result};
use crate::ipcam_scan::types::{OnvifCredentials, OnvifEnrichment};
use crate::ipcam_scan::utils::ONVIF_PORTS;

pub use types::{OnvifDeviceInfo, OnvifSessionInfo};

const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Device service URL for a host and port
pub fn device_service_url(ip: IpAddr, port: u16) -> String {
    format!("http://{}:{}/onvif/device_service", ip, port)
}

/// HTTP client for ONVIF sessions
pub fn build_onvif_client(timeout_dur: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout_dur)
        .connect_timeout(timeout_dur)
        .build()?;
    Ok(client)
}

/// First open port that is an ONVIF candidate, in open-port order
pub fn select_onvif_port(open_ports: &[u16]) -> Option<u16> {
    open_ports.iter().copied().find(|p| ONVIF_PORTS.contains(p))
}

/// POST one SOAP operation and return the response body.
///
/// Non-2xx answers and SOAP faults are errors.
async fn soap_call(
    client: &Client,
    url: &str,
    creds: &OnvifCredentials,
    operation: &str,
    namespace: &str,
) -> Result<String> {
    let header = soap::generate_ws_security_header(&creds.username, &creds.password);
    let envelope = soap::build_envelope(&header, operation, namespace);

    let resp = client
        .post(url)
        .header("Content-Type", SOAP_CONTENT_TYPE)
        .body(envelope)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if xml::is_soap_fault(&body) {
        return Err(Error::Onvif(format!("{} fault from {}", operation, url)));
    }
    if !status.is_success() {
        return Err(Error::Onvif(format!(
            "{} returned HTTP {} from {}",
            operation,
            status.as_u16(),
            url
        )));
    }
    Ok(body)
}

/// Run one authenticated ONVIF session against a device
pub async fn fetch_onvif_info(
    client: &Client,
    ip: IpAddr,
    port: u16,
    creds: &OnvifCredentials,
) -> Result<OnvifSessionInfo> {
    let device_url = device_service_url(ip, port);

    let body = soap_call(
        client,
        &device_url,
        creds,
        "GetDeviceInformation",
        soap::DEVICE_NS,
    )
    .await?;

    let device_info = OnvifDeviceInfo {
        manufacturer: xml::extract_xml_value(&body, "Manufacturer"),
        model: xml::extract_xml_value(&body, "Model"),
        firmware_version: xml::extract_xml_value(&body, "FirmwareVersion"),
        serial_number: xml::extract_xml_value(&body, "SerialNumber"),
    };

    // Devices without a usable capabilities answer usually serve media on the device endpoint
    let media_xaddr = match soap_call(
        client,
        &device_url,
        creds,
        "GetCapabilities",
        soap::DEVICE_NS,
    )
    .await
    {
        Ok(caps) => xml::extract_capability_xaddr(&caps, "Media").unwrap_or_else(|| device_url.clone()),
        Err(e) => {
            tracing::debug!(ip = %ip, port, error = %e, "GetCapabilities failed, using device service");
            device_url.clone()
        }
    };

    let profiles = soap_call(client, &media_xaddr, creds, "GetProfiles", soap::MEDIA_NS).await?;

    Ok(OnvifSessionInfo {
        device_info,
        media_xaddr,
        profile_count: xml::count_profiles(&profiles),
    })
}

/// Stage 3b: ONVIF enrichment on an explicit port, bounded by `deadline`.
///
/// Failures and timeouts yield `None`; the candidate then carries no ONVIF data.
pub async fn enrich_onvif_at(
    client: &Client,
    ip: IpAddr,
    port: u16,
    creds: &OnvifCredentials,
    deadline: Duration,
) -> Option<OnvifEnrichment> {
    match tokio::time::timeout(deadline, fetch_onvif_info(client, ip, port, creds)).await {
        Ok(Ok(info)) => {
            tracing::debug!(
                ip = %ip,
                port,
                profiles = info.profile_count,
                "ONVIF session ok"
            );
            Some(OnvifEnrichment {
                port,
                manufacturer: info.device_info.manufacturer,
                model: info.device_info.model,
                serial_number: info.device_info.serial_number,
                profiles: info.profile_count,
                streams: info.profile_count,
            })
        }
        Ok(Err(e)) => {
            tracing::debug!(ip = %ip, port, error = %e, "ONVIF session failed");
            None
        }
        Err(_) => {
            tracing::debug!(ip = %ip, port, "ONVIF session timed out");
            None
        }
    }
}

/// Stage 3b: ONVIF enrichment on the first candidate port
pub async fn enrich_onvif(
    client: &Client,
    ip: IpAddr,
    open_ports: &[u16],
    creds: &OnvifCredentials,
    deadline: Duration,
) -> Option<OnvifEnrichment> {
    let port = select_onvif_port(open_ports)?;
    enrich_onvif_at(client, ip, port, creds, deadline).await
}
