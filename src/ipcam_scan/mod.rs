//! IpcamScan - LAN camera and NVR discovery
//!
//! ## Responsibilities
//!
//! - Stage 0: Resolve target subnets, apply the private-range guard and the host budget
//! - Stage 1: TCP port probe per host, live hosts only
//! - Stage 2: HTTP(S) fingerprints of web management ports
//! - Stage 3: Vendor guess, optional ONVIF enrichment
//! - Stage 4: Device-kind classification
//!
//! No credential guessing: ONVIF runs only with operator-supplied credentials.

pub mod scanner;
pub mod types;
pub mod utils;

pub use types::*;

use std::net::{IpAddr, Ipv4Addr};

use reqwest::Client;

use crate::bounded_runner::run_bounded;
use crate::error::{Error, Result};
use scanner::{
    build_fingerprint_client, build_onvif_client, classify_device, collect_fingerprints,
    enrich_onvif, expand_hosts, guess_vendor, local_subnets, parse_cidr, scan_ports,
    select_subnets, Cidr,
};

/// Targets resolved before any network I/O
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub subnets: Vec<Cidr>,
    pub hosts: Vec<Ipv4Addr>,
}

/// Host with at least one open port
#[derive(Debug, Clone)]
struct LiveHost {
    ip: Ipv4Addr,
    open_ports: Vec<u16>,
}

/// IpcamScan service
pub struct IpcamScan {
    options: ScanOptions,
    fingerprint_client: Client,
    onvif_client: Client,
}

impl IpcamScan {
    /// Create a scanner; fails on unusable options before touching the network
    pub fn new(options: ScanOptions) -> Result<Self> {
        if options.ports.is_empty() {
            return Err(Error::Config("No ports to scan".to_string()));
        }
        if options.max_hosts == 0 {
            return Err(Error::Config("maxHosts must be at least 1".to_string()));
        }
        let fingerprint_client = build_fingerprint_client(options.http_timeout())?;
        let onvif_client = build_onvif_client(options.onvif_timeout())?;
        Ok(Self {
            options,
            fingerprint_client,
            onvif_client,
        })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Stage 0: Resolve subnets and expand hosts
    pub fn plan(&self) -> Result<ScanPlan> {
        let auto_detected = self.options.subnets.is_empty();
        let candidates = if auto_detected {
            let detected = local_subnets()?;
            tracing::info!(count = detected.len(), "Using local interface subnets");
            detected
        } else {
            self.options
                .subnets
                .iter()
                .map(|s| parse_cidr(s))
                .collect::<Result<Vec<_>>>()?
        };

        let subnets = select_subnets(candidates, auto_detected, self.options.allow_public)?;
        let hosts = expand_hosts(&subnets, self.options.max_hosts)?;

        let subnet_list: Vec<String> = subnets.iter().map(Cidr::to_string).collect();
        tracing::info!(
            subnets = %subnet_list.join(","),
            hosts = hosts.len(),
            "Stage 0: Prep complete"
        );

        Ok(ScanPlan { subnets, hosts })
    }

    /// Run the full pipeline
    pub async fn run(&self) -> Result<ScanResult> {
        let plan = self.plan()?;
        let host_count = plan.hosts.len();

        // Stage 1: Port probe
        let live_hosts = self.probe_hosts(plan.hosts).await;
        tracing::info!(
            hosts = host_count,
            live = live_hosts.len(),
            "Stage 1: Port scan complete"
        );

        // Stage 2-4: Evidence and classification
        let devices = run_bounded(live_hosts, self.options.concurrency, |host| {
            self.examine_host(host)
        })
        .await;

        tracing::info!(
            devices = devices.len(),
            nvrs = devices.iter().filter(|d| d.device_kind == DeviceKind::Nvr).count(),
            cameras = devices.iter().filter(|d| d.device_kind == DeviceKind::Camera).count(),
            "Stage 4: Classification complete"
        );

        Ok(ScanResult {
            scanned_at: chrono::Utc::now(),
            subnets: plan.subnets.iter().map(Cidr::to_string).collect(),
            host_count,
            devices,
        })
    }

    async fn probe_hosts(&self, hosts: Vec<Ipv4Addr>) -> Vec<LiveHost> {
        let ports = &self.options.ports;
        let timeout_dur = self.options.probe_timeout();

        run_bounded(hosts, self.options.concurrency, |ip| async move {
            let open_ports = scan_ports(IpAddr::V4(ip), ports, timeout_dur).await;
            if open_ports.is_empty() {
                None
            } else {
                Some(LiveHost { ip, open_ports })
            }
        })
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    async fn examine_host(&self, host: LiveHost) -> DeviceCandidate {
        let ip = IpAddr::V4(host.ip);

        // Stage 2: Fingerprints
        let fingerprints = collect_fingerprints(&self.fingerprint_client, ip, &host.open_ports).await;

        // Stage 3: Vendor + ONVIF
        let vendor_guess = guess_vendor(&host.open_ports, &fingerprints);
        let onvif = match &self.options.onvif {
            Some(creds) => {
                enrich_onvif(
                    &self.onvif_client,
                    ip,
                    &host.open_ports,
                    creds,
                    self.options.onvif_timeout(),
                )
                .await
            }
            None => None,
        };

        // Stage 4: Classification
        let classification =
            classify_device(&host.open_ports, &vendor_guess, onvif.as_ref().map(|o| o.streams));

        tracing::debug!(
            ip = %ip,
            kind = ?classification.kind,
            vendor = ?vendor_guess.vendor,
            confidence = classification.confidence,
            "Host classified"
        );

        DeviceCandidate {
            host: host.ip.to_string(),
            open_ports: host.open_ports,
            fingerprints,
            vendor_guess,
            device_kind: classification.kind,
            confidence: classification.confidence,
            reasons: classification.reasons,
            onvif,
        }
    }
}

/// Convenience wrapper: build a scanner and run it once
pub async fn run_scan(options: ScanOptions) -> Result<ScanResult> {
    IpcamScan::new(options)?.run().await
}
