use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::bounded_runner::run_bounded;
use crate::error::{Error, Result};
use crate::ipcam_scan::utils::PORT_PROBE_CONCURRENCY;

/// RFC1918 and link-local blocks accepted without `--allow-public`
const PRIVATE_BLOCKS: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
];

/// IPv4 subnet in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub address: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::Parse(format!(
                "Invalid prefix: {} (must be 0-32)",
                prefix
            )));
        }
        let address = Ipv4Addr::from(u32::from(address) & prefix_mask(prefix));
        Ok(Self { address, prefix })
    }

    /// Netmask as a 32-bit integer
    pub fn mask(&self) -> u32 {
        prefix_mask(self.prefix)
    }

    pub fn network(&self) -> u32 {
        u32::from(self.address) & self.mask()
    }

    pub fn broadcast(&self) -> u32 {
        self.network() | !self.mask()
    }

    /// Number of usable hosts, computed without expanding the range
    pub fn host_count(&self) -> u64 {
        match self.prefix {
            32 => 1,
            31 => 2,
            p => (1u64 << (32 - p)) - 2,
        }
    }

    /// Usable hosts, network and broadcast excluded.
    ///
    /// A /32 is the address itself and a /31 is both point-to-point ends.
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        let network = self.network();
        let broadcast = self.broadcast();
        match self.prefix {
            32 => vec![Ipv4Addr::from(network)],
            31 => vec![Ipv4Addr::from(network), Ipv4Addr::from(broadcast)],
            _ => (network + 1..broadcast).map(Ipv4Addr::from).collect(),
        }
    }

    /// Whole range inside a private or link-local block
    pub fn is_private(&self) -> bool {
        PRIVATE_BLOCKS.iter().any(|&(block, block_prefix)| {
            let block_mask = prefix_mask(block_prefix);
            self.prefix >= block_prefix && (self.network() & block_mask) == u32::from(block)
        })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.network()), self.prefix)
    }
}

fn prefix_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        !((1u32 << (32 - prefix)) - 1)
    }
}

/// Parse CIDR notation; a bare address is treated as /32
pub fn parse_cidr(cidr: &str) -> Result<Cidr> {
    let cidr = cidr.trim();

    // Handle single IP
    if !cidr.contains('/') {
        let ip: Ipv4Addr = cidr
            .parse()
            .map_err(|e| Error::Parse(format!("Invalid IP {}: {}", cidr, e)))?;
        return Cidr::new(ip, 32);
    }

    let parts: Vec<&str> = cidr.split('/').collect();
    if parts.len() != 2 {
        return Err(Error::Parse(format!("Invalid CIDR format: {}", cidr)));
    }

    let base_ip: Ipv4Addr = parts[0]
        .parse()
        .map_err(|e| Error::Parse(format!("Invalid IP {}: {}", parts[0], e)))?;
    let prefix: u8 = parts[1]
        .parse()
        .map_err(|e| Error::Parse(format!("Invalid prefix {}: {}", parts[1], e)))?;

    Cidr::new(base_ip, prefix)
}

/// Convert a dotted netmask to a prefix length (leading one bits)
pub fn netmask_to_prefix(netmask: Ipv4Addr) -> u8 {
    u32::from(netmask).leading_ones() as u8
}

/// Non-loopback IPv4 interfaces of this machine as CIDRs
pub fn local_subnets() -> Result<Vec<Cidr>> {
    let interfaces = NetworkInterface::show()
        .map_err(|e| Error::Config(format!("Failed to list network interfaces: {}", e)))?;

    let mut subnets = Vec::new();
    for iface in interfaces {
        for addr in &iface.addr {
            let Addr::V4(v4) = addr else { continue };
            if v4.ip.is_loopback() || v4.ip.is_unspecified() {
                continue;
            }
            let Some(netmask) = v4.netmask else { continue };
            let cidr = Cidr::new(v4.ip, netmask_to_prefix(netmask))?;
            if !subnets.contains(&cidr) {
                tracing::debug!(interface = %iface.name, subnet = %cidr, "Detected local subnet");
                subnets.push(cidr);
            }
        }
    }

    Ok(subnets)
}

/// Apply the private-range guard.
///
/// Explicit targets must all be private. Auto-detected interfaces are narrowed
/// to the private ones. Either way an empty result is an error.
pub fn select_subnets(candidates: Vec<Cidr>, auto_detected: bool, allow_public: bool) -> Result<Vec<Cidr>> {
    if allow_public {
        if candidates.is_empty() {
            return Err(Error::Config("No subnets to scan".to_string()));
        }
        return Ok(candidates);
    }

    if !auto_detected {
        if let Some(public) = candidates.iter().find(|c| !c.is_private()) {
            return Err(Error::Config(format!(
                "Subnet {} is not a private range. Pass --allow-public to override (not recommended).",
                public
            )));
        }
    }

    let private: Vec<Cidr> = candidates.into_iter().filter(Cidr::is_private).collect();
    if private.is_empty() {
        return Err(Error::Config(
            "No private subnets detected. Pass --allow-public to override (not recommended)."
                .to_string(),
        ));
    }

    Ok(private)
}

/// Expand subnets into a de-duplicated, sorted host list within the budget
pub fn expand_hosts(subnets: &[Cidr], max_hosts: usize) -> Result<Vec<Ipv4Addr>> {
    let mut hosts: BTreeSet<Ipv4Addr> = BTreeSet::new();

    for cidr in subnets {
        let count = cidr.host_count();
        if count > max_hosts as u64 {
            return Err(Error::Config(format!(
                "Host count {} in {} exceeds maxHosts {}",
                count, cidr, max_hosts
            )));
        }
        hosts.extend(cidr.hosts());
        if hosts.len() > max_hosts {
            return Err(Error::Config(format!(
                "Host count {} exceeds maxHosts {}",
                hosts.len(),
                max_hosts
            )));
        }
    }

    Ok(hosts.into_iter().collect())
}

/// Port scan result
#[derive(Debug, Clone)]
pub struct PortScanResult {
    pub ip: IpAddr,
    pub port: u16,
    pub open: bool,
    pub latency_ms: Option<u64>,
}

/// Stage 1: Probe a single port with a TCP connect
pub async fn scan_port(ip: IpAddr, port: u16, timeout_dur: Duration) -> PortScanResult {
    let addr = SocketAddr::new(ip, port);
    let start = Instant::now();

    match timeout(timeout_dur, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => PortScanResult {
            ip,
            port,
            open: true,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        // Refused, unreachable and timed out are all "closed"
        Ok(Err(_)) | Err(_) => PortScanResult {
            ip,
            port,
            open: false,
            latency_ms: None,
        },
    }
}

/// Stage 1: Scan all candidate ports for a host, returning the open ones in
/// candidate order
pub async fn scan_ports(ip: IpAddr, ports: &[u16], timeout_dur: Duration) -> Vec<u16> {
    let concurrency = PORT_PROBE_CONCURRENCY.min(ports.len());
    let results = run_bounded(ports.to_vec(), concurrency, |port| {
        scan_port(ip, port, timeout_dur)
    })
    .await;

    results
        .into_iter()
        .filter(|r| r.open)
        .inspect(|r| {
            tracing::debug!(ip = %r.ip, port = r.port, latency_ms = ?r.latency_ms, "Port open");
        })
        .map(|r| r.port)
        .collect()
}
