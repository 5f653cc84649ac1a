use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::net::TcpListener;

use super::{expand_hosts, parse_cidr, scan_ports, select_subnets, Cidr};
use super::network::netmask_to_prefix;

#[test]
fn test_parse_cidr_single_ip() {
    let cidr = parse_cidr("192.168.1.1").unwrap();
    assert_eq!(cidr.prefix, 32);
    assert_eq!(cidr.hosts(), vec![Ipv4Addr::new(192, 168, 1, 1)]);
}

#[test]
fn test_parse_cidr_24() {
    let cidr = parse_cidr("192.168.1.0/24").unwrap();
    assert_eq!(cidr.host_count(), 254);
    assert_eq!(cidr.hosts().len(), 254); // Excluding network and broadcast
}

#[test]
fn test_parse_cidr_30() {
    let hosts = parse_cidr("10.0.0.0/30").unwrap().hosts();
    assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
}

#[test]
fn test_parse_cidr_31_keeps_both_ends() {
    let hosts = parse_cidr("10.0.0.4/31").unwrap().hosts();
    assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 4), Ipv4Addr::new(10, 0, 0, 5)]);
}

#[test]
fn test_parse_cidr_normalizes_host_bits() {
    let cidr = parse_cidr("192.168.1.77/24").unwrap();
    assert_eq!(cidr.to_string(), "192.168.1.0/24");
}

#[test]
fn test_parse_cidr_rejects_garbage() {
    assert!(parse_cidr("192.168.1.0/33").is_err());
    assert!(parse_cidr("192.168.1/24").is_err());
    assert!(parse_cidr("cameras").is_err());
    assert!(parse_cidr("10.0.0.0/8/1").is_err());
}

#[test]
fn test_private_ranges() {
    for s in ["10.1.2.0/24", "172.16.0.0/12", "172.31.5.0/24", "192.168.0.0/16", "169.254.1.0/24"] {
        assert!(parse_cidr(s).unwrap().is_private(), "{} should be private", s);
    }
    for s in ["8.8.8.0/24", "172.32.0.0/24", "10.0.0.0/7", "0.0.0.0/0"] {
        assert!(!parse_cidr(s).unwrap().is_private(), "{} should be public", s);
    }
}

#[test]
fn test_public_subnet_rejected_without_override() {
    let err = select_subnets(vec![parse_cidr("8.8.8.0/24").unwrap()], false, false).unwrap_err();
    assert!(err.to_string().contains("--allow-public"));

    let mixed = vec![parse_cidr("192.168.1.0/24").unwrap(), parse_cidr("8.8.8.0/24").unwrap()];
    assert!(select_subnets(mixed, false, false).is_err());
}

#[test]
fn test_public_subnet_allowed_with_override() {
    let subnets = select_subnets(vec![parse_cidr("8.8.8.0/24").unwrap()], false, true).unwrap();
    assert_eq!(subnets.len(), 1);
}

#[test]
fn test_auto_detected_subnets_are_narrowed() {
    let detected = vec![parse_cidr("192.168.1.0/24").unwrap(), parse_cidr("203.0.113.0/24").unwrap()];
    let subnets = select_subnets(detected, true, false).unwrap();
    assert_eq!(subnets, vec![parse_cidr("192.168.1.0/24").unwrap()]);

    let public_only = vec![parse_cidr("203.0.113.0/24").unwrap()];
    let err = select_subnets(public_only, true, false).unwrap_err();
    assert!(err.to_string().contains("No private subnets detected"));
}

#[test]
fn test_expand_hosts_dedups_overlaps() {
    let subnets = vec![parse_cidr("10.0.0.0/30").unwrap(), parse_cidr("10.0.0.1").unwrap()];
    let hosts = expand_hosts(&subnets, 16).unwrap();
    assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
}

#[test]
fn test_expand_hosts_budget() {
    let subnets = vec![parse_cidr("10.0.0.0/24").unwrap()];
    assert_eq!(expand_hosts(&subnets, 254).unwrap().len(), 254);

    let err = expand_hosts(&subnets, 253).unwrap_err();
    assert!(err.to_string().contains("exceeds maxHosts 253"));

    // A /8 is rejected before expansion
    let huge = vec![parse_cidr("10.0.0.0/8").unwrap()];
    assert!(expand_hosts(&huge, 1024).is_err());
}

#[test]
fn test_netmask_to_prefix() {
    assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 0)), 24);
    assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 240, 0)), 20);
    assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 255)), 32);
}

#[test]
fn test_cidr_new_rejects_prefix() {
    assert!(Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 40).is_err());
}

#[tokio::test]
async fn test_scan_ports_reports_open_in_candidate_order() {
    let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_a = a.local_addr().unwrap().port();
    let open_b = b.local_addr().unwrap().port();

    let closed = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };

    let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let open = scan_ports(ip, &[open_b, closed, open_a], Duration::from_millis(500)).await;
    assert_eq!(open, vec![open_b, open_a]);
}

#[tokio::test]
async fn test_scan_ports_empty_list() {
    let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
    assert!(scan_ports(ip, &[], Duration::from_millis(100)).await.is_empty());
}
