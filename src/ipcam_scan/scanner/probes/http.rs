use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{SERVER, WWW_AUTHENTICATE};
use reqwest::Client;

use crate::bounded_runner::run_bounded;
use crate::error::Result;
use crate::ipcam_scan::types::{Fingerprint, WebProtocol};
use crate::ipcam_scan::utils::{web_protocol_for, FINGERPRINT_CONCURRENCY};

/// Body bytes kept per response
pub const MAX_BODY_BYTES: usize = 12_000;

/// Characters of body emitted as the snippet
pub const SNIPPET_CHARS: usize = 200;

const USER_AGENT: &str = "Mozilla/5.0";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("static regex"))
}

fn realm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)realm="?([^";]+)"?"#).expect("static regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// HTTP client for device fingerprinting.
///
/// Embedded devices ship self-signed certificates, so certificate checks are off.
/// Redirects are not followed: the first response is the evidence.
pub fn build_fingerprint_client(timeout_dur: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout_dur)
        .connect_timeout(timeout_dur)
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Extract `<title>` text
pub fn extract_title(body: &str) -> Option<String> {
    title_regex()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract the realm from a `WWW-Authenticate` header value
pub fn extract_realm(header: &str) -> Option<String> {
    realm_regex()
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First [`SNIPPET_CHARS`] characters with whitespace collapsed
pub fn make_snippet(body: &str) -> Option<String> {
    let head: String = body.chars().take(SNIPPET_CHARS).collect();
    let snippet = whitespace_regex().replace_all(&head, " ").trim().to_string();
    if snippet.is_empty() {
        None
    } else {
        Some(snippet)
    }
}

/// Stage 2: GET / on one web port.
///
/// Any failure (timeout, reset, TLS or protocol error) yields `None`.
pub async fn fetch_fingerprint(client: &Client, ip: IpAddr, port: u16) -> Option<Fingerprint> {
    let protocol = web_protocol_for(port)?;
    fetch_fingerprint_as(client, ip, port, protocol).await
}

/// Stage 2: GET / with an explicit protocol
pub async fn fetch_fingerprint_as(
    client: &Client,
    ip: IpAddr,
    port: u16,
    protocol: WebProtocol,
) -> Option<Fingerprint> {
    let url = format!("{}://{}:{}/", protocol.scheme(), ip, port);

    let mut resp = match client.get(&url).header("Accept", ACCEPT).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Fingerprint request failed");
            return None;
        }
    };

    let status = resp.status().as_u16();
    let server = resp
        .headers()
        .get(SERVER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let realm = resp
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_realm);

    let mut body: Vec<u8> = Vec::new();
    while body.len() < MAX_BODY_BYTES {
        match resp.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Fingerprint body read failed");
                return None;
            }
        }
    }
    body.truncate(MAX_BODY_BYTES);
    let text = String::from_utf8_lossy(&body);

    Some(Fingerprint {
        port,
        protocol,
        status: Some(status),
        server,
        realm,
        title: extract_title(&text),
        snippet: make_snippet(&text),
    })
}

/// Stage 2: Fingerprint every open web port of a host.
///
/// Non-web ports are skipped; failed fetches are omitted.
pub async fn collect_fingerprints(client: &Client, ip: IpAddr, open_ports: &[u16]) -> Vec<Fingerprint> {
    let targets: Vec<u16> = open_ports
        .iter()
        .copied()
        .filter(|p| web_protocol_for(*p).is_some())
        .collect();

    if targets.is_empty() {
        return Vec::new();
    }

    let concurrency = FINGERPRINT_CONCURRENCY.min(targets.len());
    run_bounded(targets, concurrency, |port| fetch_fingerprint(client, ip, port))
        .await
        .into_iter()
        .flatten()
        .collect()
}
