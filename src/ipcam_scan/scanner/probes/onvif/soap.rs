use rand::Rng;
use sha1::{Digest, Sha1};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const NONCE_ENCODING: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// Device management service namespace
pub const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
/// Media service namespace
pub const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";

/// PasswordDigest = Base64(SHA1(nonce + created + password))
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Generate WS-Security UsernameToken Digest header for ONVIF authentication
pub fn generate_ws_security_header(username: &str, password: &str) -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    ws_security_header_with(username, password, &nonce, &created)
}

/// WS-Security header with a fixed nonce and timestamp
pub fn ws_security_header_with(
    username: &str,
    password: &str,
    nonce: &[u8],
    created: &str,
) -> String {
    format!(
        r#"<wsse:Security xmlns:wsse="{wsse}" xmlns:wsu="{wsu}">
      <wsse:UsernameToken>
        <wsse:Username>{user}</wsse:Username>
        <wsse:Password Type="{pw_type}">{digest}</wsse:Password>
        <wsse:Nonce EncodingType="{nonce_enc}">{nonce}</wsse:Nonce>
        <wsu:Created>{created}</wsu:Created>
      </wsse:UsernameToken>
    </wsse:Security>"#,
        wsse = WSSE_NS,
        wsu = WSU_NS,
        user = escape_xml(username),
        pw_type = PASSWORD_DIGEST_TYPE,
        digest = password_digest(nonce, created, password),
        nonce_enc = NONCE_ENCODING,
        nonce = STANDARD.encode(nonce),
        created = created,
    )
}

/// SOAP 1.2 envelope around a single empty operation element
pub fn build_envelope(security_header: &str, operation: &str, namespace: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Header>
    {header}
  </s:Header>
  <s:Body>
    <{op} xmlns="{ns}"/>
  </s:Body>
</s:Envelope>"#,
        header = security_header,
        op = operation,
        ns = namespace,
    )
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_digest_is_deterministic() {
        let nonce = [7u8; 16];
        let a = password_digest(&nonce, "2024-01-01T00:00:00Z", "secret");
        let b = password_digest(&nonce, "2024-01-01T00:00:00Z", "secret");
        let c = password_digest(&nonce, "2024-01-01T00:00:00Z", "other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // SHA1 is 20 bytes → 28 base64 chars
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn test_header_carries_token_fields() {
        let nonce = [1u8; 16];
        let header = ws_security_header_with("admin", "pw", &nonce, "2024-01-01T00:00:00Z");
        assert!(header.contains("<wsse:Username>admin</wsse:Username>"));
        assert!(header.contains(&password_digest(&nonce, "2024-01-01T00:00:00Z", "pw")));
        assert!(header.contains(&STANDARD.encode(nonce)));
        assert!(header.contains("<wsu:Created>2024-01-01T00:00:00Z</wsu:Created>"));
        assert!(!header.contains("\\\""));
    }

    #[test]
    fn test_username_is_escaped() {
        let header = ws_security_header_with("a<b", "pw", &[0u8; 16], "t");
        assert!(header.contains("a&lt;b"));
    }

    #[test]
    fn test_fresh_headers_use_fresh_nonces() {
        assert_ne!(
            generate_ws_security_header("admin", "pw"),
            generate_ws_security_header("admin", "pw")
        );
    }

    #[test]
    fn test_envelope() {
        let env = build_envelope("<hdr/>", "GetProfiles", MEDIA_NS);
        assert!(env.contains(r#"<GetProfiles xmlns="http://www.onvif.org/ver10/media/wsdl"/>"#));
        assert!(env.contains("<hdr/>"));
    }
}
