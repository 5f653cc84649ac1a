//! Inventory API client
//!
//! Bearer-authenticated JSON over HTTP(S). Non-2xx answers become
//! [`Error::Api`] with the status code and the server's message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{CameraPayload, CreatedRecorder, OnvifSyncRequest, RecorderPayload};
use crate::deploy::DeployConfig;
use crate::error::{Error, Result};

/// Operations the orchestrator needs from the inventory backend
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn create_recorder(&self, school_id: &str, payload: &RecorderPayload) -> Result<CreatedRecorder>;

    async fn test_connection(&self, recorder_id: &str) -> Result<serde_json::Value>;

    async fn onvif_sync(&self, recorder_id: &str, request: &OnvifSyncRequest) -> Result<serde_json::Value>;

    async fn create_camera(&self, school_id: &str, payload: &CameraPayload) -> Result<serde_json::Value>;

    /// Ask the backend to perform the relay deploy itself
    async fn trigger_deploy(&self, school_id: &str, deploy: &DeployConfig) -> Result<serde_json::Value>;
}

/// HTTP implementation of [`InventoryApi`]
#[derive(Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::Config("API base URL required".to_string()));
        }
        if token.trim().is_empty() {
            return Err(Error::Config("API token required".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body; returns the raw response text of a 2xx answer
    async fn post<B>(&self, path: &str, body: &B) -> Result<String>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: api_error_message(status, &text),
            });
        }
        Ok(text)
    }

    /// POST and decode a typed 2xx answer
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let text = self.post(path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POST where any 2xx answer is success
    async fn post_value<B>(&self, path: &str, body: &B) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized + Sync,
    {
        let text = self.post(path, body).await?;
        Ok(success_body(&text))
    }
}

/// JSON when the body looks like JSON, the raw text otherwise, null when empty
pub fn success_body(text: &str) -> serde_json::Value {
    let raw = text.trim();
    if raw.is_empty() {
        return serde_json::Value::Null;
    }
    if raw.starts_with('{') || raw.starts_with('[') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    serde_json::Value::String(raw.to_string())
}

/// `error` field of a JSON body, else the raw text, else the status reason
pub fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }
    let raw = body.trim();
    if !raw.is_empty() && !raw.starts_with('{') && !raw.starts_with('[') {
        return raw.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    async fn create_recorder(&self, school_id: &str, payload: &RecorderPayload) -> Result<CreatedRecorder> {
        self.post_json(&format!("/schools/{}/nvrs", segment(school_id)), payload)
            .await
    }

    async fn test_connection(&self, recorder_id: &str) -> Result<serde_json::Value> {
        self.post_value(
            &format!("/nvrs/{}/test-connection", segment(recorder_id)),
            &serde_json::json!({}),
        )
        .await
    }

    async fn onvif_sync(&self, recorder_id: &str, request: &OnvifSyncRequest) -> Result<serde_json::Value> {
        self.post_value(&format!("/nvrs/{}/onvif-sync", segment(recorder_id)), request)
            .await
    }

    async fn create_camera(&self, school_id: &str, payload: &CameraPayload) -> Result<serde_json::Value> {
        self.post_value(&format!("/schools/{}/cameras", segment(school_id)), payload)
            .await
    }

    async fn trigger_deploy(&self, school_id: &str, deploy: &DeployConfig) -> Result<serde_json::Value> {
        self.post_value(&format!("/schools/{}/mediamtx-deploy", segment(school_id)), deploy)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::types::{CameraStatus, RecorderProtocol, StreamProfile};
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    async fn serve_once(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        serve_once_as(status, "application/json", body).await
    }

    /// Serve one canned response; the raw request comes back on the channel
    async fn serve_once_as(
        status: &str,
        content_type: &str,
        body: &str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut data = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    data.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&data);
                    if let Some(head_end) = text.find("\r\n\r\n") {
                        let length = text[..head_end]
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase()
                                    .strip_prefix("content-length:")
                                    .and_then(|v| v.trim().parse::<usize>().ok())
                            })
                            .unwrap_or(0);
                        if data.len() >= head_end + 4 + length {
                            break;
                        }
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&data).to_string());
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (base, rx)
    }

    fn payload() -> RecorderPayload {
        RecorderPayload {
            name: "Gym NVR".to_string(),
            vendor: None,
            model: None,
            host: "192.168.10.5".to_string(),
            http_port: 80,
            onvif_port: 80,
            rtsp_port: 554,
            rtsp_url_template: None,
            username: "admin".to_string(),
            password: "pw".to_string(),
            protocol: RecorderProtocol::Onvif,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_recorder_request_shape() {
        let (base, request) = serve_once("201 Created", r#"{"id":"nvr-42","name":"Gym NVR"}"#).await;
        let client = HttpInventoryClient::new(&format!("{}/", base), "tok123", Duration::from_secs(5)).unwrap();

        let created = client.create_recorder("school 1", &payload()).await.unwrap();
        assert_eq!(
            created,
            CreatedRecorder {
                id: "nvr-42".to_string(),
                name: "Gym NVR".to_string()
            }
        );

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /schools/school%201/nvrs HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer tok123"));
        assert!(raw.contains(r#""onvifPort":80"#));
        assert!(raw.contains(r#""protocol":"ONVIF""#));
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_message() {
        let (base, _request) = serve_once("409 Conflict", r#"{"error":"NVR host already registered"}"#).await;
        let client = HttpInventoryClient::new(&base, "tok", Duration::from_secs(5)).unwrap();

        match client.create_recorder("s1", &payload()).await {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 409);
                assert_eq!(message, "NVR host already registered");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let (base, request) = serve_once("200 OK", "").await;
        let client = HttpInventoryClient::new(&base, "tok", Duration::from_secs(5)).unwrap();

        let value = client.test_connection("nvr-1").await.unwrap();
        assert!(value.is_null());
        assert!(request.await.unwrap().starts_with("POST /nvrs/nvr-1/test-connection "));
    }

    #[tokio::test]
    async fn test_plain_text_success_body() {
        let (base, request) = serve_once_as("201 Created", "text/plain", "Created").await;
        let client = HttpInventoryClient::new(&base, "tok", Duration::from_secs(5)).unwrap();

        let camera = CameraPayload {
            name: "Gym 1".to_string(),
            area_id: None,
            nvr_id: Some("nvr-42".to_string()),
            channel_no: Some(1),
            stream_profile: StreamProfile::Sub,
            auto_generate_url: true,
            stream_url: None,
            status: CameraStatus::Unknown,
            is_active: true,
            external_id: None,
        };
        let value = client.create_camera("s1", &camera).await.unwrap();
        assert_eq!(value, serde_json::Value::String("Created".to_string()));
        assert!(request.await.unwrap().starts_with("POST /schools/s1/cameras "));
    }

    #[tokio::test]
    async fn test_created_recorder_still_requires_json() {
        let (base, _request) = serve_once_as("201 Created", "text/plain", "Created").await;
        let client = HttpInventoryClient::new(&base, "tok", Duration::from_secs(5)).unwrap();

        let err = client.create_recorder("s1", &payload()).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_success_body_decoding() {
        assert_eq!(success_body("  "), serde_json::Value::Null);
        assert_eq!(success_body(r#"{"ok":true}"#), serde_json::json!({"ok": true}));
        assert_eq!(success_body("[1, 2]"), serde_json::json!([1, 2]));
        assert_eq!(success_body("OK\n"), serde_json::Value::String("OK".to_string()));
        assert_eq!(
            success_body("{not json"),
            serde_json::Value::String("{not json".to_string())
        );
    }

    #[test]
    fn test_api_error_message_fallbacks() {
        assert_eq!(
            api_error_message(StatusCode::BAD_REQUEST, r#"{"error":"bad host"}"#),
            "bad host"
        );
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            api_error_message(StatusCode::NOT_FOUND, r#"{"message":"x"}"#),
            "Not Found"
        );
        assert_eq!(api_error_message(StatusCode::FORBIDDEN, ""), "Forbidden");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(HttpInventoryClient::new("", "tok", Duration::from_secs(1)).is_err());
        assert!(HttpInventoryClient::new("http://api", " ", Duration::from_secs(1)).is_err());
    }
}
