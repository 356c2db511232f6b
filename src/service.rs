//! Masking service collaborators
//!
//! The session talks to the remote service only through [`PiiService`].
//! [`HttpPiiClient`] is the HTTP implementation used by the dashboard and
//! the CLI.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::detection::MaskResponse;
use crate::error::ServiceError;

/// Timeout for the health probe, independent of the request timeout
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// File handed to the service for text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as name
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file path: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self { file_name, bytes })
    }
}

/// Remote collaborator that extracts document text and masks PII
pub trait PiiService {
    /// Extract plain text from an uploaded document
    fn extract_text(
        &self,
        upload: FileUpload,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Mask `text`, redacting only the given categories
    fn mask(
        &self,
        text: String,
        categories: Vec<String>,
    ) -> impl Future<Output = Result<MaskResponse, ServiceError>> + Send;

    /// Best-effort availability probe
    fn is_available(&self) -> impl Future<Output = bool> + Send;
}

#[derive(Serialize)]
struct MaskRequest {
    text: String,
    categories: Vec<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    text: String,
}

/// HTTP client for the masking service
#[derive(Debug, Clone)]
pub struct HttpPiiClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPiiClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_http_client(base_url, http)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl PiiService for HttpPiiClient {
    async fn extract_text(&self, upload: FileUpload) -> Result<String, ServiceError> {
        debug!("Uploading {} ({} bytes)", upload.file_name, upload.bytes.len());

        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/octet-stream")
            .map_err(transport_error)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::new(format!("Invalid upload response: {}", e)))?;
        Ok(body.text)
    }

    async fn mask(&self, text: String, categories: Vec<String>) -> Result<MaskResponse, ServiceError> {
        debug!("Mask request: {} chars, {} categories", text.len(), categories.len());

        let response = self
            .http
            .post(self.endpoint("mask"))
            .json(&MaskRequest { text, categories })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<MaskResponse>()
            .await
            .map_err(|e| ServiceError::new(format!("Invalid mask response: {}", e)))
    }

    async fn is_available(&self) -> bool {
        let result = self
            .http
            .get(self.endpoint("health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

/// Validate and trim a service base URL
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let base_url = raw.trim().trim_end_matches('/');

    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(base_url.to_string()),
        Some(_) => bail!("Service URL has no host: {}", raw),
        None => bail!("Service URL must start with http:// or https://: {}", raw),
    }
}

/// Pull the `detail` field out of an error body.
///
/// A string detail is returned as is; a list of validation entries is
/// reduced to their `msg` fields joined with "; ".
pub fn parse_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(|m| m.as_str())
                        .or_else(|| item.as_str())
                        .map(str::to_string)
                })
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    let message = if e.is_timeout() {
        "Request timed out".to_string()
    } else {
        e.to_string()
    };
    let err = ServiceError::new(message);
    match e.status() {
        Some(status) => err.with_status(status.as_u16()),
        None => err,
    }
}

async fn error_from_response(response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let err = ServiceError::new(format!("Request failed with status {}", status))
        .with_status(status.as_u16());
    match parse_error_detail(&body) {
        Some(detail) => err.with_detail(detail),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response on localhost and hand back the raw
    /// request that was received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&received).to_string()
        });

        (format!("http://{}/api", addr), handle)
    }

    fn local_client(base_url: &str) -> HttpPiiClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpPiiClient::with_http_client(base_url, http).unwrap()
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://127.0.0.1:8000/api/").unwrap(),
            "http://127.0.0.1:8000/api"
        );
        assert_eq!(
            normalize_base_url("  https://pii.example.com ").unwrap(),
            "https://pii.example.com"
        );
        assert!(normalize_base_url("ftp://example.com").is_err());
        assert!(normalize_base_url("127.0.0.1:8000").is_err());
        assert!(normalize_base_url("http://").is_err());
        assert!(normalize_base_url("").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let client = HttpPiiClient::new("http://127.0.0.1:8000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("mask"), "http://127.0.0.1:8000/api/mask");
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api");
    }

    #[test]
    fn test_parse_error_detail_string() {
        assert_eq!(
            parse_error_detail(r#"{"detail": "Text cannot be empty"}"#).as_deref(),
            Some("Text cannot be empty")
        );
    }

    #[test]
    fn test_parse_error_detail_validation_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "text"], "msg": "field required", "type": "missing"},
            {"loc": ["body", "categories"], "msg": "value is not a valid list"}
        ]}"#;
        assert_eq!(
            parse_error_detail(body).as_deref(),
            Some("field required; value is not a valid list")
        );
    }

    #[test]
    fn test_parse_error_detail_absent() {
        assert_eq!(parse_error_detail("Internal Server Error"), None);
        assert_eq!(parse_error_detail(r#"{"error": "x"}"#), None);
        assert_eq!(parse_error_detail(r#"{"detail": null}"#), None);
        assert_eq!(parse_error_detail(r#"{"detail": []}"#), None);
    }

    #[test]
    fn test_file_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"Alice called Bob").unwrap();

        let upload = FileUpload::from_path(&path).unwrap();
        assert_eq!(upload.file_name, "contract.txt");
        assert_eq!(upload.bytes, b"Alice called Bob");

        assert!(FileUpload::from_path(&dir.path().join("missing.pdf")).is_err());
    }

    #[tokio::test]
    async fn test_mask_round_trip_over_http() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"masked_text":"████ called ████","detections":[{"type":"name","original":"Alice","start":0,"end":5},{"type":"name","original":"Bob","start":13,"end":16}]}"#,
        )
        .await;
        let client = local_client(&base_url);

        let response = client
            .mask("Alice called Bob".into(), vec!["name".into(), "phone".into()])
            .await
            .unwrap();
        assert_eq!(response.masked_text, "████ called ████");
        assert_eq!(response.detections.len(), 2);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/mask "));
        assert!(request.contains(r#""categories":["name","phone"]"#));
        assert!(request.contains(r#""text":"Alice called Bob""#));
    }

    #[tokio::test]
    async fn test_mask_error_carries_detail_and_status() {
        let (base_url, server) =
            serve_once("502 Bad Gateway", r#"{"detail":"LLM service error: timeout"}"#).await;
        let client = local_client(&base_url);

        let err = client
            .mask("Alice".into(), vec!["name".into()])
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(502));
        assert_eq!(err.detail.as_deref(), Some("LLM service error: timeout"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_health_reports_availability() {
        let (base_url, server) = serve_once("200 OK", r#"{"status":"ok"}"#).await;
        assert!(local_client(&base_url).is_available().await);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/health "));

        // Nothing listens on port 9 of localhost
        assert!(!local_client("http://127.0.0.1:9/api").is_available().await);
    }
}
