//! Mistral OCR provider: upload, confirm, sign, OCR, reshape.
//!
//! ## Vendor interaction
//!
//! ```text
//! POST /v1/files               (purpose=ocr, file)   ──▶ { id }
//! GET  /v1/files/{id}          poll until ready      ──▶ { id, status? }
//! GET  /v1/files/{id}/url      ?expiry=<hours>       ──▶ { url }
//! POST /v1/ocr                 document_url + model  ──▶ { pages: [...] }
//! ```
//!
//! Every call is made once. A failure at any step becomes
//! [`ProxyError::Vendor`], which always answers 500; the step name only
//! reaches the logs.
//!
//! ## Completion
//!
//! The OCR endpoint may hold the connection while the job runs, so that
//! call is bounded by `ocr_timeout_secs`. The file record may briefly report
//! a non-terminal status after upload; the retrieve step polls it at a fixed
//! interval for at most `readiness_attempts` reads before giving up.

use super::{file_part, http_client, AnalysisResult, DocumentProvider};
use crate::config::MistralConfig;
use crate::error::ProxyError;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info};

// ── Vendor schemas ───────────────────────────────────────────────────────

/// File record returned by upload and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
    /// Absent on most responses; when present, drives readiness polling.
    #[serde(default)]
    pub status: Option<String>,
}

/// Signed-URL response.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrl {
    pub url: String,
}

/// Body of `POST /v1/ocr`.
#[derive(Debug, Serialize)]
pub struct OcrRequest<'a> {
    pub model: &'a str,
    pub document: DocumentSource<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentSource<'a> {
    DocumentUrl { document_url: &'a str },
}

/// Body of a successful OCR response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrResponse {
    /// Whole-document text, when the vendor provides one.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<OcrPage>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage_info: Option<UsageInfo>,
}

/// One page as returned by the vendor.
///
/// Unknown fields are kept in `extra` so the envelope's `pages` list
/// serialises back to what the vendor sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<PageDimensions>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OcrPage {
    /// Text of this page: `text` when present, otherwise `markdown`.
    pub fn page_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.markdown.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub pages_processed: Option<u64>,
    #[serde(default)]
    pub doc_size_bytes: Option<u64>,
}

// ── Envelope ─────────────────────────────────────────────────────────────

/// Normalised OCR result returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrEnvelope {
    pub text: String,
    pub pages: Vec<OcrPage>,
    #[serde(rename = "documentInfo")]
    pub document_info: DocumentInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    #[serde(rename = "pageCount")]
    pub page_count: usize,
}

impl From<OcrResponse> for OcrEnvelope {
    fn from(response: OcrResponse) -> Self {
        let pages = response.pages.unwrap_or_default();
        let text = match response.content {
            Some(content) => content,
            None => pages
                .iter()
                .filter_map(OcrPage::page_text)
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        OcrEnvelope {
            text,
            document_info: DocumentInfo {
                page_count: pages.len(),
            },
            pages,
        }
    }
}

// ── Readiness ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum FileState {
    Ready,
    Pending,
    Failed(String),
}

impl FileState {
    fn of(file: &VendorFile) -> Self {
        match file.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => FileState::Ready,
            Some("processing" | "pending" | "uploading" | "queued") => FileState::Pending,
            Some(s @ ("error" | "failed" | "deleted")) => FileState::Failed(s.to_string()),
            Some(_) => FileState::Ready,
        }
    }
}

// ── Provider ─────────────────────────────────────────────────────────────

pub struct MistralProvider {
    client: reqwest::Client,
    config: MistralConfig,
}

impl MistralProvider {
    pub fn new(config: &MistralConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: http_client()?,
            config: config.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, ProxyError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ProxyError::MissingCredential { provider: "mistral" })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// Step 1: upload the raw bytes for OCR.
    async fn upload(&self, key: &str, file: UploadedFile) -> Result<VendorFile, ProxyError> {
        let form = Form::new()
            .text("purpose", "ocr")
            .part("file", file_part(file));
        send_json("upload", self.client.post(self.url("/v1/files")).bearer_auth(key).multipart(form))
            .await
    }

    /// Step 2: read the file record back until the vendor reports it usable.
    async fn wait_until_ready(&self, key: &str, id: &str) -> Result<VendorFile, ProxyError> {
        let attempts = self.config.readiness_attempts.max(1);
        let interval = Duration::from_millis(self.config.readiness_interval_ms);

        for attempt in 1..=attempts {
            let file: VendorFile = send_json(
                "retrieve",
                self.client
                    .get(self.url(&format!("/v1/files/{id}")))
                    .bearer_auth(key),
            )
            .await?;

            match FileState::of(&file) {
                FileState::Ready => return Ok(file),
                FileState::Failed(status) => {
                    return Err(ProxyError::Vendor {
                        step: "retrieve",
                        message: format!("Uploaded file {id} reported status '{status}'"),
                    })
                }
                FileState::Pending => {
                    debug!("File {}: not ready (check {}/{})", id, attempt, attempts);
                    if attempt < attempts {
                        sleep(interval).await;
                    }
                }
            }
        }

        Err(ProxyError::Vendor {
            step: "retrieve",
            message: format!("Uploaded file {id} was not ready after {attempts} checks"),
        })
    }

    /// Step 3: obtain a time-limited URL the OCR job can read.
    async fn signed_url(&self, key: &str, id: &str) -> Result<SignedUrl, ProxyError> {
        send_json(
            "signed_url",
            self.client
                .get(self.url(&format!("/v1/files/{id}/url")))
                .query(&[("expiry", self.config.signed_url_expiry_hours)])
                .bearer_auth(key),
        )
        .await
    }

    /// Step 4: run OCR on the signed URL, bounded by the configured timeout.
    async fn ocr(&self, key: &str, document_url: &str) -> Result<OcrResponse, ProxyError> {
        let body = OcrRequest {
            model: &self.config.model,
            document: DocumentSource::DocumentUrl { document_url },
        };
        let secs = self.config.ocr_timeout_secs;
        let call = send_json(
            "ocr",
            self.client.post(self.url("/v1/ocr")).bearer_auth(key).json(&body),
        );

        timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| ProxyError::Vendor {
                step: "ocr",
                message: format!("OCR job did not complete within {secs}s"),
            })?
    }
}

#[async_trait]
impl DocumentProvider for MistralProvider {
    fn name(&self) -> &'static str {
        "mistral"
    }

    fn ensure_configured(&self) -> Result<(), ProxyError> {
        self.api_key().map(|_| ())
    }

    async fn analyze(
        &self,
        file: UploadedFile,
        prompt: &str,
    ) -> Result<AnalysisResult, ProxyError> {
        let key = self.api_key()?;
        let start = Instant::now();
        // The OCR endpoint takes no instruction text.
        debug!("Prompt not forwarded to OCR: {:?}", prompt);

        let uploaded = self.upload(key, file).await?;
        info!("Uploaded file for OCR: {}", uploaded.id);

        let ready = self.wait_until_ready(key, &uploaded.id).await?;
        debug!(
            "File {} ready ({:?} bytes, purpose {:?})",
            ready.id, ready.bytes, ready.purpose
        );

        let signed = self.signed_url(key, &ready.id).await?;
        debug!("Signed URL issued for {}", ready.id);

        let response = self.ocr(key, &signed.url).await?;
        let envelope = OcrEnvelope::from(response);
        info!(
            "OCR complete: {} pages, {} chars, {}ms",
            envelope.document_info.page_count,
            envelope.text.len(),
            start.elapsed().as_millis()
        );

        Ok(AnalysisResult::Envelope(envelope))
    }
}

/// Send one vendor request and decode its JSON body.
async fn send_json<T: DeserializeOwned>(
    step: &'static str,
    request: RequestBuilder,
) -> Result<T, ProxyError> {
    let vendor = |message: String| ProxyError::Vendor { step, message };

    let response = request.send().await.map_err(|e| vendor(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await;
        return Err(vendor(failure_message(status.as_u16(), body)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| vendor(format!("Unexpected response body: {e}")))
}

/// `details` text for a non-success vendor answer.
fn failure_message<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> String {
    match body {
        Ok(body) => format!("HTTP {status}: {body}"),
        Err(e) => format!("HTTP {status} (failed to read response body: {e})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_message_keeps_body_or_read_error() {
        assert_eq!(
            failure_message::<String>(422, Ok("bad document".into())),
            "HTTP 422: bad document"
        );
        assert_eq!(
            failure_message(502, Err::<String, _>("connection reset")),
            "HTTP 502 (failed to read response body: connection reset)"
        );
    }

    #[test]
    fn page_count_matches_pages() {
        let response: OcrResponse = serde_json::from_value(json!({
            "pages": [
                { "index": 0, "markdown": "# Title" },
                { "index": 1, "markdown": "Body" },
                { "index": 2, "markdown": "" }
            ]
        }))
        .unwrap();
        let env = OcrEnvelope::from(response);
        assert_eq!(env.document_info.page_count, 3);
        assert_eq!(env.pages.len(), 3);
    }

    #[test]
    fn page_count_is_zero_without_pages() {
        let env = OcrEnvelope::from(OcrResponse::default());
        assert_eq!(env.document_info.page_count, 0);
        assert!(env.pages.is_empty());
        assert_eq!(env.text, "");
    }

    #[test]
    fn top_level_content_wins() {
        let response: OcrResponse = serde_json::from_value(json!({
            "content": "whole document",
            "pages": [{ "text": "page one" }]
        }))
        .unwrap();
        assert_eq!(OcrEnvelope::from(response).text, "whole document");
    }

    #[test]
    fn page_text_joined_with_blank_lines() {
        let response: OcrResponse = serde_json::from_value(json!({
            "pages": [
                { "text": "first" },
                { "markdown": "second" },
                { "images": [] },
                { "text": "third", "markdown": "ignored" }
            ]
        }))
        .unwrap();
        assert_eq!(OcrEnvelope::from(response).text, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn pages_keep_unknown_fields() {
        let raw = json!({
            "index": 0,
            "markdown": "x",
            "dimensions": { "dpi": 200, "height": 2200, "width": 1700 },
            "images": [],
            "header": null,
            "tables": [{ "id": "t1" }]
        });
        let response: OcrResponse =
            serde_json::from_value(json!({ "pages": [raw.clone()] })).unwrap();
        let env = OcrEnvelope::from(response);
        assert_eq!(serde_json::to_value(&env.pages[0]).unwrap(), raw);
    }

    #[test]
    fn envelope_wire_shape() {
        let env = OcrEnvelope::from(OcrResponse::default());
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(
            v,
            json!({ "text": "", "pages": [], "documentInfo": { "pageCount": 0 } })
        );
    }

    #[test]
    fn ocr_request_shape() {
        let body = OcrRequest {
            model: "mistral-ocr-latest",
            document: DocumentSource::DocumentUrl {
                document_url: "https://signed.example/abc",
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "mistral-ocr-latest",
                "document": { "type": "document_url", "document_url": "https://signed.example/abc" }
            })
        );
    }

    #[test]
    fn file_state_from_status() {
        let mut f = VendorFile {
            id: "f".into(),
            filename: None,
            bytes: None,
            purpose: None,
            status: None,
        };
        assert_eq!(FileState::of(&f), FileState::Ready);
        f.status = Some("Processing".into());
        assert_eq!(FileState::of(&f), FileState::Pending);
        f.status = Some("failed".into());
        assert_eq!(FileState::of(&f), FileState::Failed("failed".into()));
        f.status = Some("processed".into());
        assert_eq!(FileState::of(&f), FileState::Ready);
    }
}
