//! Agentic document-analysis provider: forward the upload as-is.
//!
//! The vendor's multipart schema is type-discriminated: PDFs go under `pdf`,
//! everything else under `image`. Apart from choosing that field name the
//! proxy builds a fresh body (file, prompt, fixed `model=agentic`), adds a
//! Basic Authorization header, makes exactly one call, and hands back
//! whatever JSON the vendor returned.

use super::{file_part, http_client, AnalysisResult, DocumentProvider};
use crate::config::AgenticConfig;
use crate::error::ProxyError;
use crate::prompts::{AGENTIC_MODEL, MODEL_FIELD, PDF_MIME, PROMPT_FIELD};
use crate::upload::UploadedFile;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use tracing::{error, info};

/// Outbound field name for a file of the given declared type.
///
/// Only the exact type `application/pdf` selects `pdf`.
pub fn field_name_for(content_type: &str) -> &'static str {
    if content_type == PDF_MIME {
        "pdf"
    } else {
        "image"
    }
}

pub struct AgenticProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl AgenticProvider {
    pub fn new(config: &AgenticConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: http_client()?,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint().to_string(),
        })
    }

    fn api_key(&self) -> Result<&str, ProxyError> {
        self.api_key
            .as_deref()
            .ok_or(ProxyError::MissingCredential { provider: "agentic" })
    }
}

#[async_trait]
impl DocumentProvider for AgenticProvider {
    fn name(&self) -> &'static str {
        "agentic"
    }

    fn ensure_configured(&self) -> Result<(), ProxyError> {
        self.api_key().map(|_| ())
    }

    async fn analyze(
        &self,
        file: UploadedFile,
        prompt: &str,
    ) -> Result<AnalysisResult, ProxyError> {
        let api_key = self.api_key()?;

        let field_name = field_name_for(&file.content_type);
        info!(
            "Using field name '{}' for file type: {}",
            field_name, file.content_type
        );

        let form = Form::new()
            .part(field_name, file_part(file))
            .text(PROMPT_FIELD, prompt.to_string())
            .text(MODEL_FIELD, AGENTIC_MODEL);

        info!("Calling external API: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Basic {api_key}"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProxyError::Request(e.to_string()))?;

        let status = response.status();
        info!("API response status: {}", status.as_u16());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ProxyError::Request(e.to_string()))?;
            error!("API error response: {}", body);
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProxyError::Request(format!("Invalid JSON from API: {e}")))?;
        info!("API request successful");
        Ok(AnalysisResult::PassThrough(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_uses_pdf_field() {
        assert_eq!(field_name_for("application/pdf"), "pdf");
    }

    #[test]
    fn pdf_match_is_exact() {
        assert_eq!(field_name_for("Application/PDF"), "image");
        assert_eq!(field_name_for("application/pdf; charset=binary"), "image");
    }

    #[test]
    fn everything_else_uses_image_field() {
        for ct in ["image/png", "image/jpeg", "application/octet-stream", "", "text/plain"] {
            assert_eq!(field_name_for(ct), "image", "content type {ct:?}");
        }
    }

    #[test]
    fn missing_key_is_reported() {
        let p = AgenticProvider::new(&AgenticConfig::default()).unwrap();
        assert!(matches!(
            p.ensure_configured(),
            Err(ProxyError::MissingCredential { provider: "agentic" })
        ));
    }
}
