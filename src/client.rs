//! API helper: post a document to the proxy route.
//!
//! The Rust counterpart of the browser page's `callVisionApi`. It always
//! sends the content under `image` tagged `application/pdf`; choosing the
//! vendor's field name is the proxy's job.
//!
//! No timeout, retry, or cancellation is applied. Callers must handle the
//! returned [`ClientError`].

use crate::error::ClientError;
use crate::prompts::{
    AGENTIC_MODEL, DEFAULT_CLIENT_PROMPT, FILE_FIELD, MODEL_FIELD, PDF_MIME, PROMPT_FIELD,
};
use crate::server::PROCESS_PDF_PATH;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error};

/// Anything that can analyse a PDF on behalf of the upload form.
#[async_trait]
pub trait VisionApi: Send + Sync {
    async fn call_vision_api(
        &self,
        content: Bytes,
        prompt: Option<&str>,
    ) -> Result<serde_json::Value, ClientError>;
}

/// HTTP client for a running proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ProxyClient {
    /// `base_url` is the proxy origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                base_url.as_ref().trim_end_matches('/'),
                PROCESS_PDF_PATH
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(content: Bytes, prompt: &str) -> Result<Form, ClientError> {
        let part = Part::bytes(content.to_vec())
            .file_name("blob")
            .mime_str(PDF_MIME)?;
        Ok(Form::new()
            .part(FILE_FIELD, part)
            .text(PROMPT_FIELD, prompt.to_string())
            .text(MODEL_FIELD, AGENTIC_MODEL))
    }
}

#[async_trait]
impl VisionApi for ProxyClient {
    async fn call_vision_api(
        &self,
        content: Bytes,
        prompt: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        let prompt = prompt.unwrap_or(DEFAULT_CLIENT_PROMPT);
        debug!("Sending {} bytes to {}", content.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(Self::form(content, prompt)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            error!("API error: {}", body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let c = ProxyClient::new("http://localhost:3000/").unwrap();
        assert_eq!(c.endpoint(), "http://localhost:3000/api/process-pdf");
    }
}
