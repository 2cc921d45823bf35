//! Document-analysis providers behind the single proxy route.
//!
//! The route in [`crate::server`] does not know which vendor it talks to. It
//! holds an `Arc<dyn DocumentProvider>` chosen once from
//! [`crate::config::ProxyConfig::provider`] and calls it for every upload.
//!
//! ```text
//!                   ┌─▶ agentic  multipart forward, Basic auth, passthrough JSON
//! route ─▶ provider ┤
//!                   └─▶ mistral  upload ─▶ retrieve ─▶ signed URL ─▶ OCR ─▶ envelope
//! ```
//!
//! 1. [`agentic`] — one outbound call; the field name depends on the MIME type
//! 2. [`mistral`] — four sequential vendor calls, reshaped into [`OcrEnvelope`]

pub mod agentic;
pub mod mistral;

use crate::config::{ProviderKind, ProxyConfig};
use crate::error::ProxyError;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub use agentic::AgenticProvider;
pub use mistral::{DocumentInfo, MistralProvider, OcrEnvelope, OcrPage};

/// What a provider hands back to the route.
///
/// Serialised untagged: the HTTP body is the bare JSON of whichever variant.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    /// Vendor JSON forwarded unmodified.
    PassThrough(serde_json::Value),
    /// Normalised `{text, pages, documentInfo}` shape.
    Envelope(OcrEnvelope),
}

/// One external document-analysis service.
///
/// Implementations are immutable after construction and shared across
/// concurrent requests.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fail with [`ProxyError::MissingCredential`] when no key is configured.
    ///
    /// Called by the route before the request body is read, so a
    /// misconfigured server never touches the network.
    fn ensure_configured(&self) -> Result<(), ProxyError>;

    /// Send `file` to the service and return its answer.
    async fn analyze(&self, file: UploadedFile, prompt: &str)
        -> Result<AnalysisResult, ProxyError>;
}

/// Build the provider selected by `config`.
pub fn from_config(config: &ProxyConfig) -> Result<Arc<dyn DocumentProvider>, ProxyError> {
    let provider: Arc<dyn DocumentProvider> = match config.provider {
        ProviderKind::Agentic => Arc::new(AgenticProvider::new(&config.agentic)?),
        ProviderKind::Mistral => Arc::new(MistralProvider::new(&config.mistral)?),
    };
    Ok(provider)
}

/// Shared outbound HTTP client settings.
///
/// No request timeout is set here; providers that need one apply it per call.
pub(crate) fn http_client() -> Result<reqwest::Client, ProxyError> {
    reqwest::Client::builder()
        .user_agent(concat!("edgequake-ocr-proxy/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProxyError::Request(format!("Failed to build HTTP client: {e}")))
}

/// Build a multipart file part, keeping the declared type when it parses.
pub(crate) fn file_part(file: UploadedFile) -> reqwest::multipart::Part {
    let UploadedFile {
        bytes,
        content_type,
        filename,
    } = file;
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.clone());
    match part.mime_str(&content_type) {
        Ok(p) => p,
        Err(_) => {
            tracing::warn!(
                "Declared type '{}' is not a valid MIME type; sending without it",
                content_type
            );
            reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_selects_provider() {
        let agentic = from_config(&ProxyConfig::default()).unwrap();
        assert_eq!(agentic.name(), "agentic");

        let config = ProxyConfig::builder()
            .provider(ProviderKind::Mistral)
            .build()
            .unwrap();
        let mistral = from_config(&config).unwrap();
        assert_eq!(mistral.name(), "mistral");
    }

    #[test]
    fn unconfigured_providers_refuse() {
        let config = ProxyConfig::builder()
            .provider(ProviderKind::Mistral)
            .build()
            .unwrap();
        for p in [
            from_config(&ProxyConfig::default()).unwrap(),
            from_config(&config).unwrap(),
        ] {
            assert!(matches!(
                p.ensure_configured(),
                Err(ProxyError::MissingCredential { .. })
            ));
        }
    }

    #[test]
    fn analysis_result_serialises_untagged() {
        let v = serde_json::json!({ "data": { "markdown": "hi" } });
        let out = serde_json::to_value(AnalysisResult::PassThrough(v.clone())).unwrap();
        assert_eq!(out, v);
    }
}
