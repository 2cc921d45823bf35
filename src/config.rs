//! Configuration types for the OCR proxy.
//!
//! Everything the proxy needs from its environment is collected once, at
//! startup, into a [`ProxyConfig`] and handed to [`crate::server::router`].
//! Nothing reads environment variables at request time; the binary maps its
//! clap flags (which may come from env vars) onto the builder.
//!
//! Credentials are optional on purpose. A missing key is not a startup error:
//! the server still comes up and every request answers with the 500
//! configuration error until an operator sets the key.

use crate::error::ProxyError;
use crate::prompts::MISTRAL_OCR_MODEL;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default endpoint of the agentic document-analysis API.
pub const DEFAULT_AGENTIC_URL: &str =
    "https://api.va.landing.ai/v1/tools/agentic-document-analysis";

/// Default base URL of the Mistral API.
pub const DEFAULT_MISTRAL_URL: &str = "https://api.mistral.ai";

/// Which external service the proxy route forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Direct multipart forward with Basic auth (variant A).
    #[default]
    Agentic,
    /// Upload / signed URL / OCR job against the Mistral API (variant B).
    Mistral,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Agentic => "agentic",
            ProviderKind::Mistral => "mistral",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agentic" => Ok(ProviderKind::Agentic),
            "mistral" => Ok(ProviderKind::Mistral),
            other => Err(ProxyError::InvalidConfig(format!(
                "unknown provider '{other}' (expected 'agentic' or 'mistral')"
            ))),
        }
    }
}

/// Settings for the agentic document-analysis provider.
#[derive(Clone, Default)]
pub struct AgenticConfig {
    /// Raw credential placed after `Basic ` in the Authorization header.
    pub api_key: Option<String>,
    /// Override for [`DEFAULT_AGENTIC_URL`].
    pub api_url: Option<String>,
}

impl AgenticConfig {
    pub fn endpoint(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_AGENTIC_URL)
    }
}

impl fmt::Debug for AgenticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgenticConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.endpoint())
            .finish()
    }
}

/// Settings for the Mistral OCR provider.
#[derive(Clone)]
pub struct MistralConfig {
    /// Bearer token for every vendor call.
    pub api_key: Option<String>,
    /// Override for [`DEFAULT_MISTRAL_URL`].
    pub api_url: Option<String>,
    /// OCR model name. Default: `mistral-ocr-latest`.
    pub model: String,
    /// Lifetime of the signed URL in hours. Default: 24.
    pub signed_url_expiry_hours: u32,
    /// Upper bound on the OCR call in seconds. Default: 300.
    ///
    /// The OCR endpoint may hold the connection while the job runs; without a
    /// bound a hung job stalls the request forever.
    pub ocr_timeout_secs: u64,
    /// Readiness polls before giving up on an uploaded file. Default: 10.
    pub readiness_attempts: u32,
    /// Delay between readiness polls in milliseconds. Default: 500.
    pub readiness_interval_ms: u64,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: MISTRAL_OCR_MODEL.to_string(),
            signed_url_expiry_hours: 24,
            ocr_timeout_secs: 300,
            readiness_attempts: 10,
            readiness_interval_ms: 500,
        }
    }
}

impl MistralConfig {
    pub fn base_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or(DEFAULT_MISTRAL_URL)
            .trim_end_matches('/')
    }
}

impl fmt::Debug for MistralConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.base_url())
            .field("model", &self.model)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("readiness_attempts", &self.readiness_attempts)
            .field("readiness_interval_ms", &self.readiness_interval_ms)
            .finish()
    }
}

/// Complete proxy configuration.
///
/// Built via [`ProxyConfig::builder()`] or using [`ProxyConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_ocr_proxy::{ProviderKind, ProxyConfig};
///
/// let config = ProxyConfig::builder()
///     .provider(ProviderKind::Mistral)
///     .mistral_api_key("sk-test")
///     .build()
///     .unwrap();
/// assert_eq!(config.provider, ProviderKind::Mistral);
/// ```
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Which provider the proxy route uses. Default: [`ProviderKind::Agentic`].
    pub provider: ProviderKind,
    /// Listen address. Default: `127.0.0.1:3000`.
    pub bind_addr: SocketAddr,
    /// Largest accepted request body in bytes. Default: 50 MiB.
    ///
    /// axum's own default (2 MiB) rejects most scanned PDFs.
    pub max_upload_bytes: usize,
    pub agentic: AgenticConfig,
    pub mistral: MistralConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_bytes: 50 * 1024 * 1024,
            agentic: AgenticConfig::default(),
            mistral: MistralConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Create a new builder for `ProxyConfig`.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.config.provider = kind;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn agentic_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.agentic.api_key = non_empty(key.into());
        self
    }

    pub fn agentic_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.agentic.api_url = non_empty(url.into());
        self
    }

    pub fn mistral_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.mistral.api_key = non_empty(key.into());
        self
    }

    pub fn mistral_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.mistral.api_url = non_empty(url.into());
        self
    }

    pub fn mistral_model(mut self, model: impl Into<String>) -> Self {
        self.config.mistral.model = model.into();
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.mistral.signed_url_expiry_hours = hours.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.mistral.ocr_timeout_secs = secs;
        self
    }

    pub fn readiness_attempts(mut self, n: u32) -> Self {
        self.config.mistral.readiness_attempts = n.max(1);
        self
    }

    pub fn readiness_interval_ms(mut self, ms: u64) -> Self {
        self.config.mistral.readiness_interval_ms = ms;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Missing credentials are accepted; see the module docs.
    pub fn build(self) -> Result<ProxyConfig, ProxyError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(ProxyError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.mistral.model.trim().is_empty() {
            return Err(ProxyError::InvalidConfig("OCR model name must not be empty".into()));
        }
        if c.mistral.ocr_timeout_secs == 0 {
            return Err(ProxyError::InvalidConfig("OCR timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

/// Treat an empty env var the same as an unset one.
fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ProxyConfig::default();
        assert_eq!(c.provider, ProviderKind::Agentic);
        assert_eq!(c.agentic.endpoint(), DEFAULT_AGENTIC_URL);
        assert_eq!(c.mistral.base_url(), DEFAULT_MISTRAL_URL);
        assert_eq!(c.mistral.model, "mistral-ocr-latest");
        assert!(c.agentic.api_key.is_none());
    }

    #[test]
    fn builder_overrides() {
        let c = ProxyConfig::builder()
            .provider(ProviderKind::Mistral)
            .agentic_api_url("http://localhost:9000/analyze")
            .mistral_api_url("http://localhost:9001/")
            .readiness_attempts(0)
            .build()
            .unwrap();
        assert_eq!(c.agentic.endpoint(), "http://localhost:9000/analyze");
        assert_eq!(c.mistral.base_url(), "http://localhost:9001");
        assert_eq!(c.mistral.readiness_attempts, 1);
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let c = ProxyConfig::builder().agentic_api_key("  ").build().unwrap();
        assert!(c.agentic.api_key.is_none());
    }

    #[test]
    fn rejects_zero_upload_limit() {
        assert!(ProxyConfig::builder().max_upload_bytes(0).build().is_err());
    }

    #[test]
    fn debug_redacts_keys() {
        let c = ProxyConfig::builder()
            .agentic_api_key("secret-a")
            .mistral_api_key("secret-b")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-a"));
        assert!(!dbg.contains("secret-b"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn provider_kind_parses() {
        assert_eq!("Mistral".parse::<ProviderKind>().unwrap(), ProviderKind::Mistral);
        assert_eq!("agentic".parse::<ProviderKind>().unwrap(), ProviderKind::Agentic);
        assert!("tesseract".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn validation_errors_carry_their_reason() {
        let err = ProxyConfig::builder().ocr_timeout_secs(0).build().unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: OCR timeout must be ≥ 1s");

        let err = ProxyConfig::builder().mistral_model(" ").build().unwrap_err();
        assert!(err.to_string().contains("OCR model name must not be empty"));

        let err = "bogus".parse::<ProviderKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: unknown provider 'bogus' (expected 'agentic' or 'mistral')"
        );
    }
}
