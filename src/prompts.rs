//! Default prompts and fixed vendor identifiers.
//!
//! Centralising these strings serves two purposes:
//!
//! 1. **Single source of truth** — the proxy, the API helper, and the browser
//!    page all agree on the same defaults.
//!
//! 2. **Testability** — tests assert against the constants instead of
//!    repeating string literals that drift.

/// Prompt the proxy forwards when the inbound request has no `prompts` part.
pub const DEFAULT_PROXY_PROMPT: &str = "Please analyze this document";

/// Prompt the API helper sends when its caller does not supply one.
pub const DEFAULT_CLIENT_PROMPT: &str =
    "Please analyze this document and extract key information.";

/// Model tag sent to the agentic document-analysis API.
pub const AGENTIC_MODEL: &str = "agentic";

/// Default model for the Mistral OCR endpoint.
pub const MISTRAL_OCR_MODEL: &str = "mistral-ocr-latest";

/// Multipart field names on the inbound proxy request.
pub const FILE_FIELD: &str = "image";
pub const PROMPT_FIELD: &str = "prompts";
pub const MODEL_FIELD: &str = "model";

/// The only MIME type the upload form accepts.
pub const PDF_MIME: &str = "application/pdf";
