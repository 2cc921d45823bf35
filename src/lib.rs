//! # edgequake-ocr-proxy
//!
//! Upload a PDF from a browser page or the command line, relay it to a hosted
//! document-analysis / OCR service, and show the extracted text.
//!
//! ## Request flow
//!
//! ```text
//! Upload form (browser page or `ocr-proxy submit`)
//!  │
//!  ├─ 1. Form      accept PDFs only, Ready → Processing → Ready
//!  ├─ 2. Helper    multipart { image, prompts, model } → POST /api/process-pdf
//!  ├─ 3. Route     credential check → parse → file check
//!  ├─ 4. Provider  agentic (forward as-is) | mistral (upload → sign → OCR)
//!  └─ 5. Response  vendor JSON or {text, pages, documentInfo}, or {error, details}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr_proxy::{serve, ProviderKind, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProxyConfig::builder()
//!         .provider(ProviderKind::Mistral)
//!         .mistral_api_key(std::env::var("MISTRAL_API_KEY").unwrap_or_default())
//!         .build()?;
//!     serve(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-proxy` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Providers
//!
//! | Provider  | Auth   | Outbound calls | Response |
//! |-----------|--------|----------------|----------|
//! | `agentic` | Basic  | 1              | vendor JSON, unmodified |
//! | `mistral` | Bearer | 4 (sequential) | `{text, pages, documentInfo}` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ProxyClient, VisionApi};
pub use config::{AgenticConfig, MistralConfig, ProviderKind, ProxyConfig, ProxyConfigBuilder};
pub use error::{ClientError, FormError, ProxyError};
pub use form::{render_result, SelectedFile, SubmitOutcome, UploadForm};
pub use progress::{FormObserver, NoopFormObserver, SubmitState};
pub use provider::{AnalysisResult, DocumentProvider, OcrEnvelope};
pub use server::{router, serve, AppState, PROCESS_PDF_PATH};
pub use upload::{ProxyRequest, UploadedFile};
