//! Error types for the edgequake-ocr-proxy library.
//!
//! Three error types reflect the three places a failure can surface:
//!
//! * [`ProxyError`] — raised inside the proxy route. Each variant maps to a
//!   fixed HTTP status and renders as the `{error, details}` JSON body the
//!   browser form and [`crate::client::ProxyClient`] expect.
//!
//! * [`ClientError`] — raised by the API helper when the proxy answers with a
//!   non-2xx status, cannot be reached, or returns something that is not JSON.
//!
//! * [`FormError`] — raised by [`crate::form::UploadForm`] for selection and
//!   file-read problems that never reach the network.
//!
//! None of these are retried. Every failure is surfaced verbatim to the
//! caller, which decides what to show the user.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors the proxy route can return to its caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The selected provider has no credential in the process configuration.
    #[error("Server configuration error: Missing API key")]
    MissingCredential { provider: &'static str },

    // ── Input validation errors ───────────────────────────────────────────
    /// The inbound multipart body had no `image` part.
    #[error("No file provided")]
    NoFile,

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The analysis service answered with a non-success status.
    ///
    /// The proxy answers with the same status and attaches the upstream body.
    #[error("API error: {status}")]
    Upstream { status: u16, body: String },

    /// A vendor interaction step failed (transport error, non-success status,
    /// undecodable response, timeout, or file never became ready).
    #[error("Failed to process document with OCR")]
    Vendor { step: &'static str, message: String },

    /// A configuration value failed validation at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listener could not be bound or the server loop stopped with an
    /// I/O error.
    #[error("Server error: {0}")]
    Server(String),

    // ── Local runtime errors ──────────────────────────────────────────────
    /// The inbound request could not be read or the upstream success body
    /// could not be decoded.
    #[error("Request failed")]
    Request(String),
}

/// JSON body returned for every proxy error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::NoFile => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Vendor { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidConfig(_)
            | ProxyError::Server(_)
            | ProxyError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra context attached as `details`, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            ProxyError::Upstream { body, .. } => Some(body.clone()),
            ProxyError::Vendor { message, .. } => Some(message.clone()),
            ProxyError::Request(detail) => Some(detail.clone()),
            ProxyError::MissingCredential { .. }
            | ProxyError::NoFile
            | ProxyError::InvalidConfig(_)
            | ProxyError::Server(_) => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            ProxyError::MissingCredential { provider } => {
                tracing::error!(provider = *provider, "Missing API key");
            }
            ProxyError::NoFile => {
                tracing::debug!("Client error: {}", self);
            }
            ProxyError::Upstream { status, body } => {
                tracing::error!(status = *status, body = %body, "API error response");
            }
            ProxyError::Vendor { step, message } => {
                tracing::error!(step = *step, "OCR vendor call failed: {}", message);
            }
            ProxyError::InvalidConfig(_) | ProxyError::Server(_) => {
                tracing::error!("{}", self);
            }
            ProxyError::Request(detail) => {
                tracing::error!("Error in API route: {}", detail);
            }
        }

        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// Errors returned by [`crate::client::ProxyClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The proxy answered with a non-2xx status.
    #[error("API error: {status}")]
    Api { status: u16, body: String },

    /// The proxy could not be reached or the connection broke mid-request.
    #[error("Failed to reach the proxy: {0}")]
    Transport(#[from] reqwest::Error),

    /// The proxy answered 2xx but the body was not JSON.
    #[error("Invalid JSON from the proxy: {0}")]
    Decode(String),
}

/// Errors raised by [`crate::form::UploadForm`] before anything is sent.
#[derive(Debug, Error)]
pub enum FormError {
    /// The selected file's declared type is not `application/pdf`.
    #[error("Please select a valid PDF file")]
    NotAPdf { name: String, declared_type: String },

    /// The selected file could not be read into memory.
    #[error("Error reading the file")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
