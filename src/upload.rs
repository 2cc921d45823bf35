//! Inbound request parsing: multipart body → [`ProxyRequest`].
//!
//! The browser form and [`crate::client::ProxyClient`] both send the file
//! under `image` and the instruction under `prompts`. Any other part (the
//! helper also sends `model`) is ignored; the outbound model tag is fixed per
//! provider.

use crate::error::ProxyError;
use crate::prompts::{DEFAULT_PROXY_PROMPT, FILE_FIELD, PROMPT_FIELD};
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

/// A file received from the caller, held only for one request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    /// Declared MIME type. Empty parts default to `application/octet-stream`.
    pub content_type: String,
    pub filename: String,
}

impl UploadedFile {
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The parsed inbound body.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub file: Option<UploadedFile>,
    pub prompt: String,
}

impl ProxyRequest {
    /// Take the file or fail with [`ProxyError::NoFile`].
    pub fn require_file(self) -> Result<(UploadedFile, String), ProxyError> {
        match self.file {
            Some(file) => Ok((file, self.prompt)),
            None => Err(ProxyError::NoFile),
        }
    }
}

/// Read every part of the multipart body.
///
/// A read failure is a local runtime error (500 `Request failed`), not a
/// validation error; only a body that parses but lacks the file is a 400.
pub async fn read_proxy_request(mut multipart: Multipart) -> Result<ProxyRequest, ProxyError> {
    let mut file = None;
    let mut prompt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::Request(format!("Failed to parse multipart data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ProxyError::Request(format!("Failed to read file part: {e}")))?;
                file = Some(UploadedFile {
                    bytes,
                    content_type,
                    filename,
                });
            }
            PROMPT_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ProxyError::Request(format!("Failed to read prompts: {e}")))?;
                prompt = Some(text);
            }
            other => {
                debug!("Ignoring multipart field '{}'", other);
            }
        }
    }

    Ok(ProxyRequest {
        file,
        prompt: resolve_prompt(prompt),
    })
}

/// Fall back to the default prompt when the part is absent or empty.
pub fn resolve_prompt(prompt: Option<String>) -> String {
    match prompt {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_PROXY_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_defaults_when_absent_or_empty() {
        assert_eq!(resolve_prompt(None), DEFAULT_PROXY_PROMPT);
        assert_eq!(resolve_prompt(Some(String::new())), DEFAULT_PROXY_PROMPT);
        assert_eq!(resolve_prompt(Some("Summarise".into())), "Summarise");
    }

    #[test]
    fn whitespace_prompt_is_forwarded_as_is() {
        assert_eq!(resolve_prompt(Some("  ".into())), "  ");
    }

    #[test]
    fn require_file_without_file_is_no_file() {
        let req = ProxyRequest {
            file: None,
            prompt: DEFAULT_PROXY_PROMPT.into(),
        };
        assert!(matches!(req.require_file(), Err(ProxyError::NoFile)));
    }

    #[test]
    fn require_file_returns_file_and_prompt() {
        let req = ProxyRequest {
            file: Some(UploadedFile::new(&b"%PDF-1.7"[..], "application/pdf", "a.pdf")),
            prompt: "p".into(),
        };
        let (file, prompt) = req.require_file().unwrap();
        assert_eq!(file.size(), 8);
        assert_eq!(prompt, "p");
    }
}
