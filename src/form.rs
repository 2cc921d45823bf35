//! Upload form: selection, submission, and result rendering.
//!
//! [`UploadForm`] holds the same local state as the browser page
//! (`assets/index.html`): the current selection, the visible error, the last
//! rendered result, and the submit control. The `ocr-proxy submit` command
//! drives it from the terminal; the browser page implements the identical
//! contract in JavaScript.
//!
//! ```text
//!  select(pdf) ──▶ Ready ──submit──▶ Processing ──(ok | error)──▶ Ready
//!  select(other) ─▶ selection cleared, error shown
//! ```

use crate::client::VisionApi;
use crate::error::FormError;
use crate::progress::{NoopFormObserver, SharedObserver, SubmitState};
use crate::prompts::PDF_MIME;
use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A file the user picked, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    /// MIME type as declared by the picker (browser) or guessed from the
    /// extension (CLI).
    pub declared_type: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, declared_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            declared_type: declared_type.into(),
        }
    }

    /// Declare the type from the file extension, as a browser picker would.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let declared_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Self::new(path, declared_type)
    }

    pub fn is_pdf(&self) -> bool {
        self.declared_type == PDF_MIME
    }
}

/// What a call to [`UploadForm::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing selected or a request already in flight.
    Skipped,
    /// The proxy answered; this is the rendered text.
    Rendered(String),
    /// Reading or sending failed; this is the visible error.
    Failed(String),
}

/// Local state of the upload form.
pub struct UploadForm {
    selection: Option<SelectedFile>,
    state: SubmitState,
    error: Option<String>,
    result: Option<String>,
    prompt: Option<String>,
    observer: SharedObserver,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UploadForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadForm")
            .field("selection", &self.selection)
            .field("state", &self.state)
            .field("error", &self.error)
            .field("result", &self.result.as_ref().map(|r| r.len()))
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl UploadForm {
    pub fn new() -> Self {
        Self {
            selection: None,
            state: SubmitState::Ready,
            error: None,
            result: None,
            prompt: None,
            observer: Arc::new(NoopFormObserver),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Override the helper's default prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn selection(&self) -> Option<&SelectedFile> {
        self.selection.as_ref()
    }

    pub fn submit_state(&self) -> SubmitState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// The submit control is enabled only with a selection and no request
    /// in flight.
    pub fn can_submit(&self) -> bool {
        self.selection.is_some() && self.state == SubmitState::Ready
    }

    /// Accept `file` if it is a PDF; otherwise clear the selection and show
    /// an error.
    pub fn select(&mut self, file: SelectedFile) -> Result<(), FormError> {
        if file.is_pdf() {
            self.observer.on_selected(&file.name);
            self.selection = Some(file);
            self.result = None;
            self.error = None;
            Ok(())
        } else {
            self.selection = None;
            let err = FormError::NotAPdf {
                name: file.name,
                declared_type: file.declared_type,
            };
            self.set_error(err.to_string());
            Err(err)
        }
    }

    /// Read the selection, send it through `api`, and store the outcome.
    ///
    /// The submit control goes to `Processing` and back to `Ready` exactly
    /// once per non-skipped call, whatever the outcome.
    pub async fn submit<A>(&mut self, api: &A) -> SubmitOutcome
    where
        A: VisionApi + ?Sized,
    {
        if !self.can_submit() {
            return SubmitOutcome::Skipped;
        }
        let Some(file) = self.selection.clone() else {
            return SubmitOutcome::Skipped;
        };

        self.set_state(SubmitState::Processing);
        self.error = None;

        let outcome = match read_file(&file).await {
            Ok(content) => {
                debug!("Read {} bytes from {}", content.len(), file.path.display());
                match api.call_vision_api(content, self.prompt.as_deref()).await {
                    Ok(response) => SubmitOutcome::Rendered(render_result(&response)),
                    Err(e) => SubmitOutcome::Failed(e.to_string()),
                }
            }
            Err(e) => {
                warn!("{}: {:?}", e, file.path);
                SubmitOutcome::Failed(e.to_string())
            }
        };

        match &outcome {
            SubmitOutcome::Rendered(text) => {
                self.observer.on_result(text.len());
                self.result = Some(text.clone());
            }
            SubmitOutcome::Failed(message) => self.set_error(message.clone()),
            SubmitOutcome::Skipped => {}
        }

        self.set_state(SubmitState::Ready);
        outcome
    }

    fn set_state(&mut self, state: SubmitState) {
        self.state = state;
        self.observer.on_submit_state(state);
    }

    fn set_error(&mut self, message: String) {
        self.observer.on_error(&message);
        self.error = Some(message);
    }
}

async fn read_file(file: &SelectedFile) -> Result<Bytes, FormError> {
    tokio::fs::read(&file.path)
        .await
        .map(Bytes::from)
        .map_err(|source| FormError::ReadFailed {
            path: file.path.clone(),
            source,
        })
}

/// Text to show for a proxy response.
///
/// Chat-style responses show `choices[0].message.content`; anything else is
/// pretty-printed whole.
pub fn render_result(response: &serde_json::Value) -> String {
    match response
        .pointer("/choices/0/message/content")
        .and_then(serde_json::Value::as_str)
        .filter(|content| !content.is_empty())
    {
        Some(content) => content.to_string(),
        None => serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_prefers_chat_content() {
        let v = json!({ "choices": [{ "message": { "content": "Total: $12" } }] });
        assert_eq!(render_result(&v), "Total: $12");
    }

    #[test]
    fn render_falls_back_to_pretty_json() {
        let v = json!({ "text": "hello", "documentInfo": { "pageCount": 1 } });
        let out = render_result(&v);
        assert!(out.contains("\"text\": \"hello\""));
        assert!(out.contains('\n'));
    }

    #[test]
    fn render_treats_empty_content_as_absent() {
        let v = json!({ "choices": [{ "message": { "content": "" } }] });
        let out = render_result(&v);
        assert!(out.contains("\"content\": \"\""), "out: {out}");
    }

    #[test]
    fn render_ignores_non_string_content() {
        let v = json!({ "choices": [{ "message": { "content": null } }] });
        assert!(render_result(&v).contains("choices"));
    }

    #[test]
    fn type_guessed_from_extension() {
        assert!(SelectedFile::from_path("/tmp/a.pdf").is_pdf());
        assert!(!SelectedFile::from_path("/tmp/a.png").is_pdf());
        assert_eq!(SelectedFile::from_path("/tmp/README").declared_type, "");
        assert_eq!(SelectedFile::from_path("/tmp/x/scan.pdf").name, "scan.pdf");
    }

    #[test]
    fn non_pdf_clears_previous_selection() {
        let mut form = UploadForm::new();
        form.select(SelectedFile::new("/tmp/a.pdf", "application/pdf"))
            .unwrap();
        assert!(form.can_submit());

        let err = form
            .select(SelectedFile::new("/tmp/b.png", "image/png"))
            .unwrap_err();
        assert!(matches!(err, FormError::NotAPdf { .. }));
        assert!(form.selection().is_none());
        assert_eq!(form.error(), Some("Please select a valid PDF file"));
        assert!(!form.can_submit());
    }

    #[test]
    fn pdf_selection_clears_error() {
        let mut form = UploadForm::new();
        let _ = form.select(SelectedFile::new("/tmp/b.txt", "text/plain"));
        assert!(form.error().is_some());
        form.select(SelectedFile::new("/tmp/a.pdf", "application/pdf"))
            .unwrap();
        assert!(form.error().is_none());
    }
}
