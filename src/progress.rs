//! Observer trait for upload-form state changes.
//!
//! Inject an [`Arc<dyn FormObserver>`] via
//! [`crate::form::UploadForm::with_observer`] to be told whenever the submit
//! control changes state, a selection is accepted or rejected, or a request
//! finishes. The CLI uses it to drive a spinner line; tests use it to count
//! transitions.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocr_proxy::{FormObserver, SubmitState, UploadForm};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<SubmitState>>);
//!
//! impl FormObserver for Recorder {
//!     fn on_submit_state(&self, state: SubmitState) {
//!         self.0.lock().unwrap().push(state);
//!     }
//! }
//!
//! let form = UploadForm::new().with_observer(Arc::new(Recorder::default()));
//! assert_eq!(form.submit_state(), SubmitState::Ready);
//! ```

use std::sync::Arc;

/// State of the submit control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    /// Enabled (when a file is selected), labelled "Process PDF".
    #[default]
    Ready,
    /// Disabled, labelled "Processing...".
    Processing,
}

impl SubmitState {
    pub fn label(&self) -> &'static str {
        match self {
            SubmitState::Ready => "Process PDF",
            SubmitState::Processing => "Processing...",
        }
    }
}

/// Called by [`crate::form::UploadForm`] as its state changes.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait FormObserver: Send + Sync {
    /// The submit control moved to `state`.
    fn on_submit_state(&self, state: SubmitState) {
        let _ = state;
    }

    /// A file was accepted as the current selection.
    fn on_selected(&self, name: &str) {
        let _ = name;
    }

    /// The visible error changed to `message`.
    fn on_error(&self, message: &str) {
        let _ = message;
    }

    /// A request finished successfully with `rendered_len` bytes of output.
    fn on_result(&self, rendered_len: usize) {
        let _ = rendered_len;
    }
}

/// A no-op implementation; the default when no observer is configured.
pub struct NoopFormObserver;

impl FormObserver for NoopFormObserver {}

/// Convenience alias matching the type stored in [`crate::form::UploadForm`].
pub type SharedObserver = Arc<dyn FormObserver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopFormObserver;
        o.on_submit_state(SubmitState::Processing);
        o.on_selected("a.pdf");
        o.on_error("boom");
        o.on_result(10);
    }

    #[test]
    fn labels() {
        assert_eq!(SubmitState::Ready.label(), "Process PDF");
        assert_eq!(SubmitState::Processing.label(), "Processing...");
        assert_eq!(SubmitState::default(), SubmitState::Ready);
    }
}
