//! HTTP surface: the upload page and the proxy route.
//!
//! | Method | Path               | Handler                |
//! |--------|--------------------|------------------------|
//! | GET    | `/`                | embedded upload form   |
//! | GET    | `/healthz`         | liveness               |
//! | POST   | `/api/process-pdf` | [`process_pdf`]        |
//!
//! Requests share nothing but the immutable [`AppState`]; each one is
//! handled independently and its outbound calls are awaited in sequence.

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::provider::{self, AnalysisResult, DocumentProvider};
use crate::upload::read_proxy_request;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Path of the proxy route, shared with [`crate::client`].
pub const PROCESS_PDF_PATH: &str = "/api/process-pdf";

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn DocumentProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self { provider }
    }

    /// Build the provider selected by `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        Ok(Self::new(provider::from_config(config)?))
    }
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(PROCESS_PDF_PATH, post(process_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: ProxyConfig) -> Result<(), ProxyError> {
    let state = AppState::from_config(&config)?;
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| ProxyError::Server(format!("failed to bind {}: {e}", config.bind_addr)))?;
    info!(
        "Listening on http://{} (provider: {})",
        config.bind_addr, config.provider
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ProxyError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Relay one upload to the configured provider.
///
/// Order matters: the credential is checked before the body is read, and the
/// file is checked before any outbound call.
pub async fn process_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ProxyError> {
    info!("API route called (provider: {})", state.provider.name());
    state.provider.ensure_configured()?;

    let multipart = multipart.map_err(|e| ProxyError::Request(e.body_text()))?;
    let (file, prompt) = read_proxy_request(multipart).await?.require_file()?;

    info!(
        "Processing file: {}, type: {}, size: {} bytes",
        file.filename,
        file.content_type,
        file.size()
    );

    let result = state.provider.analyze(file, &prompt).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadedFile;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records calls and echoes what it received.
    struct EchoProvider {
        configured: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn ensure_configured(&self) -> Result<(), ProxyError> {
            if self.configured {
                Ok(())
            } else {
                Err(ProxyError::MissingCredential { provider: "echo" })
            }
        }

        async fn analyze(
            &self,
            file: UploadedFile,
            prompt: &str,
        ) -> Result<AnalysisResult, ProxyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::PassThrough(json!({
                "filename": file.filename,
                "type": file.content_type,
                "size": file.size(),
                "prompt": prompt,
            })))
        }
    }

    fn server(configured: bool) -> (TestServer, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider {
            configured,
            calls: AtomicUsize::new(0),
        });
        let app = router(AppState::new(provider.clone()), 1024 * 1024);
        (TestServer::new(app).unwrap(), provider)
    }

    fn pdf_form() -> MultipartForm {
        MultipartForm::new().add_part(
            "image",
            Part::bytes(b"%PDF-1.4 test".to_vec())
                .file_name("statement.pdf")
                .mime_type("application/pdf"),
        )
    }

    #[tokio::test]
    async fn index_serves_upload_form() {
        let (server, _) = server(true);
        let response = server.get("/").await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("/api/process-pdf"));
    }

    #[tokio::test]
    async fn default_prompt_is_applied() {
        let (server, provider) = server(true);
        let response = server.post(PROCESS_PDF_PATH).multipart(pdf_form()).await;
        response.assert_status(StatusCode::OK);
        response.assert_json(&json!({
            "filename": "statement.pdf",
            "type": "application/pdf",
            "size": 13,
            "prompt": "Please analyze this document",
        }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_prompt_is_forwarded() {
        let (server, _) = server(true);
        let form = pdf_form().add_text("prompts", "List the totals");
        let response = server.post(PROCESS_PDF_PATH).multipart(form).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["prompt"], "List the totals");
    }

    #[tokio::test]
    async fn missing_file_is_400_without_provider_call() {
        let (server, provider) = server(true);
        let form = MultipartForm::new().add_text("prompts", "hello");
        let response = server.post(PROCESS_PDF_PATH).multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No file provided" }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_500_without_provider_call() {
        let (server, provider) = server(false);
        let response = server.post(PROCESS_PDF_PATH).multipart(pdf_form()).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Server configuration error: Missing API key" }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_multipart_body_is_request_failed() {
        let (server, provider) = server(true);
        let response = server.post(PROCESS_PDF_PATH).text("not a form").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Request failed");
        assert!(body["details"].is_string());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let (server, _) = server(false);
        server.get("/healthz").await.assert_text("ok");
    }
}
