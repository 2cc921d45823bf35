//! CLI binary for edgequake-ocr-proxy.
//!
//! `serve` maps flags to `ProxyConfig` and runs the proxy; `submit` drives
//! the upload form from the terminal against a running proxy.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_ocr_proxy::{
    serve, FormObserver, ProviderKind, ProxyClient, ProxyConfig, SelectedFile, SubmitOutcome,
    SubmitState, UploadForm,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI form observer using indicatif ────────────────────────────────────────

/// Shows a spinner while the submit control is `Processing`.
struct CliFormObserver {
    bar: ProgressBar,
}

impl CliFormObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        Arc::new(Self { bar })
    }
}

impl FormObserver for CliFormObserver {
    fn on_submit_state(&self, state: SubmitState) {
        match state {
            SubmitState::Processing => {
                self.bar.set_message(state.label());
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            SubmitState::Ready => self.bar.finish_and_clear(),
        }
    }

    fn on_selected(&self, name: &str) {
        self.bar.println(format!("{} {}", dim("selected"), name));
    }

    fn on_error(&self, message: &str) {
        self.bar.println(format!("{} {}", red("✗"), red(message)));
    }

    fn on_result(&self, rendered_len: usize) {
        self.bar.println(format!(
            "{} {}",
            green("✔"),
            dim(&format!("{rendered_len} chars"))
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the proxy against the agentic document-analysis API
  LANDING_AI_API_KEY=... ocr-proxy serve

  # Run the proxy against Mistral OCR on another port
  MISTRAL_API_KEY=... ocr-proxy serve --provider mistral --bind 0.0.0.0:8080

  # Send a PDF to a running proxy and print the result
  ocr-proxy submit statement.pdf

  # Custom instruction
  ocr-proxy submit statement.pdf --prompt "List every line item with its amount"

ENVIRONMENT VARIABLES:
  OCR_PROXY_PROVIDER       agentic (default) or mistral
  OCR_PROXY_BIND           Listen address (default 127.0.0.1:3000)
  LANDING_AI_API_KEY       Credential for the agentic provider (sent as Basic)
  VISION_API_URL           Override the agentic endpoint
  MISTRAL_API_KEY          Credential for the mistral provider
  MISTRAL_API_URL          Override the Mistral base URL
  MISTRAL_OCR_MODEL        OCR model (default mistral-ocr-latest)
  OCR_PROXY_URL            Proxy origin used by `submit`
  RUST_LOG                 Log filter, e.g. edgequake_ocr_proxy=debug
"#;

/// Relay PDF uploads to a hosted document-analysis or OCR service.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-proxy",
    version,
    about = "Relay PDF uploads to a hosted document-analysis or OCR service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR_PROXY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OCR_PROXY_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy server.
    Serve(ServeArgs),
    /// Submit a PDF to a running proxy and print the result.
    Submit(SubmitArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Which service uploads are relayed to.
    #[arg(long, env = "OCR_PROXY_PROVIDER", default_value = "agentic")]
    provider: ProviderKind,

    /// Listen address.
    #[arg(long, env = "OCR_PROXY_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Largest accepted upload in bytes.
    #[arg(long, env = "OCR_PROXY_MAX_UPLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Agentic document-analysis credential.
    #[arg(long, env = "LANDING_AI_API_KEY", hide_env_values = true)]
    landing_api_key: Option<String>,

    /// Agentic document-analysis endpoint.
    #[arg(long, env = "VISION_API_URL")]
    vision_api_url: Option<String>,

    /// Mistral credential.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    mistral_api_key: Option<String>,

    /// Mistral base URL.
    #[arg(long, env = "MISTRAL_API_URL")]
    mistral_api_url: Option<String>,

    /// Mistral OCR model.
    #[arg(long, env = "MISTRAL_OCR_MODEL", default_value = "mistral-ocr-latest")]
    ocr_model: String,

    /// Upper bound on the OCR call in seconds.
    #[arg(long, env = "MISTRAL_OCR_TIMEOUT", default_value_t = 300)]
    ocr_timeout: u64,

    /// Signed URL lifetime in hours.
    #[arg(long, env = "MISTRAL_SIGNED_URL_EXPIRY", default_value_t = 24)]
    signed_url_expiry: u32,
}

#[derive(clap::Args, Debug)]
struct SubmitArgs {
    /// PDF file to analyse.
    file: PathBuf,

    /// Origin of the running proxy.
    #[arg(long, env = "OCR_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy_url: String,

    /// Instruction sent with the document.
    #[arg(long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => {
            let config = build_config(args)?;
            serve(config).await.context("Proxy server failed")?;
        }
        Command::Submit(args) => submit(args, cli.quiet).await?,
    }

    Ok(())
}

/// Map `serve` args to `ProxyConfig`.
fn build_config(args: ServeArgs) -> Result<ProxyConfig> {
    let mut builder = ProxyConfig::builder()
        .provider(args.provider)
        .bind_addr(args.bind)
        .max_upload_bytes(args.max_upload_bytes)
        .mistral_model(args.ocr_model)
        .ocr_timeout_secs(args.ocr_timeout)
        .signed_url_expiry_hours(args.signed_url_expiry);

    if let Some(key) = args.landing_api_key {
        builder = builder.agentic_api_key(key);
    }
    if let Some(url) = args.vision_api_url {
        builder = builder.agentic_api_url(url);
    }
    if let Some(key) = args.mistral_api_key {
        builder = builder.mistral_api_key(key);
    }
    if let Some(url) = args.mistral_api_url {
        builder = builder.mistral_api_url(url);
    }

    builder.build().context("Invalid configuration")
}

/// Drive the upload form once for `args.file`.
async fn submit(args: SubmitArgs, quiet: bool) -> Result<()> {
    let mut form = UploadForm::new();
    if !quiet {
        form = form.with_observer(CliFormObserver::new());
    }
    if let Some(prompt) = args.prompt {
        form = form.with_prompt(prompt);
    }

    form.select(SelectedFile::from_path(&args.file))
        .with_context(|| format!("Cannot submit {:?}", args.file))?;

    let client = ProxyClient::new(&args.proxy_url).context("Failed to build proxy client")?;

    match form.submit(&client).await {
        SubmitOutcome::Rendered(text) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
        SubmitOutcome::Failed(message) => anyhow::bail!(message),
        SubmitOutcome::Skipped => anyhow::bail!("Nothing to submit"),
    }
}
