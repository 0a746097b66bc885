//! CLI binary for invoice2xml.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the pipeline once and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice2xml::config::{DEFAULT_BASE_URL, DEFAULT_LOG_PATH, DEFAULT_MODEL, DEFAULT_OUTPUT_PATH};
use invoice2xml::pipeline::output::{preview, PREVIEW_CHARS};
use invoice2xml::report::usage_label;
use invoice2xml::{
    Pipeline, PipelineConfig, PipelineProgressCallback, ProgressCallback, RunReport, TokenUsage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

fn secs(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Page-by-page progress bar for the extraction stage, plus one step line
/// per finished stage.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>3}/{len} páginas",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

            bar.set_style(style);
            bar.set_prefix("📰 Extrayendo texto del PDF");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar })
    }

    /// Print above the bar while it is drawn, straight to stderr otherwise.
    fn line(&self, msg: String) {
        match &self.bar {
            Some(bar) if !bar.is_hidden() && !bar.is_finished() => bar.println(msg),
            _ => eprintln!("{msg}"),
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        if let Some(bar) = &self.bar {
            bar.set_length(total_pages as u64);
        }
    }

    fn on_page_extracted(&self, _page_num: usize, _total: usize, _chars: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_page_empty(&self, page_num: usize, _total: usize) {
        self.line(format!("{} Página {page_num} sin texto", yellow("⚠️")));
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_extraction_complete(&self, _total_pages: usize, _pages_with_text: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn on_text_extracted(&self, chars: usize, with_text: usize, total: usize, elapsed_ms: u64) {
        self.line(format!(
            "{} Texto extraído del PDF ({chars} caracteres, {with_text}/{total} páginas) en {}",
            green("✓"),
            secs(elapsed_ms)
        ));
    }

    fn on_prompt_loaded(&self, elapsed_ms: u64) {
        self.line(format!(
            "{} Prompt cargado correctamente en {}",
            green("✓"),
            secs(elapsed_ms)
        ));
    }

    fn on_tokens_estimated(&self, estimated_tokens: usize, token_limit: usize) {
        self.line(format!(
            "{} Tokens estimados antes de enviar: {estimated_tokens}/{token_limit}",
            green("✓")
        ));
    }

    fn on_api_call_start(&self, model: &str) {
        self.line(format!("🤖 Procesando factura con {model}..."));
    }

    fn on_api_call_complete(&self, elapsed_ms: u64, usage: Option<TokenUsage>) {
        self.line(format!(
            "{} Procesamiento completado en {} (Tokens usados: {})",
            green("✓"),
            secs(elapsed_ms),
            usage_label(usage)
        ));
    }

    fn on_output_written(&self, path: &Path, chars: usize, elapsed_ms: u64) {
        self.line(format!(
            "{} XML guardado en {} ({chars} caracteres) en {}",
            green("✅"),
            bold(&path.display().to_string()),
            secs(elapsed_ms)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the default prompt.txt, output to factura_processed.xml
  invoice2xml facturaPDF.pdf

  # Explicit prompt and output
  invoice2xml facturaPDF.pdf --prompt prompt.txt -o factura.xml

  # Machine-readable run report
  invoice2xml facturaPDF.pdf --json > report.json

ENVIRONMENT VARIABLES:
  DEEPSEEK_API_KEY        API key (must contain "sk-")
  DEEPSEEK_BASE_URL       Override the endpoint root (any OpenAI-compatible API)
  INVOICE2XML_MODEL       Override the model ID
  PDFIUM_LIB_PATH         Path to libpdfium when it is not installed system-wide
  RUST_LOG                tracing filter, e.g. invoice2xml=debug

Failures are printed and appended to the error log (default: error.log).
"#;

/// Convert an invoice PDF to XML with a chat-completion model.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2xml",
    version,
    about = "Convert an invoice PDF to XML with a chat-completion model",
    long_about = "Extract the text of an invoice PDF, combine it with an instruction prompt, \
send it to an OpenAI-compatible chat-completion API (DeepSeek by default) and write the \
model's reply as XML.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Invoice PDF to convert.
    #[arg(env = "INVOICE2XML_PDF")]
    pdf: PathBuf,

    /// Instruction template file.
    #[arg(long, env = "INVOICE2XML_PROMPT", default_value = "prompt.txt")]
    prompt: PathBuf,

    /// Write the XML to this file.
    #[arg(short, long, env = "INVOICE2XML_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Append failures to this file.
    #[arg(long, env = "INVOICE2XML_LOG", default_value = DEFAULT_LOG_PATH)]
    log_file: PathBuf,

    /// API key for the completion endpoint.
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Endpoint root; `/chat/completions` is appended.
    #[arg(long, env = "DEEPSEEK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Model ID.
    #[arg(long, env = "INVOICE2XML_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Request timeout in seconds (default: none).
    #[arg(long, env = "INVOICE2XML_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Print the run report as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// Disable the page progress bar.
    #[arg(long, env = "INVOICE2XML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2XML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and blank-page warnings.
    #[arg(short, long, env = "INVOICE2XML_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Step lines and blank-page warnings come from `CliProgressCallback`.
    // Without it (--quiet, --json) the extractor's warnings still reach stderr.
    let show_steps = !cli.quiet && !cli.json;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(&cli))),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let mut pipeline = Pipeline::from_config(config).context("Failed to set up the pipeline")?;
    if show_steps {
        let progress = CliProgressCallback::new(!cli.no_progress);
        pipeline = pipeline.with_progress(progress as ProgressCallback);
    }

    match pipeline.execute().await {
        Ok(report) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if show_steps {
                print_summary(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("{} {}", red("❌"), failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Default tracing filter when `RUST_LOG` is unset.
fn log_filter(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error,invoice2xml::pipeline::extract=warn"
    } else {
        "error"
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .pdf_path(&cli.pdf)
        .prompt_path(&cli.prompt)
        .output_path(&cli.output)
        .log_path(&cli.log_file)
        .base_url(&cli.base_url)
        .model(&cli.model);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport) {
    println!(
        "\n{}",
        dim(&format!(
            "--- Vista previa del XML (primeros {PREVIEW_CHARS} caracteres) ---"
        ))
    );
    println!("{}", preview(&report.xml, PREVIEW_CHARS));

    eprintln!(
        "\n🏁 Proceso completo en {:.2} segundos.",
        report.timings.total_ms as f64 / 1000.0
    );
}
