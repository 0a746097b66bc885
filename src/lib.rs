//! # invoice2xml
//!
//! Convert an invoice PDF to XML with an OpenAI-compatible chat model
//! (DeepSeek by default).
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Preflight  API key present and shaped like `sk-…`
//!  ├─ 2. Extract    page text via pdfium, blank pages skipped
//!  ├─ 3. Prompt     instruction template + "Contenido del PDF:" + text
//!  ├─ 4. Tokens     cl100k estimate must fit the 8192-token ceiling
//!  ├─ 5. Complete   one chat-completion request, temperature 0.1
//!  └─ 6. Output     reply written verbatim to factura_processed.xml
//! ```
//!
//! Any failing stage stops the run; the failure is appended to `error.log`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2xml::{Pipeline, PipelineConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .pdf_path("facturaPDF.pdf")
//!         .prompt_path("prompt.txt")
//!         .api_key(std::env::var("DEEPSEEK_API_KEY")?)
//!         .build()?;
//!     let report = Pipeline::from_config(config)?.execute().await?;
//!     println!("{} chars written", report.output_chars);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2xml` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod error_log;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{InputKind, Invoice2XmlError};
pub use error_log::ErrorLog;
pub use pipeline::extract::{ExtractedText, PageReader, PdfiumPageReader};
pub use pipeline::llm::{
    ChatMessage, ChatRequest, Completion, CompletionProvider, OpenAiCompatibleClient, TokenUsage,
};
pub use progress::{PipelineProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{RunReport, StageTimings};
pub use run::{run_sync, Pipeline, PipelineFailure, Stage};
