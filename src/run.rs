//! Run orchestration: Preflight → ExtractPdf → LoadPrompt → CheckTokens →
//! CallApi → WriteOutput.
//!
//! Stages run strictly in order and each is awaited before the next starts.
//! The first failure ends the run: [`Pipeline::run`] returns it tagged with
//! its [`Stage`], and [`Pipeline::execute`] additionally appends it to the
//! error log. There is no retry, no rollback and no cleanup of an output
//! file left by an earlier run.

use crate::config::PipelineConfig;
use crate::error::Invoice2XmlError;
use crate::error_log::ErrorLog;
use crate::pipeline::extract::{self, PageReader, PdfiumPageReader};
use crate::pipeline::llm::{self, ChatRequest, CompletionProvider, OpenAiCompatibleClient};
use crate::pipeline::tokens::{check_budget, TokenCounter};
use crate::pipeline::{output, prompt};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::prompts::combine_message;
use crate::report::{RunReport, StageTimings};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Preflight,
    ExtractPdf,
    LoadPrompt,
    CheckTokens,
    CallApi,
    WriteOutput,
}

impl Stage {
    /// Prefix shown before `error` when this stage fails, if any.
    ///
    /// Credential and token-limit errors are already full sentences and are
    /// reported bare.
    pub fn failure_label(self, error: &Invoice2XmlError) -> Option<&'static str> {
        match (self, error) {
            (Stage::Preflight, _) => None,
            (Stage::ExtractPdf, _) => Some("Error al leer el PDF"),
            (Stage::LoadPrompt, _) => Some("Error al leer el archivo de prompt"),
            (Stage::CheckTokens, Invoice2XmlError::TokenLimitExceeded { .. }) => None,
            (Stage::CheckTokens, _) => Some("Error al contar tokens"),
            (Stage::CallApi, Invoice2XmlError::ConnectionFailure { .. }) => {
                Some("Error de conexión con la API")
            }
            (Stage::CallApi, Invoice2XmlError::RequestRejected { .. }) => {
                Some("Error en la solicitud a la API")
            }
            (Stage::CallApi, _) => Some("Error inesperado durante la llamada a la API"),
            (Stage::WriteOutput, _) => Some("Error al guardar el archivo XML"),
        }
    }
}

/// A run that stopped at `stage`.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: Invoice2XmlError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage.failure_label(&self.error) {
            Some(label) => write!(f, "{}: {}", label, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn at(stage: Stage) -> impl FnOnce(Invoice2XmlError) -> PipelineFailure {
    move |error| PipelineFailure { stage, error }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// One configured invoice conversion.
pub struct Pipeline {
    config: PipelineConfig,
    reader: Arc<dyn PageReader>,
    provider: Arc<dyn CompletionProvider>,
    progress: ProgressCallback,
}

impl Pipeline {
    /// Pipeline with explicit page reader and completion provider.
    pub fn new(
        config: PipelineConfig,
        reader: Arc<dyn PageReader>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            reader,
            provider,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Production wiring: pdfium (honouring `PDFIUM_LIB_PATH`) and the
    /// OpenAI-compatible HTTP client described by `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, Invoice2XmlError> {
        let provider = OpenAiCompatibleClient::from_config(&config)?;
        Ok(Self::new(
            config,
            Arc::new(PdfiumPageReader::from_env()),
            Arc::new(provider),
        ))
    }

    /// Receive per-page extraction events.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run(&self) -> Result<RunReport, PipelineFailure> {
        let total_start = Instant::now();
        let config = &self.config;
        info!("Starting invoice conversion: {}", config.pdf_path.display());

        // ── Stage 1: Preflight ───────────────────────────────────────────
        config.validate_credential().map_err(at(Stage::Preflight))?;

        // ── Stage 2: Extract PDF text ────────────────────────────────────
        let start = Instant::now();
        let extracted = extract::extract_text(
            Arc::clone(&self.reader),
            &config.pdf_path,
            self.progress.as_ref(),
        )
        .await
        .map_err(at(Stage::ExtractPdf))?;
        let extract_ms = elapsed_ms(start);
        let extracted_chars = extracted.text.chars().count();
        info!(
            "Extracted {} chars from {}/{} pages in {}ms",
            extracted_chars, extracted.pages_with_text, extracted.total_pages, extract_ms
        );
        self.progress.on_text_extracted(
            extracted_chars,
            extracted.pages_with_text,
            extracted.total_pages,
            extract_ms,
        );

        // ── Stage 3: Load prompt ─────────────────────────────────────────
        let start = Instant::now();
        let template = prompt::load_prompt(&config.prompt_path)
            .await
            .map_err(at(Stage::LoadPrompt))?;
        let prompt_ms = elapsed_ms(start);
        self.progress.on_prompt_loaded(prompt_ms);
        let user_message = combine_message(&template, &extracted.text);

        // ── Stage 4: Token budget ────────────────────────────────────────
        let start = Instant::now();
        let counter = TokenCounter::cl100k().map_err(at(Stage::CheckTokens))?;
        let estimated_tokens = counter.count_message_tokens(&config.system_prompt, &user_message);
        check_budget(estimated_tokens, config.token_limit).map_err(at(Stage::CheckTokens))?;
        let tokens_ms = elapsed_ms(start);
        info!(
            "Estimated tokens: {}/{}",
            estimated_tokens, config.token_limit
        );
        self.progress.on_tokens_estimated(estimated_tokens, config.token_limit);
        if config.reply_budget_overlaps(estimated_tokens) {
            warn!(
                "{} input tokens + max_tokens {} exceed the {}-token limit; the reply may be cut short",
                estimated_tokens, config.max_tokens, config.token_limit
            );
        }

        // ── Stage 5: Completion ──────────────────────────────────────────
        self.progress.on_api_call_start(&config.model);
        let start = Instant::now();
        let request = ChatRequest::from_config(config, &user_message);
        let completion = llm::request_completion(self.provider.as_ref(), &request)
            .await
            .map_err(at(Stage::CallApi))?;
        let api_ms = elapsed_ms(start);
        info!("Completion received in {}ms", api_ms);
        self.progress.on_api_call_complete(api_ms, completion.usage);

        // ── Stage 6: Write output ────────────────────────────────────────
        let start = Instant::now();
        output::write_output(&config.output_path, &completion.content)
            .await
            .map_err(at(Stage::WriteOutput))?;
        let write_ms = elapsed_ms(start);

        let output_chars = completion.content.chars().count();
        info!(
            "Wrote {} chars to {}",
            output_chars,
            config.output_path.display()
        );
        self.progress.on_output_written(&config.output_path, output_chars, write_ms);

        Ok(RunReport {
            pdf_path: config.pdf_path.clone(),
            output_path: config.output_path.clone(),
            total_pages: extracted.total_pages,
            pages_with_text: extracted.pages_with_text,
            extracted_chars,
            estimated_tokens,
            token_limit: config.token_limit,
            usage: completion.usage,
            output_chars,
            xml: completion.content,
            timings: StageTimings {
                extract_ms,
                prompt_ms,
                tokens_ms,
                api_ms,
                write_ms,
                total_ms: elapsed_ms(total_start),
            },
        })
    }

    /// [`run`](Self::run), then append any failure to the error log.
    ///
    /// A log that cannot be written is reported through `tracing` and does
    /// not replace the run's failure.
    pub async fn execute(&self) -> Result<RunReport, PipelineFailure> {
        let failure = match self.run().await {
            Ok(report) => return Ok(report),
            Err(failure) => failure,
        };

        error!("{:?} stage failed: {}", failure.stage, failure);
        let log = ErrorLog::new(&self.config.log_path);
        if let Err(e) = log.append(&failure.to_string()) {
            error!(
                "Could not append to error log '{}': {}",
                log.path().display(),
                e
            );
        }
        Err(failure)
    }
}

/// Blocking wrapper around [`Pipeline::execute`].
///
/// Creates a current-thread tokio runtime internally.
pub fn run_sync(pipeline: &Pipeline) -> Result<RunReport, PipelineFailure> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PipelineFailure {
            stage: Stage::Preflight,
            error: Invoice2XmlError::Internal(format!("Failed to create tokio runtime: {e}")),
        })?;
    runtime.block_on(pipeline.execute())
}
