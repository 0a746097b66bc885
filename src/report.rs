//! Run summary returned by a successful conversion.

use crate::pipeline::llm::TokenUsage;
use serde::Serialize;
use std::path::PathBuf;

/// Everything the CLI needs for its summary lines, and `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pdf_path: PathBuf,
    pub output_path: PathBuf,
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages that contributed text; the rest were skipped.
    pub pages_with_text: usize,
    /// Characters of extracted (trimmed) PDF text.
    pub extracted_chars: usize,
    /// Pre-flight estimate of system + user tokens.
    pub estimated_tokens: usize,
    pub token_limit: usize,
    /// Server-reported usage, when the response carried it.
    pub usage: Option<TokenUsage>,
    /// Characters written to the output file.
    pub output_chars: usize,
    /// The model's reply, as written.
    pub xml: String,
    pub timings: StageTimings,
}

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub extract_ms: u64,
    pub prompt_ms: u64,
    pub tokens_ms: u64,
    pub api_ms: u64,
    pub write_ms: u64,
    pub total_ms: u64,
}

impl RunReport {
    /// Total tokens as reported by the API, or `"desconocido"`.
    pub fn usage_label(&self) -> String {
        usage_label(self.usage)
    }
}

/// `usage.total_tokens`, or `"desconocido"` when the server sent no usage.
pub fn usage_label(usage: Option<TokenUsage>) -> String {
    usage
        .map(|u| u.total_tokens.to_string())
        .unwrap_or_else(|| "desconocido".to_string())
}
