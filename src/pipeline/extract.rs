//! PDF text extraction: read every page's text layer and join it.
//!
//! ## Why a `PageReader` trait?
//!
//! pdfium is a native library that has to be present at run time. Keeping the
//! page reading behind [`PageReader`] leaves the extraction rules (skip blank
//! pages, join with `\n`, reject empty documents) in plain Rust that can be
//! exercised without a PDF engine, while [`PdfiumPageReader`] is the only
//! piece that touches pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is not safe to drive from an async
//! context, so the read runs on tokio's blocking pool. The caller awaits it
//! before doing anything else.

use crate::error::{InputKind, Invoice2XmlError};
use crate::progress::PipelineProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads the text layer of a PDF, one entry per page.
///
/// `None` or an empty string marks a page without extractable text.
pub trait PageReader: Send + Sync {
    fn read_pages(&self, path: &Path) -> Result<Vec<Option<String>>, Invoice2XmlError>;
}

/// Text pulled from the invoice, plus page accounting for the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Page texts joined with `\n` and trimmed. Never empty.
    pub text: String,
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages that contributed text.
    pub pages_with_text: usize,
}

/// Extract the text of the PDF at `path`.
///
/// # Errors
/// - [`Invoice2XmlError::NotFound`] — `path` does not exist
/// - [`Invoice2XmlError::EmptyContent`] — zero pages, or no page had text
/// - whatever the [`PageReader`] reports (corrupt PDF, pdfium unavailable)
pub async fn extract_text(
    reader: Arc<dyn PageReader>,
    path: &Path,
    progress: &dyn PipelineProgressCallback,
) -> Result<ExtractedText, Invoice2XmlError> {
    if !path.exists() {
        return Err(Invoice2XmlError::NotFound {
            kind: InputKind::Pdf,
            path: path.to_path_buf(),
        });
    }

    let owned = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || reader.read_pages(&owned))
        .await
        .map_err(|e| Invoice2XmlError::Internal(format!("PDF read task panicked: {e}")))??;

    info!("PDF loaded: {} pages", pages.len());
    join_pages(pages, progress)
}

/// Apply the extraction rules to already-read page texts.
///
/// Pages with no text (`None` or `""`) are skipped with a warning. Every
/// other page is kept as-is, whitespace included, the pages are joined with
/// `\n` and only the joined result is trimmed.
pub fn join_pages(
    pages: Vec<Option<String>>,
    progress: &dyn PipelineProgressCallback,
) -> Result<ExtractedText, Invoice2XmlError> {
    let total_pages = pages.len();
    if total_pages == 0 {
        return Err(Invoice2XmlError::empty("El PDF no contiene páginas."));
    }

    progress.on_extraction_start(total_pages);

    let mut parts: Vec<String> = Vec::with_capacity(total_pages);
    for (idx, page) in pages.into_iter().enumerate() {
        let page_num = idx + 1;
        match page {
            Some(text) if !text.is_empty() => {
                debug!("Page {}: {} chars", page_num, text.chars().count());
                progress.on_page_extracted(page_num, total_pages, text.chars().count());
                parts.push(text);
            }
            _ => {
                warn!("Página {} sin texto", page_num);
                progress.on_page_empty(page_num, total_pages);
            }
        }
    }

    let pages_with_text = parts.len();
    progress.on_extraction_complete(total_pages, pages_with_text);

    let text = parts.join("\n").trim().to_string();
    if text.is_empty() {
        return Err(Invoice2XmlError::empty("No se extrajo texto útil del PDF."));
    }

    Ok(ExtractedText {
        text,
        total_pages,
        pages_with_text,
    })
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PageReader`] backed by pdfium.
///
/// Library lookup: `library_path` when set, otherwise the working directory
/// and then the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageReader {
    library_path: Option<PathBuf>,
}

impl PdfiumPageReader {
    /// Reader that honours `PDFIUM_LIB_PATH` when it is set.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Reader bound to an explicit pdfium library file.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, Invoice2XmlError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| Invoice2XmlError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageReader for PdfiumPageReader {
    fn read_pages(&self, path: &Path) -> Result<Vec<Option<String>>, Invoice2XmlError> {
        let pdfium = self.bind()?;

        let document =
            pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| Invoice2XmlError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: format!("{e:?}"),
                })?;

        let pages = document.pages();
        let mut texts = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => texts.push(Some(text.all())),
                Err(e) => {
                    warn!("Page {}: text layer unreadable: {:?}", idx + 1, e);
                    texts.push(None);
                }
            }
        }

        Ok(texts)
    }
}
