//! Error types for the invoice2xml library.
//!
//! Every stage of the pipeline returns `Result<_, Invoice2XmlError>`. There is
//! no partial success: a single invoice either becomes one XML file or the
//! run stops at the first failing stage. The orchestrator in [`crate::run`]
//! tags the error with the stage that produced it (see
//! [`crate::run::PipelineFailure`]) before it is printed and logged.
//!
//! Display strings are in Spanish because they end up verbatim in the
//! operator-facing console and in `error.log`.

use std::path::PathBuf;
use thiserror::Error;

/// Which input file a [`Invoice2XmlError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The invoice PDF.
    Pdf,
    /// The instruction template.
    Prompt,
}

impl InputKind {
    fn label(self) -> &'static str {
        match self {
            InputKind::Pdf => "PDF",
            InputKind::Prompt => "de prompt",
        }
    }
}

/// All errors returned by the invoice2xml library.
#[derive(Debug, Error)]
pub enum Invoice2XmlError {
    // ── Preflight ─────────────────────────────────────────────────────────
    /// API key missing or not shaped like an `sk-…` key.
    #[error("Clave API no válida o vacía.")]
    InvalidCredential,

    // ── Input errors ──────────────────────────────────────────────────────
    /// An input file does not exist.
    #[error("El archivo {} no existe: {}", .kind.label(), .path.display())]
    NotFound { kind: InputKind, path: PathBuf },

    /// An input (PDF text, prompt) is empty after trimming.
    #[error("{what}")]
    EmptyContent { what: String },

    /// pdfium could not open the document.
    #[error("El PDF '{}' está dañado o no se puede abrir: {detail}", .path.display())]
    CorruptPdf { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "No se pudo cargar la biblioteca pdfium: {0}\n\
Set PDFIUM_LIB_PATH to the libpdfium shared library."
    )]
    PdfiumBindingFailed(String),

    // ── Token budget ──────────────────────────────────────────────────────
    /// The request would not fit in the configured token budget.
    #[error(
        "El mensaje supera el límite de tokens permitido (Usados: {count}/{limit}). \
Reduce el PDF o el prompt."
    )]
    TokenLimitExceeded { count: usize, limit: usize },

    // ── API errors ────────────────────────────────────────────────────────
    /// The endpoint could not be reached (DNS, connect, TLS, timeout).
    #[error("{detail}")]
    ConnectionFailure { detail: String },

    /// The server rejected the request (bad parameters, quota).
    #[error("HTTP {status}: {message}")]
    RequestRejected { status: u16, message: String },

    /// Any other API failure: 5xx, auth, undecodable body.
    #[error("{detail}")]
    UnexpectedApiFailure { detail: String },

    /// The API answered but with no usable content.
    #[error("{detail}")]
    EmptyResponse { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output XML file.
    #[error("No se pudo escribir '{}': {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Configuración no válida: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Error interno: {0}")]
    Internal(String),
}

impl Invoice2XmlError {
    pub(crate) fn empty(what: impl Into<String>) -> Self {
        Invoice2XmlError::EmptyContent { what: what.into() }
    }

    /// `true` for the three API failure kinds that come from the network call.
    pub fn is_api_failure(&self) -> bool {
        matches!(
            self,
            Invoice2XmlError::ConnectionFailure { .. }
                | Invoice2XmlError::RequestRejected { .. }
                | Invoice2XmlError::UnexpectedApiFailure { .. }
        )
    }
}
