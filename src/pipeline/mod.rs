//! Pipeline stages for invoice-to-XML conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own; [`crate::run`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompt ──▶ tokens ──▶ llm ──▶ output
//! (pdfium)    (file)     (BPE)     (HTTP)   (file)
//! ```
//!
//! 1. [`extract`] — page texts from the PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 2. [`prompt`]  — the operator's instruction template
//! 3. [`tokens`]  — pre-flight size estimate against the token ceiling
//! 4. [`llm`]     — the single chat-completion call; the only stage with
//!    network I/O
//! 5. [`output`]  — write the reply verbatim

pub mod extract;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod tokens;
