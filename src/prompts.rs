//! Fixed prompt text and user-message assembly.
//!
//! The instruction template itself is an operator-supplied file (see
//! [`crate::pipeline::prompt`]); this module only holds the system turn and
//! the framing that glues the template to the extracted invoice text.

/// Default system message for invoice conversion.
///
/// Used when [`crate::config::PipelineConfig::system_prompt`] is not overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Eres un experto en convertir facturas a XML con estructura estricta.";

/// Label placed between the template and the invoice text.
pub const PDF_CONTENT_LABEL: &str = "Contenido del PDF:";

/// Build the user turn: template, a blank line, the label, then the PDF text.
pub fn combine_message(template: &str, pdf_text: &str) -> String {
    format!("{template}\n\n{PDF_CONTENT_LABEL}\n{pdf_text}")
}
