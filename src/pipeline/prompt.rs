//! Instruction template loading.

use crate::error::{InputKind, Invoice2XmlError};
use std::path::Path;
use tracing::debug;

/// Read the prompt template at `path` and return it trimmed.
///
/// # Errors
/// - [`Invoice2XmlError::NotFound`] — `path` does not exist
/// - [`Invoice2XmlError::EmptyContent`] — only whitespace in the file
/// - [`Invoice2XmlError::Internal`] — the file exists but cannot be read as UTF-8
pub async fn load_prompt(path: &Path) -> Result<String, Invoice2XmlError> {
    if !path.exists() {
        return Err(Invoice2XmlError::NotFound {
            kind: InputKind::Prompt,
            path: path.to_path_buf(),
        });
    }

    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        Invoice2XmlError::Internal(format!("no se pudo leer '{}': {e}", path.display()))
    })?;

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Invoice2XmlError::empty("El archivo de prompt está vacío."));
    }

    debug!("Prompt loaded: {} chars", trimmed.chars().count());
    Ok(trimmed.to_string())
}
