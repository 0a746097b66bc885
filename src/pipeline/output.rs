//! Output writing and console preview.
//!
//! The reply is written verbatim and in place: no temp-file rename, no
//! backup of a previous output. A failed run earlier in the pipeline never
//! reaches this stage, so an existing file is only replaced by a successful
//! conversion.

use crate::error::Invoice2XmlError;
use std::path::Path;
use tracing::debug;

/// Characters shown by [`preview`] in the CLI summary.
pub const PREVIEW_CHARS: usize = 300;

/// Write `content` to `path` as UTF-8, replacing any existing file.
pub async fn write_output(path: &Path, content: &str) -> Result<(), Invoice2XmlError> {
    tokio::fs::write(path, content.as_bytes())
        .await
        .map_err(|e| Invoice2XmlError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// First `max_chars` characters of `content` followed by `...`.
pub fn preview(content: &str, max_chars: usize) -> String {
    let head: String = content.chars().take(max_chars).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factura_processed.xml");
        std::fs::write(&path, "old content that is longer").unwrap();

        write_output(&path, "<invoice/>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<invoice/>");
    }

    #[tokio::test]
    async fn missing_directory_is_write_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.xml");
        let err = write_output(&path, "<invoice/>").await.unwrap_err();
        assert!(matches!(err, Invoice2XmlError::WriteFailed { .. }));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "ñ".repeat(400);
        let p = preview(&text, PREVIEW_CHARS);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn short_preview_keeps_everything() {
        assert_eq!(preview("<a/>", PREVIEW_CHARS), "<a/>...");
    }
}
