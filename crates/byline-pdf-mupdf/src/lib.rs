use std::path::Path;

use mupdf::{Document, TextPageFlags};

use byline_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the rest of the workspace does not
/// transitively depend on it.
///
/// Only page 0 is loaded. Headers and footers are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_first_page(&self, path: &Path) -> Result<String, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let page_count = document
            .page_count()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        if page_count < 1 {
            return Err(BackendError::NoPages);
        }

        let page = document
            .load_page(0)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        // Block/line iteration, one output line per text line
        let mut text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                text.push_str(&line_text);
                text.push('\n');
            }
        }

        tracing::debug!(
            path = %path.display(),
            page_count,
            chars = text.chars().count(),
            "extracted first page"
        );

        if text.trim().is_empty() {
            return Err(BackendError::EmptyPage);
        }
        Ok(text)
    }
}
