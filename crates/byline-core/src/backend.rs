use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("document has no pages")]
    NoPages,
    #[error("first page contains no extractable text")]
    EmptyPage,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors read the first page only; author and identifier metadata is
/// assumed to live there, so later pages are never loaded.
pub trait PdfBackend: Send + Sync {
    /// Extract the plain text of the first page of a PDF file.
    ///
    /// Returns [`BackendError::NoPages`] for an empty document and
    /// [`BackendError::EmptyPage`] when the first page yields only whitespace.
    fn extract_first_page(&self, path: &Path) -> Result<String, BackendError>;
}
