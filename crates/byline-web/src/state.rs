use byline_core::{PdfBackend, Pipeline};
use byline_pdf_mupdf::MupdfBackend;

/// Shared application state accessible from all handlers.
pub struct AppState<B: PdfBackend = MupdfBackend> {
    pub pipeline: Pipeline<B>,
    /// Used when the form leaves the API key blank.
    pub default_api_key: Option<String>,
}
