//! Presentation of a [`ResultTable`]: terminal rendering and file export.

use std::path::Path;

use byline_core::ResultTable;
use thiserror::Error;

pub mod export;
pub mod table;

pub use export::{to_csv, to_json, to_markdown};
pub use table::render_table;

/// File name offered for the CSV download.
pub const REPORT_FILE_NAME: &str = "author_and_identifiers_report.csv";

/// Column headers, in output order.
pub const COLUMNS: [&str; 4] = ["Author", "Affiliation", "DOI", "HAL-Id"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl ExportFormat {
    /// Infer the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "json" => ExportFormat::Json,
            "md" | "markdown" => ExportFormat::Markdown,
            _ => ExportFormat::Csv,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown",
        }
    }

    /// Render `table` in this format.
    pub fn render(self, table: &ResultTable) -> Result<String, ExportError> {
        Ok(match self {
            ExportFormat::Csv => to_csv(table),
            ExportFormat::Json => to_json(table)?,
            ExportFormat::Markdown => to_markdown(table),
        })
    }
}

/// Write `table` to `path`, UTF-8 encoded, in `format`.
pub fn export_table(
    table: &ResultTable,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let content = format.render(table)?;
    std::fs::write(path, content.as_bytes()).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), ?format, rows = table.len(), "report written");
    Ok(())
}
