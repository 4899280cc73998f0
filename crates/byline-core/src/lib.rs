use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config_file;
pub mod error;
pub mod fetch;
pub mod identifiers;
pub mod pipeline;
pub mod resolver;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use error::PipelineError;
pub use fetch::{DownloadedPdf, Fetcher};
pub use identifiers::{NOT_FOUND, extract_identifiers};
pub use pipeline::Pipeline;
pub use resolver::{AuthorResolver, parse_authors};

/// DOI and HAL-Id matched on a document's first page.
///
/// Both fields always exist; an unmatched one renders and serializes as
/// [`NOT_FOUND`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierRecord {
    pub doi: Option<String>,
    pub hal_id: Option<String>,
}

impl IdentifierRecord {
    pub fn doi_or_sentinel(&self) -> &str {
        self.doi.as_deref().unwrap_or(NOT_FOUND)
    }

    pub fn hal_id_or_sentinel(&self) -> &str {
        self.hal_id.as_deref().unwrap_or(NOT_FOUND)
    }
}

#[derive(Serialize)]
struct IdentifierJson<'a> {
    #[serde(rename = "DOI")]
    doi: &'a str,
    #[serde(rename = "HAL-Id")]
    hal_id: &'a str,
}

impl Serialize for IdentifierRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        IdentifierJson {
            doi: self.doi_or_sentinel(),
            hal_id: self.hal_id_or_sentinel(),
        }
        .serialize(serializer)
    }
}

impl fmt::Display for IdentifierRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DOI: {}, HAL-Id: {}",
            self.doi_or_sentinel(),
            self.hal_id_or_sentinel()
        )
    }
}

/// One author as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Affiliation")]
    pub affiliation: String,
}

/// An author row with the document's identifiers appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Affiliation")]
    pub affiliation: String,
    #[serde(rename = "DOI")]
    pub doi: String,
    #[serde(rename = "HAL-Id")]
    pub hal_id: String,
}

/// Author rows in model order, each carrying the same DOI and HAL-Id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub identifiers: IdentifierRecord,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Copy both identifier values onto every author row.
    pub fn broadcast(authors: Vec<AuthorRecord>, identifiers: IdentifierRecord) -> Self {
        let doi = identifiers.doi_or_sentinel();
        let hal_id = identifiers.hal_id_or_sentinel();
        let rows = authors
            .into_iter()
            .map(|a| ResultRow {
                author: a.author,
                affiliation: a.affiliation,
                doi: doi.to_string(),
                hal_id: hal_id.to_string(),
            })
            .collect();
        Self { identifiers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetching,
    Extracting,
    Matching,
    Resolving,
    Presenting,
}

impl Stage {
    /// Short human-readable description, for spinners and logs.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetching => "Downloading PDF",
            Stage::Extracting => "Extracting first page",
            Stage::Matching => "Matching identifiers",
            Stage::Resolving => "Identifying authors and affiliations",
            Stage::Presenting => "Building table",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StageStarted(Stage),
    Downloaded { bytes: u64 },
    TextExtracted { chars: usize },
    IdentifiersExtracted(IdentifierRecord),
    AuthorsResolved { count: usize },
}

/// Runtime configuration. The API key is passed per run instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    /// Whole-request timeout for both the download and the model call.
    /// `None` leaves reqwest's default (no timeout).
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Where per-run temporary PDFs are created. `None` uses the OS temp dir.
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: resolver::DEFAULT_API_BASE.to_string(),
            model: resolver::DEFAULT_MODEL.to_string(),
            max_tokens: resolver::DEFAULT_MAX_TOKENS,
            timeout_secs: None,
            user_agent: concat!("byline/", env!("CARGO_PKG_VERSION")).to_string(),
            download_dir: None,
        }
    }
}
