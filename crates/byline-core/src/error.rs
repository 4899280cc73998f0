use std::error::Error as StdError;

use thiserror::Error;

use crate::Stage;
use crate::backend::BackendError;

/// Everything that can stop a run.
///
/// Each variant is raised where the failure happens and carries the
/// underlying detail. Front-ends branch on the variant (or on
/// [`PipelineError::stage`]), never on message text.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error configuring HTTP client: {0}")]
    Client(String),
    #[error("Error downloading PDF: invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Error downloading PDF: {0}")]
    Download(String),
    #[error("Error downloading PDF: HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("Error writing PDF: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error extracting PDF: {0}")]
    Extraction(#[from] BackendError),
    #[error("Error using OpenAI API: {0}")]
    Model(String),
    #[error("Error parsing JSON from OpenAI response: {0}")]
    ModelJson(serde_json::Error),
    #[error("Error validating authors from OpenAI response: {0}")]
    MalformedAuthors(String),
}

impl PipelineError {
    /// The pipeline stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Client(_)
            | PipelineError::InvalidUrl { .. }
            | PipelineError::Download(_)
            | PipelineError::HttpStatus { .. }
            | PipelineError::Io(_) => Stage::Fetching,
            PipelineError::Extraction(_) => Stage::Extracting,
            PipelineError::Model(_)
            | PipelineError::ModelJson(_)
            | PipelineError::MalformedAuthors(_) => Stage::Resolving,
        }
    }
}

/// Render an error with its whole `source()` chain, `outer: inner: root`.
///
/// reqwest's top-level messages ("error sending request for url ...") hide
/// the useful part (DNS failure, connection refused) in the source chain.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = s.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_embeds_code() {
        let err = PipelineError::HttpStatus {
            status: reqwest::StatusCode::NOT_FOUND,
        };
        let msg = err.to_string();
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.starts_with("Error downloading PDF"));
        assert_eq!(err.stage(), Stage::Fetching);
    }

    #[test]
    fn client_setup_is_not_a_download_error() {
        let err = PipelineError::Client("builder error".into());
        assert_eq!(err.to_string(), "Error configuring HTTP client: builder error");
        assert!(!err.to_string().contains("downloading"));
    }

    #[test]
    fn extraction_message_prefix() {
        let err = PipelineError::from(BackendError::NoPages);
        assert_eq!(
            err.to_string(),
            "Error extracting PDF: document has no pages"
        );
        assert_eq!(err.stage(), Stage::Extracting);
    }

    #[test]
    fn model_errors_belong_to_resolving() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = PipelineError::ModelJson(json_err);
        assert!(
            err.to_string()
                .starts_with("Error parsing JSON from OpenAI response: ")
        );
        assert_eq!(err.stage(), Stage::Resolving);
        assert_eq!(
            PipelineError::Model("401".into()).stage(),
            Stage::Resolving
        );
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = BackendError::Io(inner);
        assert_eq!(error_chain(&outer), "IO error: refused");
    }
}
