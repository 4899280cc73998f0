use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{StatusCode, Url};
use tempfile::NamedTempFile;

use crate::error::{PipelineError, error_chain};

/// A PDF body written to a run-private temporary file.
///
/// The file is deleted when this value is dropped, so concurrent runs never
/// share a path.
#[derive(Debug)]
pub struct DownloadedPdf {
    file: NamedTempFile,
    bytes: u64,
}

impl DownloadedPdf {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of body bytes written.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// Downloads a document with a single unauthenticated GET.
pub struct Fetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl Fetcher {
    /// `download_dir` defaults to the OS temp directory.
    pub fn new(client: reqwest::Client, download_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// GET `url` (redirects followed) and stream the body to a fresh temp file.
    ///
    /// Anything but `200 OK` is an error, and in that case no file is created.
    pub async fn fetch(&self, url: &str) -> Result<DownloadedPdf, PipelineError> {
        let url = parse_http_url(url)?;
        tracing::debug!(url = %url, "downloading PDF");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PipelineError::Download(error_chain(&e)))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::warn!(url = %url, status = %status, "download failed");
            return Err(PipelineError::HttpStatus { status });
        }

        let mut file = tempfile::Builder::new()
            .prefix("byline-")
            .suffix(".pdf")
            .tempfile_in(&self.download_dir)?;

        let mut bytes: u64 = 0;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| PipelineError::Download(error_chain(&e)))?;
            file.write_all(&chunk)?;
            bytes += chunk.len() as u64;
        }
        file.flush()?;

        tracing::debug!(path = %file.path().display(), bytes, "download complete");
        Ok(DownloadedPdf { file, bytes })
    }
}

/// Parse `raw` and require an `http` or `https` scheme.
pub fn parse_http_url(raw: &str) -> Result<Url, PipelineError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| PipelineError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PipelineError::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme \"{}\"", other),
        }),
    }
}
