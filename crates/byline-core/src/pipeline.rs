use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendError, PdfBackend};
use crate::error::{PipelineError, error_chain};
use crate::fetch::Fetcher;
use crate::identifiers::extract_identifiers;
use crate::resolver::AuthorResolver;
use crate::{Config, IdentifierRecord, ProgressEvent, ResultTable, Stage};

/// The fetch → extract → match → resolve → tabulate sequence.
///
/// Each stage is awaited to completion before the next one starts, and the
/// first failure ends the run. Identifiers are reported through the
/// progress callback as soon as they are matched, so a caller can still show
/// them when resolution fails afterwards. Text extraction runs on tokio's
/// blocking pool.
pub struct Pipeline<B: PdfBackend> {
    fetcher: Fetcher,
    backend: Arc<B>,
    resolver: AuthorResolver,
}

impl<B: PdfBackend + 'static> Pipeline<B> {
    pub fn new(config: &Config, backend: B) -> Result<Self, PipelineError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| PipelineError::Client(error_chain(&e)))?;

        Ok(Self {
            fetcher: Fetcher::new(client.clone(), config.download_dir.clone()),
            backend: Arc::new(backend),
            resolver: AuthorResolver::new(
                client,
                &config.api_base,
                &config.model,
                config.max_tokens,
            ),
        })
    }

    /// Download `url` and return the text of its first page.
    ///
    /// The downloaded file is removed before this returns.
    pub async fn first_page_text<F>(&self, url: &str, progress: &F) -> Result<String, PipelineError>
    where
        F: Fn(ProgressEvent) + Sync,
    {
        progress(ProgressEvent::StageStarted(Stage::Fetching));
        let pdf = self.fetcher.fetch(url).await?;
        if pdf.is_empty() {
            tracing::warn!(url, "downloaded document is empty");
        }
        progress(ProgressEvent::Downloaded { bytes: pdf.len() });

        progress(ProgressEvent::StageStarted(Stage::Extracting));
        let backend = Arc::clone(&self.backend);
        let text = tokio::task::spawn_blocking(move || {
            let text = backend.extract_first_page(pdf.path());
            drop(pdf);
            text
        })
        .await
        .map_err(|e| BackendError::ExtractionError(format!("extraction task failed: {e}")))??;

        let chars = text.chars().count();
        tracing::debug!(chars, "first page extracted");
        progress(ProgressEvent::TextExtracted { chars });
        Ok(text)
    }

    /// Fetch, extract and match identifiers, without calling the model.
    pub async fn identifiers<F>(
        &self,
        url: &str,
        progress: &F,
    ) -> Result<IdentifierRecord, PipelineError>
    where
        F: Fn(ProgressEvent) + Sync,
    {
        let text = self.first_page_text(url, progress).await?;
        Ok(self.match_identifiers(&text, progress))
    }

    /// Run every stage and return the merged table.
    pub async fn run<F>(
        &self,
        url: &str,
        api_key: &str,
        progress: &F,
    ) -> Result<ResultTable, PipelineError>
    where
        F: Fn(ProgressEvent) + Sync,
    {
        tracing::info!(url, model = self.resolver.model(), "starting run");
        let text = self.first_page_text(url, progress).await?;
        let identifiers = self.match_identifiers(&text, progress);

        progress(ProgressEvent::StageStarted(Stage::Resolving));
        let authors = self.resolver.resolve(api_key, &text).await?;
        progress(ProgressEvent::AuthorsResolved {
            count: authors.len(),
        });

        progress(ProgressEvent::StageStarted(Stage::Presenting));
        let table = ResultTable::broadcast(authors, identifiers);
        tracing::info!(rows = table.len(), "run complete");
        Ok(table)
    }

    fn match_identifiers<F>(&self, text: &str, progress: &F) -> IdentifierRecord
    where
        F: Fn(ProgressEvent) + Sync,
    {
        progress(ProgressEvent::StageStarted(Stage::Matching));
        let identifiers = extract_identifiers(text);
        progress(ProgressEvent::IdentifiersExtracted(identifiers.clone()));
        identifiers
    }
}
