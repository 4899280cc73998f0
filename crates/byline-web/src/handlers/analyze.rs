use std::sync::{Arc, Mutex};

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use byline_core::{IdentifierRecord, PdfBackend, PipelineError, ProgressEvent, Stage};
use serde::Deserialize;

use crate::state::AppState;
use crate::template;

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

pub async fn analyze<B: PdfBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let url = form.url.trim();
    let api_key = Some(form.api_key.trim())
        .filter(|k| !k.is_empty())
        .or(state.default_api_key.as_deref());
    let Some(api_key) = api_key else {
        let page = template::render_error(url, "An OpenAI API key is required.", None);
        return (StatusCode::BAD_REQUEST, page).into_response();
    };

    let matched: Mutex<Option<IdentifierRecord>> = Mutex::new(None);
    let progress = |event: ProgressEvent| match event {
        ProgressEvent::StageStarted(stage) => tracing::debug!(%stage, "stage started"),
        ProgressEvent::IdentifiersExtracted(ids) => {
            if let Ok(mut slot) = matched.lock() {
                *slot = Some(ids);
            }
        }
        _ => {}
    };

    match state.pipeline.run(url, api_key, &progress).await {
        Ok(table) => {
            tracing::info!(url, rows = table.len(), "analysis complete");
            template::render_result(url, &table).into_response()
        }
        Err(err) => {
            tracing::warn!(url, error = %err, "analysis failed");
            let identifiers = matched.into_inner().ok().flatten();
            let page = template::render_error(url, &err.to_string(), identifiers.as_ref());
            (status_for(&err), page).into_response()
        }
    }
}

/// Map a pipeline failure to the status of the error page.
fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        PipelineError::Client(_) | PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => match err.stage() {
            Stage::Fetching | Stage::Resolving => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        },
    }
}
