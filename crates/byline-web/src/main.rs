use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use byline_core::{PdfBackend, Pipeline, config_file};
use byline_pdf_mupdf::MupdfBackend;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod handlers;
mod state;
mod template;

use state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:5001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "byline=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config_file::resolve();

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(&config, MupdfBackend::new())?,
        default_api_key: std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty()),
    });

    let app = app(state);

    let addr_str = std::env::var("BYLINE_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = addr_str
        .parse()
        .with_context(|| format!("invalid BYLINE_WEB_ADDR {addr_str:?}"))?;
    tracing::info!(%addr, model = %config.model, "listening");
    println!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn app<B: PdfBackend + 'static>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", axum::routing::get(handlers::index::index))
        .route(
            "/analyze",
            axum::routing::post(handlers::analyze::analyze::<B>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
