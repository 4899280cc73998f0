use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use byline_core::{Config, Pipeline, ProgressEvent, config_file};
use byline_pdf_mupdf::MupdfBackend;
use byline_reporting::{ExportFormat, REPORT_FILE_NAME, export_table};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod output;

use output::ColorMode;

/// Extract authors, affiliations, DOI and HAL-Id from the first page of a PDF
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a PDF, identify its authors and write the report
    Analyze {
        /// URL of the PDF
        url: String,

        /// OpenAI API key (falls back to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Chat model to use
        #[arg(long)]
        model: Option<String>,

        /// Base URL of the chat completions API
        #[arg(long)]
        api_base: Option<String>,

        /// Completion token limit
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Report path; .json and .md select those formats, anything else is CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the DOI and HAL-Id of a PDF without calling the model
    Identifiers {
        /// URL of the PDF
        url: String,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

/// Flags that override configuration.
#[derive(Debug, Default)]
struct Overrides {
    model: Option<String>,
    api_base: Option<String>,
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            url,
            api_key,
            model,
            api_base,
            max_tokens,
            output,
            no_color,
        } => {
            let overrides = Overrides {
                model,
                api_base,
                max_tokens,
            };
            analyze(url, api_key, overrides, output, no_color).await
        }
        Command::Identifiers { url, no_color } => identifiers(url, no_color).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "byline=warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn analyze(
    url: String,
    api_key: Option<String>,
    overrides: Overrides,
    output: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<ExitCode> {
    let color = ColorMode(!no_color);

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let mut config = config_file::resolve();
    apply_overrides(&mut config, &overrides);
    let api_key = api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
        .context("no OpenAI API key: pass --api-key or set OPENAI_API_KEY")?;
    let output_path = output.unwrap_or_else(|| PathBuf::from(REPORT_FILE_NAME));

    let pipeline = Pipeline::new(&config, MupdfBackend::new())?;
    let spinner = output::spinner();
    let progress = progress_handler(&spinner, color);

    let result = pipeline.run(&url, &api_key, &progress).await;
    spinner.finish_and_clear();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match result {
        Ok(table) => {
            output::print_table(&mut out, &table, color)?;
            let format = ExportFormat::from_path(&output_path);
            export_table(&table, format, &output_path)?;
            output::print_report_written(&mut out, &output_path, table.len(), color)?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            output::print_error(&mut std::io::stderr().lock(), &err, color)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn identifiers(url: String, no_color: bool) -> anyhow::Result<ExitCode> {
    let color = ColorMode(!no_color);
    let config = config_file::resolve();
    let pipeline = Pipeline::new(&config, MupdfBackend::new())?;

    let spinner = output::spinner();
    let progress = |event: ProgressEvent| {
        if let ProgressEvent::StageStarted(stage) = event {
            spinner.set_message(stage.label());
        }
    };
    let result = pipeline.identifiers(&url, &progress).await;
    spinner.finish_and_clear();

    match result {
        Ok(ids) => {
            output::print_identifiers(&mut std::io::stdout().lock(), &ids, color)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::print_error(&mut std::io::stderr().lock(), &err, color)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Drive the spinner from pipeline events. Identifiers are printed as soon as
/// they are matched, so they stay visible if the model call fails.
fn progress_handler(
    spinner: &ProgressBar,
    color: ColorMode,
) -> impl Fn(ProgressEvent) + Sync + '_ {
    move |event| match event {
        ProgressEvent::StageStarted(stage) => spinner.set_message(stage.label()),
        ProgressEvent::IdentifiersExtracted(ids) => spinner.suspend(|| {
            output::print_identifiers_or_warn(&mut std::io::stdout().lock(), &ids, color)
        }),
        ProgressEvent::Downloaded { bytes } => tracing::debug!(bytes, "downloaded"),
        ProgressEvent::TextExtracted { chars } => tracing::debug!(chars, "text extracted"),
        ProgressEvent::AuthorsResolved { count } => tracing::debug!(count, "authors resolved"),
    }
}

fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(model) = &overrides.model {
        config.model = model.clone();
    }
    if let Some(base) = &overrides.api_base {
        config.api_base = base.clone();
    }
    if let Some(max_tokens) = overrides.max_tokens {
        config.max_tokens = max_tokens;
    }
}
