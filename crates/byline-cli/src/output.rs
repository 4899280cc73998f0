use std::io::Write;
use std::path::Path;
use std::time::Duration;

use byline_core::{IdentifierRecord, NOT_FOUND, PipelineError, ResultTable};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Stage spinner on stderr; hidden automatically when stderr is not a TTY.
pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print the identifier mapping.
pub fn print_identifiers(
    w: &mut dyn Write,
    ids: &IdentifierRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "Identifiers extracted:".bold())?;
    } else {
        writeln!(w, "Identifiers extracted:")?;
    }
    print_identifier_line(w, "DOI", ids.doi_or_sentinel(), color)?;
    print_identifier_line(w, "HAL-Id", ids.hal_id_or_sentinel(), color)?;
    writeln!(w)?;
    Ok(())
}

/// [`print_identifiers`] for callers with nowhere to propagate the error;
/// a failed write is logged.
pub fn print_identifiers_or_warn(w: &mut dyn Write, ids: &IdentifierRecord, color: ColorMode) {
    if let Err(e) = print_identifiers(w, ids, color) {
        tracing::warn!(error = %e, "failed to print identifiers");
    }
}

fn print_identifier_line(
    w: &mut dyn Write,
    label: &str,
    value: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if !color.enabled() {
        return writeln!(w, "  {:<7} {}", format!("{}:", label), value);
    }
    let label = format!("{:<7}", format!("{}:", label));
    if value == NOT_FOUND {
        writeln!(w, "  {} {}", label, value.dimmed())
    } else {
        writeln!(w, "  {} {}", label, value.cyan())
    }
}

/// Print the author table.
pub fn print_table(
    w: &mut dyn Write,
    table: &ResultTable,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "Extracted Authors and Affiliations:".bold())?;
    } else {
        writeln!(w, "Extracted Authors and Affiliations:")?;
    }

    if table.is_empty() {
        if color.enabled() {
            writeln!(w, "{}", "(no authors identified)".dimmed())?;
        } else {
            writeln!(w, "(no authors identified)")?;
        }
        return Ok(());
    }

    write!(w, "{}", byline_reporting::render_table(table))?;
    Ok(())
}

pub fn print_report_written(
    w: &mut dyn Write,
    path: &Path,
    rows: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let msg = format!("Report written to {} ({} rows)", path.display(), rows);
    if color.enabled() {
        writeln!(w, "{}", msg.green())
    } else {
        writeln!(w, "{}", msg)
    }
}

/// Print a pipeline failure.
pub fn print_error(w: &mut dyn Write, err: &PipelineError, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", err.to_string().red())?;
        writeln!(w, "{}", format!("(failed while: {})", err.stage()).dimmed())
    } else {
        writeln!(w, "{}", err)?;
        writeln!(w, "(failed while: {})", err.stage())
    }
}
