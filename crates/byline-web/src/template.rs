use axum::response::Html;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use byline_core::{IdentifierRecord, ResultTable};
use byline_reporting::{COLUMNS, ExportFormat, REPORT_FILE_NAME, to_csv};

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Render the form with no results.
pub fn render_index() -> Html<String> {
    render_page("", "")
}

/// Render the form followed by the identifiers and author table of a run.
pub fn render_result(url: &str, table: &ResultTable) -> Html<String> {
    let mut body = identifiers_section(&table.identifiers);
    body.push_str("<h2>Extracted Authors and Affiliations</h2>\n");
    if table.is_empty() {
        body.push_str("<p class=\"empty\">No authors identified.</p>\n");
    } else {
        body.push_str(&table_html(table));
    }
    body.push_str(&format!(
        "<a class=\"download\" href=\"{}\" download=\"{}\">Download CSV</a>\n",
        csv_data_uri(table),
        REPORT_FILE_NAME
    ));
    render_page(url, &body)
}

/// Render the form with an error, keeping the identifiers if they were
/// matched before the failure.
pub fn render_error(
    url: &str,
    message: &str,
    identifiers: Option<&IdentifierRecord>,
) -> Html<String> {
    let mut body = String::new();
    if let Some(ids) = identifiers {
        body.push_str(&identifiers_section(ids));
    }
    body.push_str(&format!(
        "<div class=\"error\">{}</div>\n",
        html_escape(message)
    ));
    render_page(url, &body)
}

/// Fill both placeholders in one pass, so neither value is scanned for the
/// other's placeholder.
fn render_page(url: &str, results: &str) -> Html<String> {
    let (form, tail) = INDEX_HTML
        .split_once("{{ results }}")
        .unwrap_or((INDEX_HTML, ""));
    let mut html = form.replace("{{ url }}", &html_escape(url));
    html.push_str(results);
    html.push_str(tail);
    Html(html)
}

fn identifiers_section(ids: &IdentifierRecord) -> String {
    format!(
        "<h2>Identifiers Extracted</h2>\n<ul class=\"identifiers\">\n\
         <li><strong>DOI:</strong> {}</li>\n\
         <li><strong>HAL-Id:</strong> {}</li>\n</ul>\n",
        html_escape(ids.doi_or_sentinel()),
        html_escape(ids.hal_id_or_sentinel())
    )
}

fn table_html(table: &ResultTable) -> String {
    let mut out = String::from("<table>\n<thead><tr>");
    for col in COLUMNS {
        out.push_str(&format!("<th>{}</th>", col));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in [&row.author, &row.affiliation, &row.doi, &row.hal_id] {
            out.push_str(&format!("<td>{}</td>", html_escape(cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn csv_data_uri(table: &ResultTable) -> String {
    format!(
        "data:{};charset=utf-8;base64,{}",
        ExportFormat::Csv.mime_type(),
        STANDARD.encode(to_csv(table))
    )
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
