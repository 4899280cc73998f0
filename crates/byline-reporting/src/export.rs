use byline_core::{ResultRow, ResultTable};
use serde_json::json;

use crate::COLUMNS;

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn row_cells(row: &ResultRow) -> [&str; 4] {
    [&row.author, &row.affiliation, &row.doi, &row.hal_id]
}

/// `Author,Affiliation,DOI,HAL-Id` header, then one line per row.
///
/// The header is written even when there are no rows.
pub fn to_csv(table: &ResultTable) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    for row in &table.rows {
        let cells: Vec<String> = row_cells(row).iter().map(|c| csv_escape(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

pub fn to_json(table: &ResultTable) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "identifiers": table.identifiers,
        "authors": table.rows,
    }))
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

pub fn to_markdown(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str("# Authors and Identifiers\n\n");
    out.push_str(&format!(
        "- **DOI:** {}\n- **HAL-Id:** {}\n\n",
        md_escape(table.identifiers.doi_or_sentinel()),
        md_escape(table.identifiers.hal_id_or_sentinel())
    ));

    if table.is_empty() {
        out.push_str("_No authors identified._\n");
        return out;
    }

    out.push_str(&format!("| {} |\n", COLUMNS.join(" | ")));
    out.push_str(&format!("|{}\n", "---|".repeat(COLUMNS.len())));
    for row in &table.rows {
        let cells: Vec<String> = row_cells(row).iter().map(|c| md_escape(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use byline_core::{AuthorRecord, IdentifierRecord};

    fn ids() -> IdentifierRecord {
        IdentifierRecord {
            doi: Some("10.1234/abc.DEF-5".into()),
            hal_id: Some("hal-02345678".into()),
        }
    }

    fn author(name: &str, affiliation: &str) -> AuthorRecord {
        AuthorRecord {
            author: name.into(),
            affiliation: affiliation.into(),
        }
    }

    #[test]
    fn csv_single_row() {
        let table = ResultTable::broadcast(vec![author("A. Smith", "MIT")], ids());
        assert_eq!(
            to_csv(&table),
            "Author,Affiliation,DOI,HAL-Id\nA. Smith,MIT,10.1234/abc.DEF-5,hal-02345678\n"
        );
    }

    #[test]
    fn csv_quotes_commas_quotes_and_newlines() {
        let table = ResultTable::broadcast(
            vec![
                author("Smith, A.", "MIT"),
                author("B. \"Bo\" Jones", "Inria\nParis"),
            ],
            IdentifierRecord::default(),
        );
        let csv = to_csv(&table);
        let lines: Vec<&str> = csv.splitn(2, '\n').collect();
        assert_eq!(lines[0], "Author,Affiliation,DOI,HAL-Id");
        assert!(csv.contains("\"Smith, A.\",MIT,Not found,Not found\n"));
        assert!(csv.contains("\"B. \"\"Bo\"\" Jones\",\"Inria\nParis\",Not found,Not found\n"));
    }

    #[test]
    fn csv_empty_table_is_header_only() {
        let table = ResultTable::broadcast(Vec::new(), ids());
        assert_eq!(to_csv(&table), "Author,Affiliation,DOI,HAL-Id\n");
    }

    #[test]
    fn csv_keeps_non_ascii() {
        let table = ResultTable::broadcast(vec![author("Zoé Lefèvre", "Université de Lyon")], ids());
        assert!(to_csv(&table).contains("Zoé Lefèvre,Université de Lyon,"));
    }

    #[test]
    fn json_shape() {
        let table = ResultTable::broadcast(vec![author("A. Smith", "MIT")], ids());
        let value: serde_json::Value = serde_json::from_str(&to_json(&table).unwrap()).unwrap();
        assert_eq!(value["identifiers"]["DOI"], "10.1234/abc.DEF-5");
        assert_eq!(value["identifiers"]["HAL-Id"], "hal-02345678");
        assert_eq!(value["authors"][0]["Author"], "A. Smith");
        assert_eq!(value["authors"][0]["HAL-Id"], "hal-02345678");
    }

    #[test]
    fn markdown_escapes_pipes() {
        let table = ResultTable::broadcast(vec![author("A|B", "Lab")], ids());
        let md = to_markdown(&table);
        assert!(md.contains("| Author | Affiliation | DOI | HAL-Id |"));
        assert!(md.contains("|---|---|---|---|"));
        assert!(md.contains("| A\\|B | Lab | 10.1234/abc.DEF-5 | hal-02345678 |"));
    }

    #[test]
    fn markdown_empty_table() {
        let md = to_markdown(&ResultTable::broadcast(Vec::new(), IdentifierRecord::default()));
        assert!(md.contains("- **DOI:** Not found"));
        assert!(md.contains("_No authors identified._"));
    }
}
