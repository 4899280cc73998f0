use byline_core::ResultTable;

use crate::COLUMNS;

/// Render `table` as a fixed-width plain-text grid for terminals.
///
/// Column widths are measured in chars, so accented names line up; wide
/// CJK glyphs may still drift by a column.
pub fn render_table(table: &ResultTable) -> String {
    let rows: Vec<[&str; 4]> = table
        .rows
        .iter()
        .map(|r| {
            [
                r.author.as_str(),
                r.affiliation.as_str(),
                r.doi.as_str(),
                r.hal_id.as_str(),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(|c| c.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(single_line(cell).chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &COLUMNS, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("-+-").trim_end());
    out.push('\n');
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_line(out: &mut String, cells: &[&str; 4], widths: &[usize; 4]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| {
            let cell = single_line(cell);
            let pad = w.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}
