//! Lexical identifier matching over first-page text.
//!
//! Matches are purely textual: a DOI is not resolved against doi.org and a
//! HAL-Id is not looked up in the HAL archive.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::IdentifierRecord;

/// Placeholder shown and exported when an identifier was not matched.
pub const NOT_FOUND: &str = "Not found";

/// `10.` + 4-9 digit registrant + `/` + suffix.
static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").unwrap());

static HAL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)hal-[a-zA-Z0-9]+").unwrap());

/// Leftmost DOI-shaped token in `text`, exactly as written.
///
/// Trailing punctuation that the suffix alphabet allows (`.`, `;`, `)`) is
/// kept; the token is reported verbatim.
pub fn find_doi(text: &str) -> Option<&str> {
    DOI_RE.find(text).map(|m| m.as_str())
}

/// Leftmost `hal-<alphanumerics>` token in `text`, prefix case preserved.
pub fn find_hal_id(text: &str) -> Option<&str> {
    HAL_ID_RE.find(text).map(|m| m.as_str())
}

/// Run both searches independently and collect them into a record.
pub fn extract_identifiers(text: &str) -> IdentifierRecord {
    let record = IdentifierRecord {
        doi: find_doi(text).map(str::to_string),
        hal_id: find_hal_id(text).map(str::to_string),
    };
    tracing::debug!(
        doi = record.doi_or_sentinel(),
        hal_id = record.hal_id_or_sentinel(),
        "identifier matching complete"
    );
    record
}
