//! Header row location for inconsistently exported sheets.
//!
//! Legacy exports bury the real header row under title banners, blank
//! spacer rows, or event branding, and pure data dumps have no header row
//! at all. The locator scores the first few rows against a domain keyword
//! vocabulary and either selects a header row or falls back to placeholder
//! column names.

use std::collections::HashSet;

/// Rows scanned when looking for a header row.
pub const HEADER_SCAN_ROWS: usize = 10;
/// Rows scanned to size placeholder headers when no header row exists.
pub const PLACEHOLDER_WIDTH_SCAN_ROWS: usize = 5;

/// Column-name vocabulary from the dealership domain. A cell counts toward
/// a row's header score when any of its lowercase words appears here.
const HEADER_KEYWORDS: &[&str] = &[
    "stock", "vin", "year", "make", "model", "trim", "series", "class",
    "color", "odometer", "miles", "mileage", "hat", "age", "days", "cost",
    "trade", "retail", "price", "profit", "spread", "drivetrain", "status",
    "salesperson", "customer", "name", "phone", "role", "lender", "bank",
    "rate", "reserve", "gross", "warranty", "gap", "deal", "store", "zip",
    "town", "pieces", "responses", "unit", "vehicle", "buy",
];

/// Outcome of scanning a sheet's leading rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Index of the chosen header row within the scanned rows, or `None`
    /// when every scanned row scored zero.
    pub header_row: Option<usize>,
    /// Final column labels: either the chosen row's cells (blanks and
    /// duplicates patched) or generated placeholders.
    pub headers: Vec<String>,
}

/// Scan up to [`HEADER_SCAN_ROWS`] resolved rows and pick the header row.
///
/// The row with the strictly highest keyword score wins; ties break in scan
/// order. A maximum score of zero means the sheet is a pure data dump:
/// every row is data and placeholder names sized to the widest of the first
/// [`PLACEHOLDER_WIDTH_SCAN_ROWS`] rows are used instead.
pub fn locate_header_row(rows: &[Vec<Option<String>>]) -> HeaderLocation {
    let keywords: HashSet<&str> = HEADER_KEYWORDS.iter().copied().collect();
    let scan = rows.len().min(HEADER_SCAN_ROWS);

    let mut best_row = None;
    let mut best_score = 0usize;
    for (idx, row) in rows.iter().take(scan).enumerate() {
        let score = row
            .iter()
            .flatten()
            .filter(|cell| cell_matches_vocabulary(cell, &keywords))
            .count();
        if score > best_score {
            best_score = score;
            best_row = Some(idx);
        }
    }

    match best_row {
        Some(idx) => HeaderLocation {
            header_row: Some(idx),
            headers: labels_from_row(&rows[idx]),
        },
        None => {
            let width = rows
                .iter()
                .take(PLACEHOLDER_WIDTH_SCAN_ROWS)
                .map(|row| row.len())
                .max()
                .unwrap_or(0);
            HeaderLocation {
                header_row: None,
                headers: placeholder_names(width),
            }
        }
    }
}

/// One increment per cell, no matter how many keywords it contains.
fn cell_matches_vocabulary(cell: &str, keywords: &HashSet<&str>) -> bool {
    cell.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| !word.is_empty() && keywords.contains(word))
}

/// Turn a header row into distinct labels: blank cells become placeholders
/// and repeated labels get a positional suffix.
fn labels_from_row(row: &[Option<String>]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut labels = Vec::with_capacity(row.len());
    for (idx, cell) in row.iter().enumerate() {
        let base = cell
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| placeholder_name(idx));
        let label = if seen.contains(&base.to_lowercase()) {
            format!("{base}_{}", idx + 1)
        } else {
            base
        };
        seen.insert(label.to_lowercase());
        labels.push(label);
    }
    labels
}

pub fn placeholder_name(index: usize) -> String {
    format!("col{}", index + 1)
}

pub fn placeholder_names(count: usize) -> Vec<String> {
    (0..count).map(placeholder_name).collect()
}

/// Whether a label is a generated placeholder rather than a real header.
pub fn is_placeholder(label: &str) -> bool {
    let lowered = label.to_ascii_lowercase();
    lowered
        .strip_prefix("col")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
