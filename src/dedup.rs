//! Business-key deduplication and the roster structural filter.

use std::collections::HashSet;

use log::debug;

use crate::{
    mapper::ColumnMap,
    normalize::{Record, clean_roster_name},
    router::TabType,
    workbook::ParsedSheet,
};

/// Rows scanned when hunting for a roster numbering column.
const NUMBERING_SCAN_ROWS: usize = 25;
/// Upper bound for a "small positive integer" row number.
const NUMBERING_MAX: i64 = 500;

/// Tracks business keys already present in the target dataset and earlier
/// in the same file. Keys compare case-insensitively.
#[derive(Debug, Default)]
pub struct DedupGuard {
    existing: HashSet<String>,
    seen_in_file: HashSet<String>,
}

impl DedupGuard {
    /// Build a guard from the target store's existing records, fetched once
    /// up front.
    pub fn from_existing(records: &[Record], tab: TabType) -> Self {
        let existing = records
            .iter()
            .filter_map(|record| crate::normalize::business_key(record, tab))
            .map(|key| key.to_lowercase())
            .collect();
        DedupGuard {
            existing,
            seen_in_file: HashSet::new(),
        }
    }

    /// Record a key and report whether it duplicates an earlier one. The
    /// second and later in-file occurrence is always the duplicate; the
    /// store check only applies in append mode, since replace mode deletes
    /// the existing rows before inserting.
    pub fn is_duplicate(&mut self, key: &str, check_store: bool) -> bool {
        let folded = key.to_lowercase();
        if !self.seen_in_file.insert(folded.clone()) {
            return true;
        }
        check_store && self.existing.contains(&folded)
    }
}

/// Per-row acceptance for roster sheets.
///
/// Roster exports interleave section headers and summary rows with real
/// entries. When a numbering column exists (sampled values include 1, 2,
/// and 3 among at least three small positive integers), only rows whose
/// number parses as a small positive integer are accepted. Without one,
/// acceptance falls back to name-only filtering via the mapped name column.
pub fn roster_acceptance(sheet: &ParsedSheet, map: &ColumnMap) -> Vec<bool> {
    if let Some(column) = detect_numbering_column(sheet) {
        debug!("Roster numbering column: '{column}'");
        return sheet
            .rows
            .iter()
            .map(|row| {
                row.get(&column)
                    .and_then(|v| v.as_deref())
                    .is_some_and(|v| small_positive_int(v).is_some())
            })
            .collect();
    }

    let name_header = map
        .entries
        .iter()
        .find(|(_, target)| target.as_deref() == Some("name"))
        .map(|(header, _)| header.clone());
    sheet
        .rows
        .iter()
        .map(|row| {
            name_header
                .as_ref()
                .and_then(|header| row.get(header))
                .and_then(|v| v.as_deref())
                .is_some_and(|name| clean_roster_name(name).is_some())
        })
        .collect()
}

fn detect_numbering_column(sheet: &ParsedSheet) -> Option<String> {
    for header in &sheet.headers {
        let numbers: Vec<i64> = sheet
            .column_values(header)
            .take(NUMBERING_SCAN_ROWS)
            .filter_map(small_positive_int)
            .collect();
        let has_sequence_start =
            [1, 2, 3].iter().all(|needle| numbers.contains(needle));
        if numbers.len() >= 3 && has_sequence_start {
            return Some(header.clone());
        }
    }
    None
}

fn small_positive_int(value: &str) -> Option<i64> {
    let parsed = value.trim().parse::<f64>().ok()?;
    if parsed.fract() != 0.0 {
        return None;
    }
    let n = parsed as i64;
    (1..=NUMBERING_MAX).contains(&n).then_some(n)
}
