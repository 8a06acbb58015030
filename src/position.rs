//! Positional column inference.
//!
//! A second pass over columns the content classifier could not name.
//! Model and trim text is too free-form to recognize by shape alone, but
//! inventory exports keep a stable column order: the model sits right after
//! the make, and the trim/series within a few columns of the model. Both
//! renames are full rekeys so downstream steps see the semantic names.

use log::debug;

use crate::{
    classify::{CLASSIFY_SAMPLE_ROWS, KNOWN_COLORS, KNOWN_MAKES, rename_column, vocabulary_match},
    headers::is_placeholder,
    normalize::parse_money,
    workbook::ParsedSheet,
};

const MODEL_MAX_LEN: usize = 35;
const TRIM_SCAN_SPAN: usize = 3;

/// Resolve model and trim columns relative to already-classified anchors.
pub fn infer_positional_columns(sheet: &mut ParsedSheet) {
    infer_model_after_make(sheet);
    infer_trim_after_model(sheet);
}

/// The column immediately following "Make", if still a placeholder, becomes
/// "Model" when its values are short free text that is neither a make nor a
/// color.
fn infer_model_after_make(sheet: &mut ParsedSheet) {
    let Some(make_idx) = column_index(sheet, "Make") else {
        return;
    };
    let Some(candidate) = sheet.headers.get(make_idx + 1).cloned() else {
        return;
    };
    if !is_placeholder(&candidate) {
        return;
    }
    let samples = sample_column(sheet, &candidate);
    if samples.is_empty() {
        return;
    }
    let plausible = samples.iter().all(|v| v.len() <= MODEL_MAX_LEN)
        && !vocabulary_match(&samples, KNOWN_MAKES)
        && !vocabulary_match(&samples, KNOWN_COLORS);
    if plausible {
        debug!("Column '{candidate}' inferred as Model (follows Make)");
        rename_column(sheet, &candidate, "Model");
    }
}

/// Within three columns after "Model" (or "Class" when no model column
/// exists), a still-unlabeled column holding wordy, non-numeric,
/// non-dollar text becomes the trim/series column.
fn infer_trim_after_model(sheet: &mut ParsedSheet) {
    let anchor = column_index(sheet, "Model").or_else(|| column_index(sheet, "Class"));
    let Some(anchor_idx) = anchor else {
        return;
    };
    let candidates: Vec<String> = sheet
        .headers
        .iter()
        .skip(anchor_idx + 1)
        .take(TRIM_SCAN_SPAN)
        .filter(|h| is_placeholder(h))
        .cloned()
        .collect();
    for candidate in candidates {
        let samples = sample_column(sheet, &candidate);
        if samples.is_empty() {
            continue;
        }
        if samples.iter().all(|v| looks_like_trim(v)) {
            debug!("Column '{candidate}' inferred as Series/Trim (follows anchor)");
            rename_column(sheet, &candidate, "Series/Trim");
            return;
        }
    }
}

fn looks_like_trim(value: &str) -> bool {
    let multi_word = value.trim().contains(' ');
    let alphabetic = value.chars().any(|c| c.is_alphabetic());
    let purely_numeric = value.trim().parse::<f64>().is_ok();
    let dollar = value.contains('$') && parse_money(value).is_some();
    (multi_word || alphabetic) && !purely_numeric && !dollar
}

fn column_index(sheet: &ParsedSheet, header: &str) -> Option<usize> {
    sheet.headers.iter().position(|h| h == header)
}

fn sample_column(sheet: &ParsedSheet, header: &str) -> Vec<String> {
    sheet
        .column_values(header)
        .take(CLASSIFY_SAMPLE_ROWS)
        .map(|v| v.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sheet(headers: &[&str], columns: Vec<Vec<&str>>) -> ParsedSheet {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);
        let rows = (0..row_count)
            .map(|r| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(c, h)| (h.clone(), columns[c].get(r).map(|v| v.to_string())))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        ParsedSheet {
            name: "INVENTORY".into(),
            index: 0,
            headers,
            rows,
        }
    }

    #[test]
    fn column_after_make_becomes_model() {
        let mut s = sheet(
            &["Make", "col2"],
            vec![
                vec!["JEEP", "RAM", "FORD"],
                vec!["GRAND CHEROKEE", "1500", "F-150"],
            ],
        );
        infer_positional_columns(&mut s);
        assert_eq!(s.headers, vec!["Make", "Model"]);
        assert_eq!(
            s.rows[0].get("Model").unwrap().as_deref(),
            Some("GRAND CHEROKEE")
        );
    }

    #[test]
    fn make_valued_column_is_not_model() {
        let mut s = sheet(
            &["Make", "col2"],
            vec![vec!["JEEP", "RAM"], vec!["DODGE", "FORD"]],
        );
        infer_positional_columns(&mut s);
        assert_eq!(s.headers[1], "col2");
    }

    #[test]
    fn trim_found_within_three_columns_of_model() {
        let mut s = sheet(
            &["Model", "col2", "col3"],
            vec![
                vec!["WRANGLER", "CHEROKEE"],
                vec!["24500", "31200"],
                vec!["SPORT 4X4", "LIMITED"],
            ],
        );
        infer_positional_columns(&mut s);
        assert_eq!(s.headers, vec!["Model", "col2", "Series/Trim"]);
    }

    #[test]
    fn class_anchors_trim_when_model_is_absent() {
        let mut s = sheet(
            &["Class", "col2"],
            vec![vec!["SUV", "TRUCK"], vec!["LAREDO E", "BIG HORN"]],
        );
        infer_positional_columns(&mut s);
        assert_eq!(s.headers[1], "Series/Trim");
    }

    #[test]
    fn dollar_columns_are_not_trim() {
        let mut s = sheet(
            &["Model", "col2"],
            vec![vec!["WRANGLER"], vec!["$24,500.00"]],
        );
        infer_positional_columns(&mut s);
        assert_eq!(s.headers[1], "col2");
    }
}
