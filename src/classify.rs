//! Content-based classification of placeholder columns.
//!
//! When a sheet arrives with mostly generic column names, each placeholder
//! column's sampled values are tested against an ordered set of classifiers
//! and the first matching, not-yet-claimed label wins. The claimed-label set
//! is threaded explicitly so individual columns stay testable in isolation;
//! the pass is greedy and never backtracks.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::{headers::is_placeholder, normalize::parse_money, workbook::ParsedSheet};

/// Data rows sampled per column during classification.
pub const CLASSIFY_SAMPLE_ROWS: usize = 10;

/// Dollar-amount labels, claimed in this priority order. Which column gets
/// which label depends on column scan order, so this is best-effort by
/// construction: the heuristic cannot tell a cost column from a book-value
/// column when neither is labeled.
pub const DOLLAR_LABELS: &[&str] = &["Unit Cost", "Clean Trade", "Clean Retail", "Asking Price"];

pub(crate) const KNOWN_MAKES: &[&str] = &[
    "ford", "chevrolet", "chevy", "dodge", "ram", "jeep", "chrysler", "toyota",
    "honda", "nissan", "hyundai", "kia", "gmc", "buick", "cadillac", "lincoln",
    "mazda", "subaru", "volkswagen", "vw", "bmw", "mercedes", "audi", "lexus",
    "acura", "infiniti", "mitsubishi", "volvo", "pontiac", "saturn", "mercury",
];

pub(crate) const KNOWN_COLORS: &[&str] = &[
    "black", "white", "silver", "gray", "grey", "red", "blue", "green",
    "brown", "tan", "gold", "maroon", "burgundy", "beige", "orange", "yellow",
    "charcoal", "pearl", "granite", "bronze",
];

const BODY_STYLES: &[&str] = &[
    "sedan", "suv", "truck", "coupe", "van", "minivan", "wagon", "hatchback",
    "convertible", "crossover", "pickup", "roadster",
];

fn vin_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap())
}

fn stock_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9]+-[A-Z0-9]+$").unwrap())
}

/// Rename a column in place: the header entry and every row's key. Later
/// steps then see semantically named columns uniformly.
pub fn rename_column(sheet: &mut ParsedSheet, from: &str, to: &str) {
    if let Some(slot) = sheet.headers.iter_mut().find(|h| h.as_str() == from) {
        *slot = to.to_string();
    }
    for row in &mut sheet.rows {
        if let Some(value) = row.remove(from) {
            row.insert(to.to_string(), value);
        }
    }
}

/// Classify every placeholder column of a sheet by its data shape.
///
/// Runs only when at least half of the sheet's headers are placeholders;
/// sheets with real headers are left alone. Returns the labels claimed
/// during the pass so positional inference can build on them.
pub fn classify_placeholder_columns(sheet: &mut ParsedSheet) -> BTreeSet<String> {
    let mut claimed = BTreeSet::new();
    let placeholder_count = sheet.headers.iter().filter(|h| is_placeholder(h)).count();
    if placeholder_count * 2 < sheet.headers.len() {
        return claimed;
    }

    let targets: Vec<String> = sheet
        .headers
        .iter()
        .filter(|h| is_placeholder(h))
        .cloned()
        .collect();
    for header in targets {
        let samples: Vec<String> = sheet
            .column_values(&header)
            .take(CLASSIFY_SAMPLE_ROWS)
            .map(|v| v.to_string())
            .collect();
        if samples.is_empty() {
            continue;
        }
        if let Some(label) = classify_samples(&samples, &claimed) {
            debug!("Column '{header}' classified as '{label}'");
            rename_column(sheet, &header, &label);
            claimed.insert(label);
        }
    }
    claimed
}

/// Test one column's sampled values against the ordered classifiers,
/// honoring already-claimed labels. Returns the winning label, which the
/// caller must add to the claimed set.
pub fn classify_samples(samples: &[String], claimed: &BTreeSet<String>) -> Option<String> {
    let unclaimed = |label: &str| !claimed.contains(label);

    // 1. Identifier shape: VIN, then hyphenated stock code.
    if unclaimed("VIN") && half_match(samples, |v| vin_pattern().is_match(&v.to_uppercase())) {
        return Some("VIN".to_string());
    }
    if unclaimed("Stock #") && half_match(samples, is_stock_code) {
        return Some("Stock #".to_string());
    }

    // 2. Bounded integer range: a plausible model year.
    if unclaimed("Year") && half_match(samples, is_model_year) {
        return Some("Year".to_string());
    }

    // 3. Closed vocabularies, in fixed order: make, color, body style.
    if unclaimed("Make") && vocabulary_match(samples, KNOWN_MAKES) {
        return Some("Make".to_string());
    }
    if unclaimed("Color") && vocabulary_match(samples, KNOWN_COLORS) {
        return Some("Color".to_string());
    }
    if unclaimed("Class") && vocabulary_match(samples, BODY_STYLES) {
        return Some("Class".to_string());
    }

    // 4. Numeric-range bucketing over currency-stripped values.
    classify_numeric(samples, claimed)
}

fn half_match(samples: &[String], predicate: impl Fn(&str) -> bool) -> bool {
    let matches = samples.iter().filter(|v| predicate(v)).count();
    matches * 2 >= samples.len()
}

fn is_stock_code(value: &str) -> bool {
    let upper = value.to_uppercase();
    stock_pattern().is_match(&upper)
        && upper.bytes().any(|b| b.is_ascii_alphabetic())
        && upper.bytes().any(|b| b.is_ascii_digit())
}

fn is_model_year(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() == 4
        && trimmed
            .parse::<i64>()
            .is_ok_and(|year| (1990..=2030).contains(&year))
}

/// At least 30% of values contain a vocabulary token.
pub(crate) fn vocabulary_match(samples: &[String], vocabulary: &[&str]) -> bool {
    let matches = samples
        .iter()
        .filter(|value| {
            value
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| !token.is_empty() && vocabulary.contains(&token))
        })
        .count();
    matches * 10 >= samples.len() * 3
}

fn classify_numeric(samples: &[String], claimed: &BTreeSet<String>) -> Option<String> {
    let parsed: Vec<f64> = samples.iter().filter_map(|v| parse_money(v)).collect();
    // At least 40% of sampled values must parse as numbers.
    if parsed.len() * 10 < samples.len() * 4 {
        return None;
    }
    let mean = parsed.iter().sum::<f64>() / parsed.len() as f64;
    let has_negative = parsed.iter().any(|v| *v < 0.0);
    let integral = parsed.iter().all(|v| v.fract() == 0.0);
    let currency_marked = samples
        .iter()
        .any(|v| v.contains('$') || v.contains(',') || has_cents(v));

    // A signed spread (cost vs book value) is the only bucket that admits
    // negatives.
    if has_negative {
        return claimed_first(&["Cost Diff"], claimed);
    }
    if !currency_marked && integral && mean <= 400.0 {
        return claimed_first(&["Age Days"], claimed);
    }
    if !currency_marked && integral && mean >= 50_000.0 {
        return claimed_first(&["Odometer"], claimed);
    }
    claimed_first(DOLLAR_LABELS, claimed)
}

fn has_cents(value: &str) -> bool {
    value
        .split_once('.')
        .is_some_and(|(_, frac)| frac.len() == 2 && frac.bytes().all(|b| b.is_ascii_digit()))
}

fn claimed_first(labels: &[&str], claimed: &BTreeSet<String>) -> Option<String> {
    labels
        .iter()
        .find(|label| !claimed.contains(**label))
        .map(|label| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sheet_from_columns(columns: Vec<Vec<&str>>) -> ParsedSheet {
        let headers: Vec<String> = (0..columns.len()).map(|i| format!("col{}", i + 1)).collect();
        let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);
        let rows = (0..row_count)
            .map(|r| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(c, h)| {
                        (
                            h.clone(),
                            columns[c].get(r).map(|v| v.to_string()),
                        )
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        ParsedSheet {
            name: "dump".into(),
            index: 0,
            headers,
            rows,
        }
    }

    #[test]
    fn vin_shaped_values_classify_as_vin() {
        let samples = strings(&[
            "1C4RJFBG5LC123456",
            "3GNEK12T84G123789",
            "JTDKB20U297654321",
        ]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("VIN")
        );
    }

    #[test]
    fn vin_pattern_rejects_i_o_q() {
        let samples = strings(&["1C4RJFBG5IO123456", "1C4RJFBG5QC123456"]);
        assert_ne!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("VIN")
        );
    }

    #[test]
    fn hyphenated_codes_classify_as_stock_number() {
        let samples = strings(&["A-1001", "B-2044", "C-3310"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Stock #")
        );
    }

    #[test]
    fn four_digit_years_in_range_classify_as_year() {
        let samples = strings(&["1998", "2004", "2023", "2019"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Year")
        );
        let out_of_range = strings(&["1901", "1885", "1920"]);
        assert_ne!(
            classify_samples(&out_of_range, &BTreeSet::new()).as_deref(),
            Some("Year")
        );
    }

    #[test]
    fn make_vocabulary_beats_color_vocabulary_in_order() {
        let samples = strings(&["JEEP", "FORD", "RAM", "gravel"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Make")
        );
    }

    #[test]
    fn claimed_label_is_never_reassigned() {
        let samples = strings(&["JEEP", "FORD", "RAM"]);
        let mut claimed = BTreeSet::new();
        claimed.insert("Make".to_string());
        // Make is taken and nothing else fits these values.
        assert_eq!(classify_samples(&samples, &claimed), None);
    }

    #[test]
    fn negative_values_classify_as_cost_diff() {
        let samples = strings(&["1250", "-300", "2100.50", "975"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Cost Diff")
        );
    }

    #[test]
    fn small_integers_classify_as_age_days() {
        let samples = strings(&["12", "45", "130", "8"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Age Days")
        );
    }

    #[test]
    fn large_bare_integers_classify_as_odometer() {
        let samples = strings(&["88450", "120300", "64012"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Odometer")
        );
    }

    #[test]
    fn dollar_amounts_take_the_first_unclaimed_dollar_label() {
        let samples = strings(&["$12,500.00", "$9,800.00", "$41,250.00"]);
        assert_eq!(
            classify_samples(&samples, &BTreeSet::new()).as_deref(),
            Some("Unit Cost")
        );
        let mut claimed = BTreeSet::new();
        claimed.insert("Unit Cost".to_string());
        assert_eq!(
            classify_samples(&samples, &claimed).as_deref(),
            Some("Clean Trade")
        );
    }

    #[test]
    fn sheet_scenario_year_make_dollar() {
        let mut sheet = sheet_from_columns(vec![
            vec!["1998", "2004", "2023", "2011", "2016"],
            vec!["ford", "honda", "toyota", "jeep", "ram"],
            vec!["$8,000.00", "$45,000.00", "$12,300.00", "$22,150.00", "$9,975.00"],
        ]);
        classify_placeholder_columns(&mut sheet);
        assert_eq!(sheet.headers, vec!["Year", "Make", "Unit Cost"]);
        assert_eq!(
            sheet.rows[0].get("Year").unwrap().as_deref(),
            Some("1998")
        );
    }

    #[test]
    fn classification_skipped_when_most_headers_are_real() {
        let mut sheet = sheet_from_columns(vec![
            vec!["1998", "2004"],
            vec!["ford", "honda"],
            vec!["$8,000.00", "$45,000.00"],
        ]);
        sheet.headers = vec!["Year".into(), "Make".into(), "col3".into()];
        let mut rekeyed = Vec::new();
        for row in &sheet.rows {
            let mut new_row = BTreeMap::new();
            for (old, new) in [("col1", "Year"), ("col2", "Make"), ("col3", "col3")] {
                new_row.insert(new.to_string(), row.get(old).cloned().flatten());
            }
            rekeyed.push(new_row);
        }
        sheet.rows = rekeyed;

        let claimed = classify_placeholder_columns(&mut sheet);
        assert!(claimed.is_empty());
        assert_eq!(sheet.headers[2], "col3");
    }
}
