//! Cell representations and the display-value resolver.
//!
//! Legacy workbook exports carry a zoo of cell shapes: plain literals,
//! formulas whose computed result may or may not be cached in the file,
//! rich-text runs, and hyperlink objects. Every downstream step works on the
//! single string produced by [`resolve_cell`], so the priority order here is
//! load-bearing: a stale or absent cached formula result must resolve to
//! `None` rather than a guessed value.

use chrono::NaiveDateTime;

/// One cell's raw value as found in the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// A spreadsheet error literal such as `#REF!` or `#DIV/0!`. Kept as
    /// text so the normalizer can quarantine it per field instead of
    /// dropping the row.
    Error(String),
    /// Rich text: the concatenation of the run texts is the display value.
    RichText(Vec<String>),
    /// A hyperlink cell; `text` is the display text when present.
    Hyperlink {
        text: Option<String>,
        target: String,
    },
    /// A formula with an optionally cached computed result. Formulas are
    /// never evaluated here.
    Formula {
        source: String,
        cached: Option<Box<CellValue>>,
    },
}

/// A cell plus the pre-rendered display string some writers embed alongside
/// the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub display: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell {
            value,
            display: None,
        }
    }

    pub fn with_display(value: CellValue, display: impl Into<String>) -> Self {
        Cell {
            value,
            display: Some(display.into()),
        }
    }

    pub fn empty() -> Self {
        Cell::new(CellValue::Empty)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::new(CellValue::Text(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Cell::new(CellValue::Number(value))
    }
}

/// Resolve a cell to its canonical display string, or `None` when the cell
/// has no usable value.
///
/// Priority order:
/// 1. the pre-rendered display text, when present and non-empty;
/// 2. a formula's cached result (dates rendered as ISO-8601);
/// 3. the raw literal, including rich-text run concatenation and hyperlink
///    display text;
/// 4. nothing; in particular a formula with no cached result resolves to
///    `None` instead of being evaluated.
pub fn resolve_cell(cell: &Cell) -> Option<String> {
    if let Some(display) = &cell.display {
        let trimmed = display.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    resolve_value(&cell.value)
}

fn resolve_value(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        CellValue::Number(n) => Some(render_number(*n)),
        CellValue::Bool(b) => Some(b.to_string()),
        CellValue::Date(dt) => Some(render_date(dt)),
        CellValue::Error(code) => Some(code.clone()),
        CellValue::RichText(runs) => {
            let joined = runs.concat();
            let trimmed = joined.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        CellValue::Hyperlink { text, target } => {
            let display = text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(target.trim());
            if display.is_empty() {
                None
            } else {
                Some(display.to_string())
            }
        }
        CellValue::Formula { cached, .. } => cached.as_deref().and_then(resolve_value),
    }
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

fn render_date(dt: &NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.date().format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn display_text_wins_over_raw_value() {
        let cell = Cell::with_display(CellValue::Number(42000.0), "$42,000");
        assert_eq!(resolve_cell(&cell).as_deref(), Some("$42,000"));
    }

    #[test]
    fn blank_display_falls_through_to_value() {
        let cell = Cell::with_display(CellValue::Text("JT123".into()), "   ");
        assert_eq!(resolve_cell(&cell).as_deref(), Some("JT123"));
    }

    #[test]
    fn cached_formula_result_is_used() {
        let cell = Cell::new(CellValue::Formula {
            source: "=O2-Q2".into(),
            cached: Some(Box::new(CellValue::Number(1250.5))),
        });
        assert_eq!(resolve_cell(&cell).as_deref(), Some("1250.5"));
    }

    #[test]
    fn uncached_formula_resolves_to_none() {
        let cell = Cell::new(CellValue::Formula {
            source: "=SUM(A1:A9)".into(),
            cached: None,
        });
        assert_eq!(resolve_cell(&cell), None);
    }

    #[test]
    fn cached_date_renders_iso() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 24)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cell = Cell::new(CellValue::Formula {
            source: "=TODAY()".into(),
            cached: Some(Box::new(CellValue::Date(date))),
        });
        assert_eq!(resolve_cell(&cell).as_deref(), Some("2026-02-24"));
    }

    #[test]
    fn rich_text_runs_concatenate() {
        let cell = Cell::new(CellValue::RichText(vec![
            "JEEP ".into(),
            "GRAND ".into(),
            "CHEROKEE".into(),
        ]));
        assert_eq!(resolve_cell(&cell).as_deref(), Some("JEEP GRAND CHEROKEE"));
    }

    #[test]
    fn hyperlink_prefers_display_text() {
        let cell = Cell::new(CellValue::Hyperlink {
            text: Some("NATE HARDING".into()),
            target: "mailto:nate@example.com".into(),
        });
        assert_eq!(resolve_cell(&cell).as_deref(), Some("NATE HARDING"));

        let bare = Cell::new(CellValue::Hyperlink {
            text: None,
            target: "https://example.com/unit/4821".into(),
        });
        assert_eq!(
            resolve_cell(&bare).as_deref(),
            Some("https://example.com/unit/4821")
        );
    }

    #[test]
    fn error_literals_pass_through() {
        let cell = Cell::new(CellValue::Error("#REF!".into()));
        assert_eq!(resolve_cell(&cell).as_deref(), Some("#REF!"));
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(resolve_cell(&Cell::number(2019.0)).as_deref(), Some("2019"));
        assert_eq!(
            resolve_cell(&Cell::number(8144.35)).as_deref(),
            Some("8144.35")
        );
    }
}
