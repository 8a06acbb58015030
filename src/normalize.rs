//! Row normalization, financial derivation, and per-tab schema validation.
//!
//! Coercion is deliberately forgiving at the field level: legacy exports
//! are full of `#REF!` and other formula garbage, and one bad numeric cell
//! must not destroy an otherwise-valid row. The field becomes null and the
//! row proceeds. Rows are only excluded for a missing business key (counted
//! separately) or a schema violation (recorded as a row error).

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};

use crate::{mapper::ColumnMap, router::TabType};

/// Asking-price tiers as percent multipliers over clean trade value.
pub const PRICE_TIERS: &[(u32, f64)] = &[(115, 1.15), (120, 1.20), (125, 1.25), (130, 1.30)];

/// A normalized record ready for the store.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
}

/// One target field's type and (for numerics) allowed range.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
        min: None,
        max: None,
    }
}

const fn integer(name: &'static str, min: f64, max: f64) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer,
        min: Some(min),
        max: Some(max),
    }
}

const fn float(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Float,
        min: None,
        max: None,
    }
}

const fn float_min(name: &'static str, min: f64) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Float,
        min: Some(min),
        max: None,
    }
}

const INVENTORY_FIELDS: &[FieldSpec] = &[
    integer("hat_number", 0.0, 100_000.0),
    text("status_label"),
    text("sold_status"),
    text("stock_number"),
    integer("year", 1900.0, 2035.0),
    text("make"),
    text("model"),
    text("class"),
    text("color"),
    integer("odometer", 0.0, 1_000_000.0),
    text("vin"),
    text("series_trim"),
    integer("age_days", 0.0, 10_000.0),
    text("drivetrain"),
    float_min("jd_trade_clean", 0.0),
    float_min("jd_retail_clean", 0.0),
    float_min("unit_cost", 0.0),
    float("cost_diff"),
    float("retail_spread"),
    float_min("price_115", 0.0),
    float_min("price_120", 0.0),
    float_min("price_125", 0.0),
    float_min("price_130", 0.0),
    float("profit_115"),
    float("profit_120"),
    float("profit_125"),
    float("profit_130"),
];

const ROSTER_FIELDS: &[FieldSpec] = &[
    integer("row_number", 1.0, 10_000.0),
    text("name"),
    text("phone"),
    text("role"),
    FieldSpec {
        name: "confirmed",
        kind: FieldKind::Boolean,
        min: None,
        max: None,
    },
];

const DEALS_FIELDS: &[FieldSpec] = &[
    integer("deal_number", 0.0, 1_000_000.0),
    text("store"),
    text("stock_number"),
    text("customer_name"),
    text("zip_code"),
    text("new_used"),
    integer("purchase_year", 1900.0, 2035.0),
    text("purchase_make"),
    text("purchase_model"),
    float("vehicle_cost"),
    integer("vehicle_age", 0.0, 10_000.0),
    integer("trade_year", 1900.0, 2035.0),
    text("trade_make"),
    text("trade_model"),
    text("salesperson"),
    text("second_salesperson"),
    float("front_gross"),
    text("lender"),
    FieldSpec {
        name: "rate",
        kind: FieldKind::Float,
        min: Some(0.0),
        max: Some(100.0),
    },
    float("reserve"),
    float("warranty"),
    float("aft1"),
    float("gap"),
    float("fi_total"),
    float("total_gross"),
];

const LENDERS_FIELDS: &[FieldSpec] = &[
    text("name"),
    FieldSpec {
        name: "buy_rate_pct",
        kind: FieldKind::Float,
        min: Some(0.0),
        max: Some(100.0),
    },
];

pub fn schema_for(tab: TabType) -> &'static [FieldSpec] {
    match tab {
        TabType::Inventory => INVENTORY_FIELDS,
        TabType::Roster => ROSTER_FIELDS,
        TabType::Deals => DEALS_FIELDS,
        TabType::Lenders => LENDERS_FIELDS,
        TabType::Unknown => &[],
    }
}

fn field_spec(tab: TabType, name: &str) -> Option<&'static FieldSpec> {
    schema_for(tab).iter().find(|spec| spec.name == name)
}

/// Parse a currency-ish string into a number: `$`, grouping commas, and
/// accountant parentheses are tolerated. Returns `None` for anything that
/// still fails to parse, including formula error literals.
pub fn parse_money(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (body, negate) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned)
        .ok()
        .and_then(|d| d.to_f64())
        .or_else(|| cleaned.parse::<f64>().ok())?;
    Some(if negate { -value } else { value })
}

pub fn round2(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Apply the frozen column map and coerce one raw row into a typed record.
///
/// Blanks become explicit nulls. Numeric fields that fail coercion become
/// null independently; the row itself always survives this step.
pub fn normalize_row(
    raw: &BTreeMap<String, Option<String>>,
    map: &ColumnMap,
    tab: TabType,
) -> Record {
    let mut record = Record::new();
    for (header, value) in raw {
        let Some(target) = map.target(header) else {
            continue;
        };
        let coerced = match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Value::Null,
            Some(text_value) => coerce_field(text_value, field_spec(tab, target)),
        };
        // Two headers mapped to the same target: last mapping wins, a
        // caller-visible configuration choice.
        record.insert(target.to_string(), coerced);
    }
    apply_tab_defaults(&mut record, tab);
    record
}

fn coerce_field(value: &str, spec: Option<&FieldSpec>) -> Value {
    let Some(spec) = spec else {
        return Value::String(value.to_string());
    };
    match spec.kind {
        FieldKind::Text => Value::String(value.to_string()),
        FieldKind::Integer => match parse_money(value) {
            Some(parsed) => json!(parsed.round() as i64),
            None => Value::Null,
        },
        FieldKind::Float => match parse_money(value) {
            Some(parsed) => json!(parsed),
            None => Value::Null,
        },
        FieldKind::Boolean => match value.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Value::Bool(true),
            "false" | "f" | "no" | "n" | "0" => Value::Bool(false),
            _ => Value::Null,
        },
    }
}

fn apply_tab_defaults(record: &mut Record, tab: TabType) {
    match tab {
        TabType::Inventory => {
            if let Some(Value::String(raw)) = record.get("sold_status") {
                let status = if raw.to_lowercase().contains("sold") {
                    "sold"
                } else {
                    "available"
                };
                record.insert("sold_status".into(), Value::String(status.into()));
            }
        }
        TabType::Roster => {
            if !matches!(record.get("role"), Some(Value::String(_))) {
                record.insert("role".into(), Value::String("sales".into()));
            }
            if !matches!(record.get("confirmed"), Some(Value::Bool(_))) {
                record.insert("confirmed".into(), Value::Bool(true));
            }
        }
        _ => {}
    }
}

fn number(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

fn is_absent(record: &Record, field: &str) -> bool {
    matches!(record.get(field), None | Some(Value::Null))
}

/// Back-fill the financial fields a source formula failed to cache, without
/// touching values the source already provides.
///
/// Ordering matters: the cost spread and asking prices are derived first,
/// then per-tier profit from the just-derived asking prices, matching the
/// source workbook's formula dependencies.
pub fn derive_inventory_fields(record: &mut Record) {
    let trade = number(record, "jd_trade_clean");
    let retail = number(record, "jd_retail_clean");
    let cost = number(record, "unit_cost");

    if is_absent(record, "cost_diff")
        && let (Some(trade), Some(cost)) = (trade, cost)
    {
        record.insert("cost_diff".into(), json!(round2(trade - cost)));
    }
    for (tier, multiplier) in PRICE_TIERS {
        let price_field = format!("price_{tier}");
        if is_absent(record, &price_field)
            && let Some(trade) = trade
        {
            record.insert(price_field, json!(round2(trade * multiplier)));
        }
    }
    for (tier, _) in PRICE_TIERS {
        let price_field = format!("price_{tier}");
        let profit_field = format!("profit_{tier}");
        if is_absent(record, &profit_field)
            && let (Some(price), Some(cost)) = (number(record, &price_field), cost)
        {
            record.insert(profit_field, json!(round2(price - cost)));
        }
    }
    if is_absent(record, "retail_spread")
        && let (Some(retail), Some(cost)) = (retail, cost)
    {
        record.insert("retail_spread".into(), json!(round2(retail - cost)));
    }
}

/// The field that uniquely identifies a record for deduplication, cleaned
/// for comparison. `None` means the row lacks its business key and is
/// silently excluded upstream.
pub fn business_key(record: &Record, tab: TabType) -> Option<String> {
    let field = match tab {
        TabType::Inventory => "stock_number",
        TabType::Deals => "customer_name",
        TabType::Lenders => "name",
        TabType::Roster => "name",
        TabType::Unknown => return None,
    };
    let value = record.get(field)?.as_str()?.trim();
    if value.is_empty() {
        return None;
    }
    if tab == TabType::Roster {
        return clean_roster_name(value);
    }
    Some(value.to_string())
}

/// Strip a leading ordinal prefix ("12." / "3)") and require at least one
/// letter; placeholder entries ("none", "spare") are dropped outright.
pub fn clean_roster_name(raw: &str) -> Option<String> {
    let stripped = raw
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim();
    if !stripped.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    if matches!(stripped.to_lowercase().as_str(), "none" | "spare") {
        return None;
    }
    Some(stripped.to_string())
}

/// Validate a normalized record against its tab's schema. Returns the
/// failing field paths with messages; an empty result means the row passes.
pub fn validate_record(record: &Record, tab: TabType) -> Vec<String> {
    let mut failures = Vec::new();
    for spec in schema_for(tab) {
        let Some(value) = record.get(spec.name) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::String(_) if spec.kind == FieldKind::Text => {}
            Value::Bool(_) if spec.kind == FieldKind::Boolean => {}
            Value::Number(n) if matches!(spec.kind, FieldKind::Integer | FieldKind::Float) => {
                if let Some(actual) = n.as_f64() {
                    if let Some(min) = spec.min
                        && actual < min
                    {
                        failures.push(format!("{}: {actual} below minimum {min}", spec.name));
                    }
                    if let Some(max) = spec.max
                        && actual > max
                    {
                        failures.push(format!("{}: {actual} above maximum {max}", spec.name));
                    }
                }
            }
            other => failures.push(format!(
                "{}: unexpected type {}",
                spec.name,
                type_name(other)
            )),
        }
    }
    failures
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
