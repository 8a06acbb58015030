//! Source-header → target-field mapping, one vocabulary per tab type.
//!
//! Matching is two-tier: an exact table keyed by the normalized header
//! (lowercased, non-alphanumerics stripped), then fuzzy substring rules on
//! the lowercase original. Unmatched headers map to skip, never to a
//! guessed field; the surrounding review step surfaces them to a human.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::router::TabType;

/// Frozen header-to-field mapping for one sheet. `None` means skip.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMap {
    pub entries: BTreeMap<String, Option<String>>,
}

impl ColumnMap {
    /// Build the automatic mapping for a sheet's headers. The result is the
    /// starting point for human review, not the final word.
    pub fn build(headers: &[String], tab: TabType) -> Self {
        let entries = headers
            .iter()
            .map(|header| {
                (
                    header.clone(),
                    map_header(header, tab).map(|f| f.to_string()),
                )
            })
            .collect();
        ColumnMap { entries }
    }

    pub fn target(&self, header: &str) -> Option<&str> {
        self.entries.get(header).and_then(|t| t.as_deref())
    }

    /// Headers the mapper could not place, for review surfacing.
    pub fn skipped(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, target)| target.is_none())
            .map(|(header, _)| header.as_str())
            .collect()
    }
}

/// Normalized form used by the exact-match tier.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Map one source header to a target field for the given tab type, or
/// `None` for skip. There is no cross-type fallback.
pub fn map_header(header: &str, tab: TabType) -> Option<&'static str> {
    let exact = normalize_header(header);
    let lowered = header.to_lowercase();
    match tab {
        TabType::Inventory => {
            inventory_exact(&exact).or_else(|| inventory_fuzzy(&lowered))
        }
        TabType::Roster => roster_exact(&exact).or_else(|| roster_fuzzy(&lowered)),
        TabType::Deals => deals_exact(&exact).or_else(|| deals_fuzzy(&lowered)),
        TabType::Lenders => lenders_exact(&exact).or_else(|| lenders_fuzzy(&lowered)),
        TabType::Unknown => None,
    }
}

fn inventory_exact(key: &str) -> Option<&'static str> {
    let field = match key {
        "hat" | "hatnumber" | "hatno" => "hat_number",
        "status" | "statuslabel" => "status_label",
        "sold" | "soldstatus" => "sold_status",
        "stock" | "stocknumber" | "stockno" | "stocknum" => "stock_number",
        "year" | "yr" => "year",
        "make" => "make",
        "model" => "model",
        "class" | "body" | "bodystyle" => "class",
        "color" | "colour" | "extcolor" => "color",
        "odometer" | "odo" | "miles" | "mileage" => "odometer",
        "vin" | "vinnumber" => "vin",
        "seriestrim" | "series" | "trim" => "series_trim",
        "agedays" | "age" | "days" => "age_days",
        "drivetrain" | "drive" => "drivetrain",
        "jdtradeclean" | "cleantrade" | "tradeclean" | "jdtrade" => "jd_trade_clean",
        "jdretailclean" | "cleanretail" | "retailclean" | "jdretail" => "jd_retail_clean",
        "unitcost" | "cost" | "acquisitioncost" | "acv" => "unit_cost",
        "costdiff" | "costvstrade" => "cost_diff",
        "retailspread" => "retail_spread",
        "price115" | "asking115" | "askingprice" => "price_115",
        "price120" | "asking120" => "price_120",
        "price125" | "asking125" => "price_125",
        "price130" | "asking130" => "price_130",
        "profit115" => "profit_115",
        "profit120" => "profit_120",
        "profit125" => "profit_125",
        "profit130" => "profit_130",
        _ => return None,
    };
    Some(field)
}

fn inventory_fuzzy(header: &str) -> Option<&'static str> {
    let has = |needle: &str| header.contains(needle);
    // Tier labels first: "115% price" and "profit @ 115" both carry the
    // percentage but only one carries "profit".
    for (needle, price, profit) in [
        ("115", "price_115", "profit_115"),
        ("120", "price_120", "profit_120"),
        ("125", "price_125", "profit_125"),
        ("130", "price_130", "profit_130"),
    ] {
        if has(needle) {
            return Some(if has("profit") { profit } else { price });
        }
    }
    if has("stock") && (has("#") || has("no") || has("num")) {
        return Some("stock_number");
    }
    if has("vin") {
        return Some("vin");
    }
    if has("diff") || has("spread") {
        return Some("cost_diff");
    }
    if has("trade") {
        return Some("jd_trade_clean");
    }
    if has("retail") {
        return Some("jd_retail_clean");
    }
    if has("cost") {
        return Some("unit_cost");
    }
    if has("odom") || has("mile") {
        return Some("odometer");
    }
    if has("age") || has("days") {
        return Some("age_days");
    }
    if has("trim") || has("series") {
        return Some("series_trim");
    }
    if has("color") {
        return Some("color");
    }
    if has("hat") {
        return Some("hat_number");
    }
    None
}

fn roster_exact(key: &str) -> Option<&'static str> {
    let field = match key {
        "name" | "salesperson" | "rep" | "repname" => "name",
        "phone" | "phonenumber" | "cell" | "cellphone" => "phone",
        "role" | "position" | "title" => "role",
        "confirmed" => "confirmed",
        "no" | "num" | "number" | "rownumber" => "row_number",
        _ => return None,
    };
    Some(field)
}

fn roster_fuzzy(header: &str) -> Option<&'static str> {
    let has = |needle: &str| header.contains(needle);
    if has("name") || has("salesperson") || has("rep") {
        return Some("name");
    }
    if has("phone") || has("cell") {
        return Some("phone");
    }
    if has("role") || has("position") {
        return Some("role");
    }
    if header.trim() == "#" {
        return Some("row_number");
    }
    None
}

fn deals_exact(key: &str) -> Option<&'static str> {
    let field = match key {
        "dealnumber" | "deal" | "dealno" | "dealnum" => "deal_number",
        "store" | "dealership" => "store",
        "stock" | "stocknumber" | "stockno" | "stocknum" => "stock_number",
        "customername" | "customer" | "buyer" | "name" => "customer_name",
        "zipcode" | "zip" => "zip_code",
        "newused" | "nu" => "new_used",
        "purchaseyear" | "year" => "purchase_year",
        "purchasemake" | "make" => "purchase_make",
        "purchasemodel" | "model" => "purchase_model",
        "vehiclecost" | "cost" => "vehicle_cost",
        "vehicleage" | "age" => "vehicle_age",
        "tradeyear" => "trade_year",
        "trademake" => "trade_make",
        "trademodel" => "trade_model",
        "salesperson" | "sp" => "salesperson",
        "secondsalesperson" | "2ndsalesperson" | "sp2" | "secondsp" => "second_salesperson",
        "frontgross" | "front" => "front_gross",
        "lender" | "bank" => "lender",
        "rate" | "apr" => "rate",
        "reserve" => "reserve",
        "warranty" | "vsc" => "warranty",
        "aft1" | "aftermarket" => "aft1",
        "gap" => "gap",
        "fitotal" | "fi" => "fi_total",
        "totalgross" | "total" => "total_gross",
        _ => return None,
    };
    Some(field)
}

fn deals_fuzzy(header: &str) -> Option<&'static str> {
    let has = |needle: &str| header.contains(needle);
    if has("stock") && (has("#") || has("no") || has("num")) {
        return Some("stock_number");
    }
    if has("customer") || has("buyer") {
        return Some("customer_name");
    }
    if has("deal") && (has("#") || has("no") || has("num")) {
        return Some("deal_number");
    }
    if has("trade") && has("year") {
        return Some("trade_year");
    }
    if has("trade") && has("make") {
        return Some("trade_make");
    }
    if has("trade") && has("model") {
        return Some("trade_model");
    }
    if (has("second") || has("2nd")) && has("sales") {
        return Some("second_salesperson");
    }
    if has("sales") {
        return Some("salesperson");
    }
    if has("front") {
        return Some("front_gross");
    }
    if has("total") && has("gross") {
        return Some("total_gross");
    }
    if has("zip") {
        return Some("zip_code");
    }
    None
}

fn lenders_exact(key: &str) -> Option<&'static str> {
    let field = match key {
        "name" | "lender" | "lendername" | "bank" => "name",
        "buyratepct" | "buyrate" | "rate" | "pct" => "buy_rate_pct",
        _ => return None,
    };
    Some(field)
}

fn lenders_fuzzy(header: &str) -> Option<&'static str> {
    let has = |needle: &str| header.contains(needle);
    if has("lender") || has("bank") || has("name") {
        return Some("name");
    }
    if has("rate") || has("pct") || has("%") {
        return Some("buy_rate_pct");
    }
    None
}
