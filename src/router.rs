//! Sheet-name routing into target record types.

use serde::{Deserialize, Serialize};

/// Target record type for one sheet. `Unknown` sheets are excluded from
/// import but stay visible for manual reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    Inventory,
    Roster,
    Deals,
    Lenders,
    Unknown,
}

impl TabType {
    /// Store table this tab type writes to.
    pub fn table(&self) -> Option<&'static str> {
        match self {
            TabType::Inventory => Some("vehicle_inventory"),
            TabType::Roster => Some("roster"),
            TabType::Deals => Some("deals_v2"),
            TabType::Lenders => Some("lenders"),
            TabType::Unknown => None,
        }
    }
}

impl std::fmt::Display for TabType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TabType::Inventory => "inventory",
            TabType::Roster => "roster",
            TabType::Deals => "deals",
            TabType::Lenders => "lenders",
            TabType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classify a sheet by its display name using ordered keyword containment.
///
/// Deal keywords are checked before lender, lender before roster, roster
/// before inventory: sheet names like "DEAL LOG - USED UNITS" contain terms
/// from several vocabularies and the first match must win.
pub fn route_tab(sheet_name: &str) -> TabType {
    let lowered = sheet_name.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if contains_any(&["deal", "sales log", "sold log", "gross"]) {
        TabType::Deals
    } else if contains_any(&["lender", "bank", "rate sheet", "buy rate"]) {
        TabType::Lenders
    } else if contains_any(&["roster", "staff", "team", "salesperson", "sales people"]) {
        TabType::Roster
    } else if contains_any(&["inventory", "stock", "vehicle", "unit", "lot"]) {
        TabType::Inventory
    } else {
        TabType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_name_keywords() {
        assert_eq!(route_tab("INVENTORY"), TabType::Inventory);
        assert_eq!(route_tab("Used Vehicle Stock"), TabType::Inventory);
        assert_eq!(route_tab("DEAL LOG"), TabType::Deals);
        assert_eq!(route_tab("Roster & Tables"), TabType::Roster);
        assert_eq!(route_tab("Lender Rates"), TabType::Lenders);
        assert_eq!(route_tab("MAIL TRACKING"), TabType::Unknown);
    }

    #[test]
    fn deal_keywords_win_over_later_vocabularies() {
        // Contains "unit" (inventory) and "deal" (deals); deal is checked first.
        assert_eq!(route_tab("Unit Deal Log"), TabType::Deals);
        // Contains "stock" and "lender"; lender is checked first.
        assert_eq!(route_tab("Lender Stock Sheet"), TabType::Lenders);
    }

    #[test]
    fn unknown_sheets_have_no_target_table() {
        assert_eq!(TabType::Unknown.table(), None);
        assert_eq!(TabType::Inventory.table(), Some("vehicle_inventory"));
    }
}
