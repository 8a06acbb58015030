//! The import plan: the reviewable artifact between column mapping and
//! import execution.
//!
//! `probe` writes one of these as YAML; a human adjusts tab routing or
//! column targets; `import` loads it back and treats it as frozen.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classify::classify_placeholder_columns,
    mapper::ColumnMap,
    position::infer_positional_columns,
    router::{TabType, route_tab},
    workbook::ParsedWorkbook,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPlan {
    pub sheet: String,
    pub tab: TabType,
    pub columns: ColumnMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPlan {
    pub source: String,
    pub sheets: Vec<SheetPlan>,
}

/// Run classification and positional inference over every sheet, in place.
/// Both `probe` and `import` call this so a re-parsed workbook carries the
/// same inferred headers the plan was built against.
pub fn prepare(workbook: &mut ParsedWorkbook) {
    for sheet in &mut workbook.sheets {
        classify_placeholder_columns(sheet);
        infer_positional_columns(sheet);
    }
}

impl ImportPlan {
    /// Build the automatic plan for a prepared workbook.
    pub fn build(workbook: &ParsedWorkbook) -> Self {
        let sheets = workbook
            .sheets
            .iter()
            .map(|sheet| {
                let tab = route_tab(&sheet.name);
                SheetPlan {
                    sheet: sheet.name.clone(),
                    tab,
                    columns: ColumnMap::build(&sheet.headers, tab),
                }
            })
            .collect();
        ImportPlan {
            source: workbook.filename.clone(),
            sheets,
        }
    }

    pub fn for_sheet(&self, name: &str) -> Option<&SheetPlan> {
        self.sheets.iter().find(|plan| plan.sheet == name)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating plan file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing plan YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening plan file {path:?}"))?;
        let reader = BufReader::new(file);
        let plan = serde_yaml::from_reader(reader).context("Parsing plan YAML")?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::parse_bytes;
    use tempfile::NamedTempFile;

    #[test]
    fn plan_round_trips_through_yaml() {
        let data = b"Stock #,Year,Notes\nA-1,2019,clean\n";
        let mut workbook = parse_bytes(data, "inventory.csv").unwrap();
        prepare(&mut workbook);
        let plan = ImportPlan::build(&workbook);
        assert_eq!(plan.sheets.len(), 1);
        assert_eq!(plan.sheets[0].tab, TabType::Inventory);
        assert_eq!(plan.sheets[0].columns.target("Stock #"), Some("stock_number"));
        assert_eq!(plan.sheets[0].columns.target("Notes"), None);

        let file = NamedTempFile::new().unwrap();
        plan.save(file.path()).unwrap();
        let loaded = ImportPlan::load(file.path()).unwrap();
        assert_eq!(loaded.sheets[0].columns, plan.sheets[0].columns);
        assert_eq!(loaded.source, "inventory.csv");
    }

    #[test]
    fn prepare_names_placeholder_columns_before_mapping() {
        let data =
            b"1998,ford,\"$12,500.00\"\n2004,honda,\"$9,800.00\"\n2023,toyota,\"$41,000.00\"\n";
        // Headerless dump: three placeholder columns.
        let mut workbook = parse_bytes(data, "INVENTORY.csv").unwrap();
        prepare(&mut workbook);
        let headers = &workbook.primary().headers;
        assert!(headers.contains(&"Year".to_string()));
        assert!(headers.contains(&"Make".to_string()));
    }
}
