pub mod cell;
pub mod classify;
pub mod cli;
pub mod dedup;
pub mod error;
pub mod headers;
pub mod import;
pub mod mapper;
pub mod normalize;
pub mod plan;
pub mod position;
pub mod router;
pub mod store;
pub mod workbook;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use encoding_rs::{Encoding, UTF_8};
use log::{LevelFilter, info, warn};
use serde::Serialize;

use crate::cli::{Cli, Commands, ImportArgs, ProbeArgs};
use crate::import::ImportResult;
use crate::plan::ImportPlan;
use crate::router::TabType;
use crate::store::{JsonFileStore, Scope};
use crate::workbook::{ParsedWorkbook, parse_bytes_with_encoding};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("lot_intake", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Import(args) => handle_import(&args),
    }
}

fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

fn load_workbook(path: &Path, encoding_label: Option<&str>) -> Result<ParsedWorkbook> {
    let bytes = fs::read(path).with_context(|| format!("Reading upload {path:?}"))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let encoding = resolve_encoding(encoding_label)?;
    let mut workbook = parse_bytes_with_encoding(&bytes, filename, encoding)
        .with_context(|| format!("Parsing upload {path:?}"))?;
    plan::prepare(&mut workbook);
    Ok(workbook)
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    info!("Probing '{}'", args.input.display());
    let workbook = load_workbook(&args.input, args.input_encoding.as_deref())?;
    let plan = ImportPlan::build(&workbook);
    for sheet in &plan.sheets {
        let mapped = sheet
            .columns
            .entries
            .values()
            .filter(|target| target.is_some())
            .count();
        info!(
            "Sheet '{}' routed to {} with {} of {} column(s) mapped",
            sheet.sheet,
            sheet.tab,
            mapped,
            sheet.columns.entries.len()
        );
        let skipped = sheet.columns.skipped();
        if !skipped.is_empty() {
            info!(
                "Sheet '{}' skipping column(s): {}",
                sheet.sheet,
                skipped.join(", ")
            );
        }
    }
    plan.save(&args.plan)
        .with_context(|| format!("Writing plan to {:?}", args.plan))?;
    info!(
        "Plan for {} sheet(s) written to {:?}; review before importing",
        plan.sheets.len(),
        args.plan
    );
    Ok(())
}

/// Per-sheet outcome in the JSON report `import` prints to stdout. A sheet
/// carries either a result or a fatal error, never both.
#[derive(Debug, Serialize)]
struct SheetOutcome {
    sheet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn handle_import(args: &ImportArgs) -> Result<()> {
    info!(
        "Importing '{}' into store {:?} for event {}",
        args.input.display(),
        args.store,
        args.event
    );
    let workbook = load_workbook(&args.input, args.input_encoding.as_deref())?;
    let plan = ImportPlan::load(&args.plan)
        .with_context(|| format!("Loading plan from {:?}", args.plan))?;
    let mut store = JsonFileStore::open(&args.store)
        .with_context(|| format!("Opening record store {:?}", args.store))?;
    let scope = Scope {
        event_id: args.event,
    };

    let mut outcomes: Vec<SheetOutcome> = Vec::new();
    for sheet in &workbook.sheets {
        if !args.sheets.is_empty() && !args.sheets.iter().any(|name| name == &sheet.name) {
            continue;
        }
        let Some(sheet_plan) = plan.for_sheet(&sheet.name) else {
            warn!("Sheet '{}' has no plan entry; skipping", sheet.name);
            continue;
        };
        if sheet_plan.tab == TabType::Unknown {
            warn!("Sheet '{}' is not routed to a tab; skipping", sheet.name);
            continue;
        }
        match import::execute(
            &mut store,
            &scope,
            sheet,
            &sheet_plan.columns,
            sheet_plan.tab,
            args.mode.into(),
        ) {
            Ok(result) => {
                info!(
                    "Sheet '{}': imported {} row(s), {} error(s), {} duplicate(s) skipped",
                    sheet.name, result.imported, result.errors, result.duplicates_skipped
                );
                outcomes.push(SheetOutcome {
                    sheet: sheet.name.clone(),
                    result: Some(result),
                    error: None,
                });
            }
            Err(err) => {
                warn!("Sheet '{}' failed: {err}", sheet.name);
                outcomes.push(SheetOutcome {
                    sheet: sheet.name.clone(),
                    result: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    if outcomes.is_empty() {
        return Err(anyhow!("No sheets matched the plan; nothing imported"));
    }
    let report = serde_json::to_string_pretty(&outcomes).context("Serializing import report")?;
    println!("{report}");
    if outcomes.iter().all(|outcome| outcome.error.is_some()) {
        return Err(anyhow!("Every sheet failed to import"));
    }
    Ok(())
}
