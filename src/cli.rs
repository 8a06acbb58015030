use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::import::ImportMode;

#[derive(Debug, Parser)]
#[command(author, version, about = "Ingest legacy sale-event spreadsheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse an upload, infer headers and columns, and write a reviewable
    /// import plan
    Probe(ProbeArgs),
    /// Execute a reviewed import plan against a record store
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Uploaded workbook or delimited file (xlsx, xls, csv, tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination import plan (.yaml) for human review
    #[arg(short, long)]
    pub plan: PathBuf,
    /// Character encoding for delimited inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Uploaded workbook or delimited file (xlsx, xls, csv, tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Reviewed import plan produced by `probe`
    #[arg(short, long)]
    pub plan: PathBuf,
    /// JSON record-store file (created if missing)
    #[arg(short, long)]
    pub store: PathBuf,
    /// Sale event id scoping every read and write
    #[arg(short, long)]
    pub event: Uuid,
    /// Import strategy for existing scoped records
    #[arg(short, long, value_enum, default_value = "append")]
    pub mode: ModeArg,
    /// Restrict the import to these sheet names (repeatable)
    #[arg(long = "sheet", action = clap::ArgAction::Append)]
    pub sheets: Vec<String>,
    /// Character encoding for delimited inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ModeArg {
    Append,
    Replace,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Append => ImportMode::Append,
            ModeArg::Replace => ImportMode::Replace,
        }
    }
}
