use std::{collections::BTreeMap, path::PathBuf, str::FromStr};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use crate::{
    data::ColumnType,
    plan::{ColumnSelector, Dtypes},
    reader::{DEFAULT_INFER_ROWS, ReadOptions},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Read CSV data through a reconciled ingestion plan", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read a CSV file into typed columns and write the result
    Read(ReadArgs),
    /// Preview the first rows of a CSV file via the batched reader
    Preview(PreviewArgs),
    /// Resolve and display the ingestion plan without reading any data
    Plan(PlanArgs),
}

/// Plan inputs shared by every command.
#[derive(Debug, Args)]
pub struct PlanOptions {
    /// Columns to keep: zero-based indices or column names, never mixed
    #[arg(short = 'C', long = "columns", action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Declared types, positional (`integer,float`) or keyed (`amount=float`)
    #[arg(short = 'd', long = "dtype", action = clap::ArgAction::Append)]
    pub dtypes: Vec<String>,
    /// New names for the leading output columns, applied after parsing
    #[arg(short = 'r', long = "rename", action = clap::ArgAction::Append)]
    pub rename: Vec<String>,
    /// Treat the first row as data and autogenerate column_<n> names
    #[arg(long = "no-header")]
    pub no_header: bool,
}

impl PlanOptions {
    pub fn has_header(&self) -> bool {
        !self.no_header
    }

    pub fn read_options(&self, infer_rows: usize, limit: Option<usize>) -> Result<ReadOptions> {
        Ok(ReadOptions {
            has_header: self.has_header(),
            columns: parse_column_selectors(&self.columns),
            dtypes: parse_dtype_overrides(&self.dtypes)?,
            new_columns: split_list(&self.rename),
            infer_rows,
            limit,
        })
    }
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Input CSV file to read (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub plan: PlanOptions,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Leading rows sampled to infer undeclared column types (0 disables)
    #[arg(long = "infer-rows", default_value_t = DEFAULT_INFER_ROWS)]
    pub infer_rows: usize,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
    /// Render output as an elastic table to stdout
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input CSV file to preview (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    #[command(flatten)]
    pub plan: PlanOptions,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Leading rows sampled to infer undeclared column types (0 disables)
    #[arg(long = "infer-rows", default_value_t = DEFAULT_INFER_ROWS)]
    pub infer_rows: usize,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub plan: PlanOptions,
    /// Emit the resolved plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Split repeatable, comma-separable argument values into trimmed tokens.
pub fn split_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Each token is a physical index when it parses as an integer, a column
/// name otherwise.
pub fn parse_column_selectors(raw: &[String]) -> Vec<ColumnSelector> {
    split_list(raw)
        .into_iter()
        .map(|token| match token.parse::<usize>() {
            Ok(index) => ColumnSelector::Index(index),
            Err(_) => ColumnSelector::Name(token),
        })
        .collect()
}

/// Tokens are either `TYPE` (positional) or `NAME=TYPE` (keyed); the two
/// shapes cannot be mixed.
pub fn parse_dtype_overrides(raw: &[String]) -> Result<Option<Dtypes>> {
    let mut positional = Vec::new();
    let mut keyed = BTreeMap::new();
    for token in split_list(raw) {
        if let Some((name, ty)) = token.split_once('=') {
            let name = name.trim();
            let datatype = ColumnType::from_str(ty)?;
            if keyed.insert(name.to_string(), datatype).is_some() {
                bail!("Dtype override for column '{name}' is specified more than once");
            }
        } else {
            positional.push(ColumnType::from_str(&token)?);
        }
    }
    match (positional.is_empty(), keyed.is_empty()) {
        (true, true) => Ok(None),
        (false, true) => Ok(Some(Dtypes::Positional(positional))),
        (true, false) => Ok(Some(Dtypes::Keyed(keyed))),
        (false, false) => bail!("Dtype overrides must be all positional or all keyed, not a mixture"),
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
