//! Public read call sites.
//!
//! Both entry points — the one-shot [`read_frame`] family and the
//! incremental [`BatchedReader`] — resolve the ingestion plan through the
//! same shared routine in [`crate::plan`] before any byte of the source is
//! read, then dispatch to the engine and apply renaming to every frame they
//! hand back.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    engine::Engine,
    frame::Frame,
    io_utils,
    plan::{ColumnSelector, Dtypes, IngestionPlan},
};

/// Leading rows sampled for type inference when the caller does not say.
pub const DEFAULT_INFER_ROWS: usize = 100;

#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Whether the first row is a header. When `false`, column names are
    /// autogenerated as `column_<n>`, 1-based.
    pub has_header: bool,
    /// Columns to keep, all indices or all names. Empty keeps everything.
    pub columns: Vec<ColumnSelector>,
    /// Declared types, positional or keyed by column identity.
    pub dtypes: Option<Dtypes>,
    /// Final names for the leading output columns, applied after parsing.
    pub new_columns: Vec<String>,
    /// Leading rows sampled to infer undeclared column types; 0 disables
    /// inference and reads undeclared columns as text.
    pub infer_rows: usize,
    /// Stop after this many materialized rows.
    pub limit: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            columns: Vec::new(),
            dtypes: None,
            new_columns: Vec::new(),
            infer_rows: DEFAULT_INFER_ROWS,
            limit: None,
        }
    }
}

impl ReadOptions {
    fn resolve_plan(&self) -> Result<IngestionPlan> {
        let plan = IngestionPlan::resolve(
            &self.columns,
            self.dtypes.clone(),
            &self.new_columns,
            self.has_header,
        )?;
        debug!("Resolved ingestion plan: {plan:?}");
        Ok(plan)
    }
}

fn read_with_plan<R: Read>(
    input: R,
    delimiter: u8,
    encoding: &'static Encoding,
    options: &ReadOptions,
    plan: &IngestionPlan,
) -> Result<Frame> {
    let mut engine = Engine::new(
        input,
        delimiter,
        encoding,
        options.has_header,
        plan.projection.as_ref(),
        plan.dtypes.as_ref(),
        options.infer_rows,
    )?;
    let mut frame = engine.read_all(options.limit)?;
    frame.apply_new_names(&plan.new_columns);
    Ok(frame)
}

/// One-shot read of an entire source into a [`Frame`].
pub fn read_frame<R: Read>(
    input: R,
    delimiter: u8,
    encoding: &'static Encoding,
    options: &ReadOptions,
) -> Result<Frame> {
    let plan = options.resolve_plan()?;
    read_with_plan(input, delimiter, encoding, options, &plan)
}

/// One-shot read from a path, `-` meaning stdin. The plan is resolved
/// before the path is opened, so configuration errors never touch the
/// filesystem.
pub fn read_frame_from_path(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    options: &ReadOptions,
) -> Result<Frame> {
    let plan = options.resolve_plan()?;
    let input = io_utils::open_input(path)?;
    read_with_plan(input, delimiter, encoding, options, &plan)
        .with_context(|| format!("Reading {path:?}"))
}

/// Incremental reader: the plan is resolved and bound at construction,
/// before any data row is parsed; each batch arrives renamed.
pub struct BatchedReader {
    engine: Engine<Box<dyn Read>>,
    new_columns: Vec<String>,
}

impl BatchedReader {
    pub fn from_path(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
        options: &ReadOptions,
    ) -> Result<Self> {
        let plan = options.resolve_plan()?;
        let input = io_utils::open_input(path)?;
        let engine = Engine::new(
            input,
            delimiter,
            encoding,
            options.has_header,
            plan.projection.as_ref(),
            plan.dtypes.as_ref(),
            options.infer_rows,
        )
        .with_context(|| format!("Reading {path:?}"))?;
        Ok(BatchedReader {
            engine,
            new_columns: plan.new_columns,
        })
    }

    /// The next `rows` records as a frame, or `None` at end of input.
    pub fn next_batch(&mut self, rows: usize) -> Result<Option<Frame>> {
        let Some(mut frame) = self.engine.next_batch(rows)? else {
            return Ok(None);
        };
        frame.apply_new_names(&self.new_columns);
        Ok(Some(frame))
    }

    /// A zero-row frame carrying the output schema, renames applied.
    pub fn empty_frame(&self) -> Frame {
        let mut frame = self.engine.empty_frame();
        frame.apply_new_names(&self.new_columns);
        frame
    }
}
