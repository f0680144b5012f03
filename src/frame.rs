//! Materialized parse output: typed columns under their output names.

use std::io::Write;

use anyhow::{Context, Result};
use log::debug;

use crate::data::{ColumnType, Value};

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
    pub values: Vec<Option<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub columns: Vec<Column>,
}

impl Frame {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |column| column.values.len())
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// The post-parse rename pass: overwrite the first `new_columns.len()`
    /// output names in order. Positions beyond the list keep their
    /// parser-assigned name; entries beyond the frame width are ignored.
    pub fn apply_new_names(&mut self, new_columns: &[String]) {
        if new_columns.len() > self.columns.len() {
            debug!(
                "{} new column name(s) exceed the output width of {}",
                new_columns.len(),
                self.columns.len()
            );
        }
        for (column, name) in self.columns.iter_mut().zip(new_columns) {
            column.name = name.clone();
        }
    }

    /// Rows rendered as display strings, for table output.
    pub fn rows(&self) -> Vec<Vec<String>> {
        (0..self.height())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        column.values[row]
                            .as_ref()
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        writer
            .write_record(self.names())
            .context("Writing output header")?;
        for row in 0..self.height() {
            let record = self.columns.iter().map(|column| {
                column.values[row]
                    .as_ref()
                    .map(Value::as_display)
                    .unwrap_or_default()
            });
            writer
                .write_record(record)
                .with_context(|| format!("Writing output row {}", row + 1))?;
        }
        Ok(())
    }
}
