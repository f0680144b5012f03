//! Native parsing engine.
//!
//! Consumes a fully resolved ingestion plan — projection and dtypes keyed in
//! original column identity — and binds it to a concrete byte stream:
//! decoding the header row (or synthesizing `column_<n>` names from the first
//! record's width), mapping the projection to physical indices, assigning a
//! declared type per output column, sampling leading rows to infer types for
//! undeclared columns, and materializing typed columns batch by batch.
//!
//! The engine never sees final (renamed) column names; renaming is applied to
//! its output by the caller.

use std::{collections::VecDeque, io::Read};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use itertools::Itertools;
use log::debug;

use crate::{
    data::{ColumnType, parse_typed_value},
    frame::{Column, Frame},
    io_utils,
    plan::{self, Dtypes, Projection},
};

#[derive(Debug)]
struct ColumnBinding {
    index: usize,
    name: String,
    declared: Option<ColumnType>,
    datatype: ColumnType,
}

pub struct Engine<R: Read> {
    reader: csv::Reader<R>,
    encoding: &'static Encoding,
    bindings: Vec<ColumnBinding>,
    buffered: VecDeque<csv::ByteRecord>,
    rows_read: usize,
    header_rows: usize,
}

impl<R: Read> Engine<R> {
    /// Bind a resolved plan to `input`. Reads the header row (or the first
    /// data record, on headerless sources) and up to `infer_rows` leading
    /// records for type inference; no data row is consumed beyond that until
    /// [`Engine::next_batch`] is called.
    pub fn new(
        input: R,
        delimiter: u8,
        encoding: &'static Encoding,
        has_header: bool,
        projection: Option<&Projection>,
        dtypes: Option<&Dtypes>,
        infer_rows: usize,
    ) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader(input, delimiter, has_header);
        let mut buffered = VecDeque::new();

        let names = if has_header {
            io_utils::reader_headers(&mut reader, encoding)?
        } else {
            let mut record = csv::ByteRecord::new();
            let width = if reader.read_byte_record(&mut record)? {
                let width = record.len();
                buffered.push_back(record);
                width
            } else {
                0
            };
            (0..width).map(plan::placeholder_name).collect()
        };

        let mut bindings = bind_columns(&names, projection, dtypes)?;

        if infer_rows > 0 && bindings.iter().any(|b| b.declared.is_none()) {
            let mut record = csv::ByteRecord::new();
            while buffered.len() < infer_rows && reader.read_byte_record(&mut record)? {
                buffered.push_back(record.clone());
            }
            infer_undeclared(&mut bindings, &buffered, encoding)?;
        }

        Ok(Engine {
            reader,
            encoding,
            bindings,
            buffered,
            rows_read: 0,
            header_rows: usize::from(has_header),
        })
    }

    /// A zero-row frame carrying the output schema.
    pub fn empty_frame(&self) -> Frame {
        Frame {
            columns: self
                .bindings
                .iter()
                .map(|binding| Column {
                    name: binding.name.clone(),
                    datatype: binding.datatype.clone(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Materialize up to `rows` further records. Returns `None` once the
    /// input is exhausted.
    pub fn next_batch(&mut self, rows: usize) -> Result<Option<Frame>> {
        let mut frame = self.empty_frame();
        let mut record = csv::ByteRecord::new();
        let mut count = 0usize;
        while count < rows {
            let current = match self.buffered.pop_front() {
                Some(buffered) => buffered,
                None => {
                    if !self.reader.read_byte_record(&mut record)? {
                        break;
                    }
                    record.clone()
                }
            };
            self.rows_read += 1;
            for (binding, column) in self.bindings.iter().zip(frame.columns.iter_mut()) {
                let raw = current.get(binding.index).unwrap_or_default();
                let text = io_utils::decode_bytes(raw, self.encoding)?;
                let value = parse_typed_value(&text, &binding.datatype).with_context(|| {
                    format!(
                        "Row {}, column '{}'",
                        self.rows_read + self.header_rows,
                        binding.name
                    )
                })?;
                column.values.push(value);
            }
            count += 1;
        }
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Materialize the remaining records, up to `limit` when given.
    pub fn read_all(&mut self, limit: Option<usize>) -> Result<Frame> {
        let rows = limit.unwrap_or(usize::MAX);
        let frame = self.next_batch(rows)?;
        Ok(frame.unwrap_or_else(|| self.empty_frame()))
    }
}

/// Map the projection onto physical columns and attach declared types.
fn bind_columns(
    names: &[String],
    projection: Option<&Projection>,
    dtypes: Option<&Dtypes>,
) -> Result<Vec<ColumnBinding>> {
    let selected: Vec<(usize, String)> = match projection {
        None => names.iter().cloned().enumerate().collect(),
        Some(Projection::ByIndex(indices)) => indices
            .iter()
            .map(|&index| {
                let name = names.get(index).cloned().ok_or_else(|| {
                    anyhow!(
                        "Column index {index} is out of range: the input has {} column(s)",
                        names.len()
                    )
                })?;
                Ok((index, name))
            })
            .collect::<Result<_>>()?,
        Some(Projection::ByName(selected_names)) => selected_names
            .iter()
            .map(|name| {
                let index = names.iter().position(|n| n == name).ok_or_else(|| {
                    anyhow!(
                        "Column '{name}' not found; the input has columns [{}]",
                        names.iter().map(|n| format!("'{n}'")).join(", ")
                    )
                })?;
                Ok((index, name.clone()))
            })
            .collect::<Result<_>>()?,
    };

    if let Some(Dtypes::Keyed(map)) = dtypes {
        for key in map.keys() {
            if !names.iter().any(|name| name == key) {
                debug!("Dtype override key '{key}' matches no input column");
            }
        }
    }

    Ok(selected
        .into_iter()
        .map(|(index, name)| {
            let declared = match dtypes {
                None => None,
                Some(Dtypes::Positional(list)) => list.get(index).cloned(),
                Some(Dtypes::Keyed(map)) => map.get(&name).cloned(),
            };
            let datatype = declared.clone().unwrap_or(ColumnType::String);
            ColumnBinding {
                index,
                name,
                declared,
                datatype,
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    non_empty: usize,
    possible_integer: bool,
    possible_float: bool,
    possible_boolean: bool,
    possible_date: bool,
    possible_datetime: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_empty: 0,
            possible_integer: true,
            possible_float: true,
            possible_boolean: true,
            possible_date: true,
            possible_datetime: true,
        }
    }

    fn update(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        self.non_empty += 1;
        if self.possible_boolean
            && !matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
            )
        {
            self.possible_boolean = false;
        }
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_date && crate::data::parse_naive_date(value).is_err() {
            self.possible_date = false;
        }
        if self.possible_datetime && crate::data::parse_naive_datetime(value).is_err() {
            self.possible_datetime = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.non_empty == 0 {
            ColumnType::String
        } else if self.possible_boolean {
            ColumnType::Boolean
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else if self.possible_date {
            ColumnType::Date
        } else if self.possible_datetime {
            ColumnType::DateTime
        } else {
            ColumnType::String
        }
    }
}

fn infer_undeclared(
    bindings: &mut [ColumnBinding],
    sample: &VecDeque<csv::ByteRecord>,
    encoding: &'static Encoding,
) -> Result<()> {
    for binding in bindings.iter_mut().filter(|b| b.declared.is_none()) {
        let mut candidate = TypeCandidate::new();
        for record in sample {
            let raw = record.get(binding.index).unwrap_or_default();
            let text = io_utils::decode_bytes(raw, encoding)
                .with_context(|| format!("Decoding sample for column '{}'", binding.name))?;
            candidate.update(text.trim());
        }
        binding.datatype = candidate.decide();
        debug!(
            "Inferred {} for column '{}' from {} sample value(s)",
            binding.datatype, binding.name, candidate.non_empty
        );
    }
    Ok(())
}
