//! The `preview` command: first rows of a source through the batched
//! reader.

use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, io_utils, reader::BatchedReader, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let options = args.plan.read_options(args.infer_rows, None)?;

    let mut batches = BatchedReader::from_path(&args.input, delimiter, encoding, &options)?;
    let frame = batches
        .next_batch(args.rows)?
        .unwrap_or_else(|| batches.empty_frame());

    table::print_table(&frame.names(), &frame.rows());
    info!("Displayed {} row(s) from {:?}", frame.height(), args.input);
    Ok(())
}
