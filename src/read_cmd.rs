//! The `read` command: full ingestion to CSV output or a terminal table.

use anyhow::{Result, anyhow};
use log::info;

use crate::{cli::ReadArgs, io_utils, reader, table};

pub fn execute(args: &ReadArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let writing_to_stdout = args.output.as_deref().is_none_or(io_utils::is_dash);
    if args.table && !writing_to_stdout {
        return Err(anyhow!("--table cannot be combined with --output"));
    }

    let options = args.plan.read_options(args.infer_rows, args.limit)?;
    info!(
        "Reading '{}' (delimiter '{}')",
        args.input.display(),
        crate::printable_delimiter(delimiter)
    );
    let frame = reader::read_frame_from_path(&args.input, delimiter, encoding, &options)?;

    if args.table {
        table::print_table(&frame.names(), &frame.rows());
    } else {
        let output_delimiter = io_utils::resolve_output_delimiter(
            args.output.as_deref(),
            args.output_delimiter,
            delimiter,
        );
        let mut writer = io_utils::open_csv_writer(args.output.as_deref(), output_delimiter)?;
        frame.write_csv(&mut writer)?;
        writer.flush()?;
    }

    info!(
        "Materialized {} row(s) across {} column(s)",
        frame.height(),
        frame.width()
    );
    Ok(())
}
