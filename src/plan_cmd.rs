//! The `plan` command.
//!
//! Resolves the ingestion plan from the supplied options and renders it,
//! without opening any input. Useful for checking how a projection, dtype
//! override, and rename list will be reconciled before running a read.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::{self, PlanArgs},
    plan::{Dtypes, IngestionPlan, Projection},
    table,
};

pub fn execute(args: &PlanArgs) -> Result<()> {
    let selectors = cli::parse_column_selectors(&args.plan.columns);
    let dtypes = cli::parse_dtype_overrides(&args.plan.dtypes)?;
    let new_columns = cli::split_list(&args.plan.rename);
    let plan =
        IngestionPlan::resolve(&selectors, dtypes, &new_columns, args.plan.has_header())?;

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&plan).context("Serializing ingestion plan")?;
        println!("{rendered}");
        return Ok(());
    }

    render(&plan);
    info!("Plan resolved without reading any input");
    Ok(())
}

fn render(plan: &IngestionPlan) {
    match &plan.projection {
        None => println!("projection: all columns"),
        Some(Projection::ByIndex(indices)) => {
            println!("projection: indices [{}]", indices.iter().join(", "));
        }
        Some(Projection::ByName(names)) => {
            println!(
                "projection: names [{}]",
                names.iter().map(|n| format!("'{n}'")).join(", ")
            );
        }
    }

    match &plan.dtypes {
        None => println!("dtypes: inferred by the engine"),
        Some(Dtypes::Positional(list)) => {
            println!("dtypes: positional, covering the leading {} column(s)", list.len());
            let headers = vec!["position".to_string(), "datatype".to_string()];
            let rows = list
                .iter()
                .enumerate()
                .map(|(idx, ty)| vec![idx.to_string(), ty.to_string()])
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
        }
        Some(Dtypes::Keyed(map)) => {
            println!("dtypes: keyed by original column");
            let headers = vec!["column".to_string(), "datatype".to_string()];
            let rows = map
                .iter()
                .map(|(name, ty)| vec![name.clone(), ty.to_string()])
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
        }
    }

    if plan.new_columns.is_empty() {
        println!("rename: none");
    } else {
        println!(
            "rename: [{}]",
            plan.new_columns.iter().map(|n| format!("'{n}'")).join(", ")
        );
    }
}
