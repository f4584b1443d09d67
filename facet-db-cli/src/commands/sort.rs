use crate::error::CliResult;
use crate::input::load_snapshot;
use facet_db_core::{SortKind, SwapContext};

pub fn run(input: &str, kind: SortKind, ctx: &SwapContext) -> CliResult<()> {
    let list = load_snapshot(input, ctx)?;
    list.sort(kind)?;
    tracing::info!(kind = %kind, entries = list.len(), "sorted snapshot");
    println!("{}", list.to_verbose_json(None)?);
    Ok(())
}
