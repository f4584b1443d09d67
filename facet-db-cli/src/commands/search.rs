use crate::error::CliResult;
use crate::input::load_snapshot;
use facet_db_core::SwapContext;

pub fn run(input: &str, query: Option<&str>, invert_selected: bool, ctx: &SwapContext) -> CliResult<()> {
    let list = load_snapshot(input, ctx)?;
    let found = list.find_all(query, invert_selected)?;
    tracing::info!(query = ?query, matches = found.len(), "searched snapshot");
    println!("{}", found.to_verbose_json(None)?);
    Ok(())
}
