use crate::error::{CliError, CliResult};
use crate::input::load_snapshot;
use facet_db_core::{PageRequest, SwapContext};

pub fn run(
    input: &str,
    start: usize,
    count: usize,
    max: Option<usize>,
    show_others: bool,
    ctx: &SwapContext,
) -> CliResult<()> {
    if show_others && max.is_none() {
        return Err(CliError::Usage("--show-others requires --max".to_string()));
    }
    let list = load_snapshot(input, ctx)?;

    let mut request = PageRequest::new(start, count).with_show_others(show_others);
    if let Some(max) = max {
        request = request.with_max(max);
    }
    let page = list.to_paged(&request)?;
    tracing::info!(
        emitted = page.entries.len(),
        skipped = page.skipped,
        total = page.total,
        "paged snapshot"
    );
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
