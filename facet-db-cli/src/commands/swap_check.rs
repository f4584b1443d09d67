//! Round-trip every eligible list of a snapshot through its swap file.

use crate::error::{CliError, CliResult};
use crate::input::load_snapshot;
use colored::Colorize;
use facet_db_core::{SelectionList, SwapContext};
use std::sync::Arc;

pub fn run(input: &str, ctx: &SwapContext) -> CliResult<()> {
    let root = Arc::new(load_snapshot(input, ctx)?);
    root.complete();
    let before = root.get_all_values()?;

    let mut lists: Vec<Arc<SelectionList>> = Vec::new();
    let mut pending = vec![Arc::clone(&root)];
    while let Some(list) = pending.pop() {
        pending.extend(list.child_lists());
        lists.push(list);
    }

    let mut swapped = 0usize;
    let mut bytes = 0u64;
    for list in &lists {
        if !list.try_swap()? {
            continue;
        }
        swapped += 1;
        if let Some(path) = list.swap_path() {
            bytes += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            tracing::debug!(list_id = list.id(), path = %path.display(), "swapped");
        }
    }

    for list in &lists {
        list.restore()?;
    }
    let after = root.get_all_values()?;

    println!(
        "lists: {}, swapped: {}, bytes: {}, values: {}",
        lists.len(),
        swapped,
        bytes,
        before.len()
    );
    if before != after {
        return Err(CliError::Mismatch(format!(
            "restored values differ from the original ({} before, {} after)",
            before.len(),
            after.len()
        )));
    }
    if swapped == 0 {
        println!(
            "{} no list holds more than {} entries",
            "note:".yellow().bold(),
            ctx.config.min_swap_entries
        );
    }
    println!("{}", "round trip ok".green());
    Ok(())
}
