use crate::error::{CliError, CliResult};
use facet_db_core::{SelectionList, SwapContext};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

/// Where the snapshot comes from.
pub enum InputSource {
    /// From a file on disk.
    File(PathBuf),
    /// From stdin (piped).
    Stdin,
}

/// `-` means stdin; anything else is a file path.
pub fn resolve_input(arg: &str) -> CliResult<InputSource> {
    if arg != "-" {
        return Ok(InputSource::File(PathBuf::from(arg)));
    }
    if !io::stdin().is_terminal() {
        return Ok(InputSource::Stdin);
    }
    Err(CliError::Usage(format!(
        "no input provided\n  {} pass --input <file> or pipe a snapshot via stdin",
        colored::Colorize::bold(colored::Colorize::cyan("help:"))
    )))
}

/// Read content from the resolved input source.
pub fn read_input(source: &InputSource) -> CliResult<String> {
    match source {
        InputSource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("failed to read {}: {e}", path.display()))),
        InputSource::Stdin => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Resolve, read, and parse a verbose snapshot.
pub fn load_snapshot(arg: &str, ctx: &SwapContext) -> CliResult<SelectionList> {
    let source = resolve_input(arg)?;
    let text = read_input(&source)?;
    if text.trim().is_empty() {
        return Err(CliError::Input("empty snapshot".to_string()));
    }
    Ok(SelectionList::from_verbose_json(&text, ctx)?)
}
