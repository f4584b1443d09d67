pub mod page;
pub mod search;
pub mod sort;
pub mod swap_check;

use crate::error::CliResult;
use facet_db_core::{SelectionCacheConfig, SwapContext};
use std::path::Path;

/// Build the swap context: config file (if any), then env overrides.
pub fn load_context(config_path: Option<&Path>) -> CliResult<SwapContext> {
    let config = match config_path {
        Some(path) => SelectionCacheConfig::load(path)?,
        None => SelectionCacheConfig::default(),
    }
    .apply_env();
    tracing::debug!(swap_dir = %config.swap_dir().display(), "loaded selection cache config");
    Ok(SwapContext::with_config(config))
}
