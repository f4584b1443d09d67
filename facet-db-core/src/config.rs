//! Selection cache configuration
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`FACET_SWAP_DIR`, `FACET_SWAP_ZSTD`,
//!    `FACET_SWAP_ZSTD_LEVEL`) via [`SelectionCacheConfig::apply_env`]
//! 2. Config file `[selection_cache]` table via [`SelectionCacheConfig::load`]
//! 3. Hardcoded defaults

use crate::error::{Result, SelectionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default minimum size: lists with at most this many entries never swap.
pub const DEFAULT_MIN_SWAP_ENTRIES: usize = 50;

/// Default grace period after the last access before a list may be evicted.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 5_000;

/// Default number of entries inspected when detecting range-token values.
pub const DEFAULT_RANGE_LOOKAHEAD: usize = 10;

/// Fixed suffix of every swap file.
pub const SWAP_FILE_SUFFIX: &str = ".fswp";

/// Configuration for selection lists and their swap cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCacheConfig {
    /// Directory holding swap files.
    ///
    /// If `None`, defaults to `{system_temp_dir}/facet-swap`.
    pub swap_dir: Option<PathBuf>,

    /// File name prefix of swap files (`{prefix}{list_id}.fswp`).
    pub swap_prefix: String,

    /// A completed list is a swap candidate only when it holds more entries
    /// than this.
    /// Default: 50
    pub min_swap_entries: usize,

    /// Milliseconds after the last access during which the swap priority is 0.
    /// Default: 5000
    pub grace_period_ms: u64,

    /// Priority per idle second once the grace period has passed.
    /// Default: 1.0
    pub priority_scale: f64,

    /// Compress the swap record stream with zstd.
    /// Default: true
    pub compress_swap: bool,

    /// zstd level for swap files.
    /// Default: 1
    pub zstd_level: i32,

    /// Consecutive failed restores before a list is marked unavailable.
    /// Default: 3
    pub max_restore_attempts: u32,

    /// Entries scanned to decide whether string values are range tokens.
    /// Default: 10
    pub range_lookahead: usize,
}

impl Default for SelectionCacheConfig {
    fn default() -> Self {
        Self {
            swap_dir: None,
            swap_prefix: "facet-".to_string(),
            min_swap_entries: DEFAULT_MIN_SWAP_ENTRIES,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            priority_scale: 1.0,
            compress_swap: true,
            zstd_level: 1,
            max_restore_attempts: 3,
            range_lookahead: DEFAULT_RANGE_LOOKAHEAD,
        }
    }
}

/// Top-level config file structure; only `[selection_cache]` is read.
#[derive(Debug, Default, Deserialize)]
struct FacetFileConfig {
    #[serde(default)]
    selection_cache: Option<SelectionCacheConfig>,
}

impl SelectionCacheConfig {
    /// Load from a TOML file. Missing keys keep their defaults; an empty file
    /// yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SelectionError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| SelectionError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse the `[selection_cache]` table out of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: FacetFileConfig =
            toml::from_str(content).map_err(|e| SelectionError::config(e.to_string()))?;
        Ok(file.selection_cache.unwrap_or_default())
    }

    /// Overlay environment variable overrides.
    ///
    /// - `FACET_SWAP_DIR=<path>`
    /// - `FACET_SWAP_ZSTD=0` / `false` (disable compression)
    /// - `FACET_SWAP_ZSTD_LEVEL=<int>`
    pub fn apply_env(mut self) -> Self {
        if let Some(dir) = std::env::var_os("FACET_SWAP_DIR") {
            self.swap_dir = Some(PathBuf::from(dir));
        }
        if let Ok(v) = std::env::var("FACET_SWAP_ZSTD") {
            self.compress_swap = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        if let Some(level) = std::env::var("FACET_SWAP_ZSTD_LEVEL")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
        {
            self.zstd_level = level;
        }
        self
    }

    /// Effective swap directory.
    pub fn swap_dir(&self) -> PathBuf {
        self.swap_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("facet-swap"))
    }

    /// Swap file path for a list id.
    pub fn swap_path(&self, list_id: u64) -> PathBuf {
        self.swap_dir()
            .join(format!("{}{}{}", self.swap_prefix, list_id, SWAP_FILE_SUFFIX))
    }

    /// Builder method to set the swap directory
    pub fn with_swap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.swap_dir = Some(dir.into());
        self
    }

    /// Builder method to set the minimum swappable size
    pub fn with_min_swap_entries(mut self, n: usize) -> Self {
        self.min_swap_entries = n;
        self
    }

    /// Builder method to set the grace period
    pub fn with_grace_period_ms(mut self, ms: u64) -> Self {
        self.grace_period_ms = ms;
        self
    }

    /// Builder method to enable/disable zstd compression of swap files
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_swap = enabled;
        self
    }

    /// Builder method to set the restore attempt limit
    pub fn with_max_restore_attempts(mut self, attempts: u32) -> Self {
        self.max_restore_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SelectionCacheConfig::default();
        assert_eq!(config.min_swap_entries, 50);
        assert_eq!(config.grace_period_ms, 5_000);
        assert_eq!(config.range_lookahead, 10);
        assert!(config.compress_swap);
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[selection_cache]
swap_dir = "/var/tmp/facets"
grace_period_ms = 1000
compress_swap = false
"#;
        let config = SelectionCacheConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.swap_dir, Some(PathBuf::from("/var/tmp/facets")));
        assert_eq!(config.grace_period_ms, 1000);
        assert!(!config.compress_swap);
        // untouched keys keep defaults
        assert_eq!(config.min_swap_entries, 50);
    }

    #[test]
    fn test_from_toml_empty_and_missing_table() {
        assert_eq!(
            SelectionCacheConfig::from_toml_str("").unwrap(),
            SelectionCacheConfig::default()
        );
        assert_eq!(
            SelectionCacheConfig::from_toml_str("[other]\nx = 1\n").unwrap(),
            SelectionCacheConfig::default()
        );
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = SelectionCacheConfig::from_toml_str("[selection_cache]\ngrace_period_ms = \"x\"")
            .unwrap_err();
        assert!(matches!(err, SelectionError::Config(_)));
    }

    #[test]
    fn test_swap_path() {
        let config = SelectionCacheConfig::default().with_swap_dir("/tmp/x");
        assert_eq!(config.swap_path(7), PathBuf::from("/tmp/x/facet-7.fswp"));
    }

    #[test]
    fn test_builders() {
        let config = SelectionCacheConfig::default()
            .with_min_swap_entries(3)
            .with_grace_period_ms(10)
            .with_compression(false)
            .with_max_restore_attempts(1);
        assert_eq!(config.min_swap_entries, 3);
        assert_eq!(config.grace_period_ms, 10);
        assert!(!config.compress_swap);
        assert_eq!(config.max_restore_attempts, 1);
    }
}
