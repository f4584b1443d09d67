use clap::{Parser, Subcommand};
use facet_db_core::SortKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facet", about = "Inspect facet selection snapshots", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a TOML config file with a [selection_cache] table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sort a snapshot and print it as verbose JSON
    Sort {
        /// Verbose snapshot file, or `-` for stdin
        #[arg(long, short = 'i', default_value = "-")]
        input: String,

        /// asc, desc, value-asc, value-desc, specific, or none
        #[arg(long, short = 'k', default_value = "asc")]
        kind: SortKind,
    },

    /// Print one page of a snapshot in the paged form
    Page {
        /// Verbose snapshot file, or `-` for stdin
        #[arg(long, short = 'i', default_value = "-")]
        input: String,

        /// First index of the window
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Window size
        #[arg(long, default_value_t = 50)]
        count: usize,

        /// Entries at or past this index are never inspected
        #[arg(long)]
        max: Option<usize>,

        /// Report whether entries exist past --max
        #[arg(long)]
        show_others: bool,
    },

    /// Filter a snapshot by label and print the matches as verbose JSON
    Search {
        /// Verbose snapshot file, or `-` for stdin
        #[arg(long, short = 'i', default_value = "-")]
        input: String,

        /// Case-insensitive label substring; omit to match everything
        #[arg(long)]
        query: Option<String>,

        /// Keep selected entries even when they do not match
        #[arg(long)]
        invert_selected: bool,
    },

    /// Swap every eligible list to disk, restore it, and compare
    SwapCheck {
        /// Verbose snapshot file, or `-` for stdin
        #[arg(long, short = 'i', default_value = "-")]
        input: String,
    },
}
