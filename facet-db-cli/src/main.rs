mod cli;
mod commands;
mod error;
mod input;

use clap::Parser;
use cli::{Cli, Commands};
use error::exit_with_error;

fn init_tracing(cli: &Cli) {
    // --quiet always wins; --verbose shows info unless RUST_LOG says otherwise;
    // by default only RUST_LOG turns logging on.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "off".into())
    };

    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}

fn run(cli: Cli) -> error::CliResult<()> {
    let ctx = commands::load_context(cli.config.as_deref())?;

    match cli.command {
        Commands::Sort { input, kind } => commands::sort::run(&input, kind, &ctx),

        Commands::Page {
            input,
            start,
            count,
            max,
            show_others,
        } => commands::page::run(&input, start, count, max, show_others, &ctx),

        Commands::Search {
            input,
            query,
            invert_selected,
        } => commands::search::run(&input, query.as_deref(), invert_selected, &ctx),

        Commands::SwapCheck { input } => commands::swap_check::run(&input, &ctx),
    }
}
