//! switch-shelf CLI
//!
//! Command-line interface for scanning, checking and organizing a Nintendo
//! Switch game library.

mod cli_types;
mod commands;
mod error;
mod interrupt;
mod progress;

use std::io::Write;

use clap::Parser;
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use cli_types::{CacheAction, CatalogAction, Cli, Commands, ConfigAction};
use commands::GlobalArgs;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        folder: cli.folder,
        keys: cli.keys,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Scan { force } => commands::scan::run_scan(&global, force),
        Commands::Library { args } => commands::library::run_library(&global, args),
        Commands::Missing { what, args } => commands::missing::run_missing(&global, what, args),
        Commands::Organize { dry_run, args } => {
            commands::organize::run_organize(&global, dry_run, args)
        }
        Commands::Catalog { action } => match action {
            CatalogAction::Refresh => commands::catalog::run_catalog_refresh(&global),
            CatalogAction::Info => commands::catalog::run_catalog_info(&global),
        },
        Commands::Cache { action } => match action {
            CacheAction::Path => commands::cache::run_cache_path(&global),
            CacheAction::Clear => commands::cache::run_cache_clear(&global),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(&global),
            ConfigAction::Path => commands::config::run_config_path(&global),
            ConfigAction::SetFolder { path } => commands::config::run_config_set_folder(&global, path),
            ConfigAction::SetKeys { path } => commands::config::run_config_set_keys(&global, path),
            ConfigAction::Ignore { list, title_id } => {
                commands::config::run_config_ignore(&global, list, &title_id)
            }
        },
        Commands::Keys => commands::keys::run_keys(&global),
    };

    if let Err(e) = result {
        log::error!("{} {}", "\u{2718}".if_supports_color(Stdout, |t| t.red()), e);
        std::process::exit(1);
    }
}

/// Route `log` output to stdout.
///
/// Normal runs print bare messages at info level, `--quiet` keeps warnings
/// and errors, `--verbose` adds debug messages with timestamps. `RUST_LOG`
/// still applies on top.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .target(env_logger::Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("switch_shelf", level);
    if !verbose {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.parse_default_env().init();
}
