//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "switch-shelf")]
#[command(about = "Manage a Nintendo Switch game library", long_about = None)]
pub(crate) struct Cli {
    /// Library folder (overrides the saved setting for this run)
    #[arg(short, long, global = true)]
    pub folder: Option<PathBuf>,

    /// Key file to decrypt containers with (default: saved setting, then
    /// ~/.config/switch-shelf/prod.keys, then ~/.switch/prod.keys)
    #[arg(short, long, global = true)]
    pub keys: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by commands that work on a scanned library.
#[derive(Args, Clone, Copy)]
pub(crate) struct LibraryArgs {
    /// Decode every file even if the scan cache knows it
    #[arg(long)]
    pub force: bool,

    /// Use the downloaded title catalog without contacting the server
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scan the library folders and summarize what was found
    Scan {
        /// Decode every file even if the scan cache knows it
        #[arg(long)]
        force: bool,
    },

    /// List the titles in the library, with issues
    Library {
        #[command(flatten)]
        args: LibraryArgs,
    },

    /// Report what the library is missing compared to the title catalog
    Missing {
        /// What to look for
        #[arg(value_enum)]
        what: MissingKind,

        #[command(flatten)]
        args: LibraryArgs,
    },

    /// Move and rename files using the organize settings
    Organize {
        /// Show planned changes without executing
        #[arg(short = 'n', long)]
        dry_run: bool,

        #[command(flatten)]
        args: LibraryArgs,
    },

    /// Manage the remote title catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Manage the scan cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check which key file is used and whether it can decrypt containers
    Keys,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub(crate) enum MissingKind {
    /// Catalog titles not present in the library
    Games,
    /// Titles with a newer update available
    Updates,
    /// Titles with add-on content not present in the library
    Dlc,
}

#[derive(Subcommand)]
pub(crate) enum CatalogAction {
    /// Download titles.json and versions.json if they changed
    Refresh,
    /// Show where the catalog is stored and how many titles it holds
    Info,
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Print the scan cache path
    Path,
    /// Remove the scan cache so the next scan decodes every file
    Clear,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the current settings
    Show,
    /// Print the settings file path
    Path,
    /// Save the library folder
    SetFolder {
        /// Folder holding the library
        path: PathBuf,
    },
    /// Save the key file location
    SetKeys {
        /// Path to prod.keys
        path: PathBuf,
    },
    /// Add a title id to an ignore list
    Ignore {
        /// Which list to add to
        #[arg(value_enum)]
        list: IgnoreList,
        /// Title id (16 hex digits)
        title_id: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub(crate) enum IgnoreList {
    Updates,
    Dlc,
}
