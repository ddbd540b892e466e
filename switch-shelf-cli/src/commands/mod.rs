pub(crate) mod cache;
pub(crate) mod catalog;
pub(crate) mod config;
pub(crate) mod keys;
pub(crate) mod library;
pub(crate) mod missing;
pub(crate) mod organize;
pub(crate) mod scan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use switch_shelf_core::{KeySet, LogProgress, ProgressSink};
use switch_shelf_lib::{LibraryState, ScanStats};
use switch_shelf_nx::NxParser;

use crate::error::CliError;
use crate::interrupt;
use crate::progress::BarProgress;

/// Options given before the subcommand.
pub(crate) struct GlobalArgs {
    pub folder: Option<PathBuf>,
    pub keys: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

/// Progress reporter for one operation: a bar, or log lines when verbose.
/// Dropping it clears the bar.
pub(crate) fn progress(global: &GlobalArgs) -> Box<dyn ProgressSink> {
    if global.verbose {
        Box::new(LogProgress)
    } else {
        Box::new(BarProgress::new(global.quiet))
    }
}

/// Open the library state with the per-user settings and any overrides.
pub(crate) fn open_state(global: &GlobalArgs) -> Result<LibraryState, CliError> {
    let mut state = LibraryState::open_default()?;
    if let Some(folder) = &global.folder {
        state.set_folder_override(folder.clone());
    }
    Ok(state)
}

/// Key file to use: `--keys`, then the saved or well-known locations.
pub(crate) fn key_path(global: &GlobalArgs, state: &LibraryState) -> Option<PathBuf> {
    global
        .keys
        .clone()
        .or_else(|| state.settings.locate_keys())
}

pub(crate) fn read_keys(path: &Path) -> Result<KeySet, CliError> {
    KeySet::from_file(path).map_err(|e| CliError::keys(format!("{}: {}", path.display(), e)))
}

/// Load the keys for a scan. Without keys every container is reported as
/// missing keys, so this only warns.
fn load_keys(global: &GlobalArgs, state: &LibraryState) -> Result<KeySet, CliError> {
    let Some(path) = key_path(global, state) else {
        log::warn!(
            "{} No prod.keys found; containers cannot be decrypted. Use --keys or 'switch-shelf config set-keys'.",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
        return Ok(KeySet::new());
    };
    let keys = read_keys(&path)?;
    log::debug!("Loaded {} keys from {}", keys.len(), path.display());
    if !keys.has_header_key() {
        log::warn!(
            "{} {} has no header_key; containers cannot be decrypted",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            path.display(),
        );
    }
    Ok(keys)
}

/// Scan the library with a progress bar. Ctrl-C stops the scan and keeps
/// the partial results.
pub(crate) fn scan_library(
    global: &GlobalArgs,
    state: &mut LibraryState,
    force: bool,
) -> Result<ScanStats, CliError> {
    let keys = load_keys(global, state)?;
    let parser = Arc::new(NxParser::new(Arc::new(keys)));
    if let Some(folder) = state.library_folder() {
        log::info!(
            "Scanning library in: {}",
            folder.display().if_supports_color(Stdout, |t| t.cyan()),
        );
    }
    let sink = progress(global);
    let scanned = state.scan(parser, force, sink.as_ref(), Some(interrupt::cancel_flag()));
    drop(sink);
    let stats = scanned?;

    if stats.cancelled {
        log::warn!(
            "{} Scan was cancelled; results are partial",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    }

    if stats.skipped > 0 {
        log::warn!(
            "{} {} files could not be read (see 'switch-shelf library')",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            stats.skipped,
        );
    }
    Ok(stats)
}

/// Refresh the title catalog, falling back to the downloaded copy.
///
/// Returns false when no catalog could be loaded at all.
pub(crate) fn load_catalog(
    global: &GlobalArgs,
    state: &mut LibraryState,
    offline: bool,
) -> bool {
    if !offline {
        let sink = progress(global);
        let refreshed = state.refresh_catalog(sink.as_ref());
        drop(sink);
        match refreshed {
            Ok(outcome) => {
                if outcome.offline {
                    log::warn!(
                        "{} Title catalog server unreachable; using the downloaded copy",
                        "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    );
                }
                return true;
            }
            Err(e) => {
                log::warn!(
                    "{} Could not refresh the title catalog: {}",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    e,
                );
            }
        }
    }
    match state.load_catalog() {
        Ok(count) => {
            log::debug!("Loaded {} titles from the downloaded catalog", count);
            true
        }
        Err(e) => {
            log::warn!(
                "{} No title catalog available: {}",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                e,
            );
            false
        }
    }
}

/// Version number with its release index (versions step by 65536).
pub(crate) fn version_label(version: u32) -> String {
    format!("v{} (#{})", version, version >> 16)
}
