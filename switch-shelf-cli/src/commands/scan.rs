use std::collections::BTreeMap;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use switch_shelf_core::util::format_bytes_approx;

use crate::error::CliError;

use super::{GlobalArgs, open_state, scan_library};

/// Scan the library folders and print what was found.
pub(crate) fn run_scan(global: &GlobalArgs, force: bool) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    if force {
        log::info!(
            "{}",
            "Force: ignoring the scan cache".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    let stats = scan_library(global, &mut state, force)?;

    log::info!("");
    log::info!(
        "{} {} files, {} titles",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.files_seen,
        stats.families.if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!(
        "  {} decoded, {} from cache",
        stats.parser_invocations,
        stats.cache_hits,
    );

    let Some(local) = state.local() else {
        return Ok(());
    };
    let total_size: u64 = local.files().map(|(_, file)| file.size).sum();
    log::info!("  {} on disk", format_bytes_approx(total_size));

    let orphans = local.orphans().count();
    if orphans > 0 {
        log::info!(
            "  {} {} titles have updates or add-ons but no base game",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            orphans,
        );
    }

    if !local.skipped().is_empty() {
        let mut by_kind: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for skipped in local.skipped() {
            by_kind
                .entry(skipped.kind.label())
                .or_default()
                .push(skipped.path.display().to_string());
        }
        log::info!("");
        log::info!(
            "{}",
            "Skipped files:".if_supports_color(Stdout, |t| t.bold()),
        );
        for (kind, paths) in &by_kind {
            log::info!(
                "  {} ({})",
                kind.if_supports_color(Stdout, |t| t.red()),
                paths.len(),
            );
            for path in paths {
                log::debug!("    {}", path);
            }
        }
        log::info!(
            "{}",
            "Run with --verbose to list the files".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}
