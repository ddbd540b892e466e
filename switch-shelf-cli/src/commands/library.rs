use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::LibraryArgs;
use crate::error::CliError;

use super::{GlobalArgs, load_catalog, open_state, scan_library, version_label};

/// List every title family in the library, then the files with problems.
pub(crate) fn run_library(global: &GlobalArgs, args: LibraryArgs) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    load_catalog(global, &mut state, args.offline);
    scan_library(global, &mut state, args.force)?;
    let report = state.report()?;

    log::info!("");
    log::info!(
        "{}",
        format!("Library: {} titles in {} files", report.rows.len(), report.num_files)
            .if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    for row in &report.rows {
        let update = match row.update_version {
            Some(v) => version_label(v),
            None => "-".to_string(),
        };
        log::info!(
            "  {} {} {}",
            row.title_id.if_supports_color(Stdout, |t| t.dimmed()),
            row.name.if_supports_color(Stdout, |t| t.bold()),
            format!("[{}]", row.type_label).if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!(
            "      Version: {}, Update: {}, Add-ons: {}{}",
            row.display_version.as_deref().unwrap_or("-"),
            update,
            row.addon_count,
            row.region
                .as_deref()
                .map(|r| format!(", Region: {r}"))
                .unwrap_or_default(),
        );
        log::debug!("      {}", row.path.display());
    }

    if !report.issues.is_empty() {
        log::info!("");
        log::info!(
            "{}",
            format!("Issues ({}):", report.issues.len()).if_supports_color(Stdout, |t| t.bold()),
        );
        for issue in &report.issues {
            log::info!(
                "  {} {}: {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                issue.path.display(),
                issue.reason,
            );
        }
    }
    Ok(())
}
