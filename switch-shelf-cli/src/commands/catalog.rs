use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::error::CliError;

use super::{GlobalArgs, open_state, progress};

/// Download the title catalog if it changed since the last refresh.
pub(crate) fn run_catalog_refresh(global: &GlobalArgs) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    log::info!(
        "Refreshing title catalog from {}",
        state.settings.titles_json_url.if_supports_color(Stdout, |t| t.cyan()),
    );

    let sink = progress(global);
    let refreshed = state.refresh_catalog(sink.as_ref());
    drop(sink);
    let outcome = refreshed?;

    if outcome.offline {
        log::warn!(
            "{} Server unreachable; loaded {} titles from the downloaded copy",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            outcome.title_count,
        );
    } else {
        log::info!(
            "{} Title catalog ready ({} titles)",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            outcome.title_count,
        );
    }
    Ok(())
}

/// Show the stored catalog without network access.
pub(crate) fn run_catalog_info(global: &GlobalArgs) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    log::info!(
        "{}",
        "Title catalog:".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Location: {}", state.catalog_dir().display());
    log::info!("  titles.json: {}", state.settings.titles_json_url);
    log::info!("  versions.json: {}", state.settings.versions_json_url);
    log::info!(
        "  ETags: {} / {}",
        state.settings.titles_etag.as_deref().unwrap_or("-"),
        state.settings.versions_etag.as_deref().unwrap_or("-"),
    );

    match state.load_catalog() {
        Ok(count) => log::info!("  Titles: {}", count.if_supports_color(Stdout, |t| t.bold())),
        Err(e) => {
            log::info!(
                "  {}",
                format!("Not downloaded ({e})").if_supports_color(Stdout, |t| t.dimmed()),
            );
            log::info!("Run 'switch-shelf catalog refresh' to download it.");
        }
    }
    Ok(())
}
