use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use switch_shelf_lib::IncompleteTitle;

use crate::cli_types::{LibraryArgs, MissingKind};
use crate::error::CliError;

use super::{GlobalArgs, load_catalog, open_state, scan_library, version_label};

/// Compare the library with the title catalog.
pub(crate) fn run_missing(
    global: &GlobalArgs,
    what: MissingKind,
    args: LibraryArgs,
) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    load_catalog(global, &mut state, args.offline);
    scan_library(global, &mut state, args.force)?;
    log::info!("");

    match what {
        MissingKind::Games => {
            let mut games: Vec<_> = state.missing_games()?.into_values().collect();
            games.sort_by_key(|t| t.id);
            log::info!(
                "{}",
                format!("Missing games ({}):", games.len()).if_supports_color(Stdout, |t| t.bold()),
            );
            for title in &games {
                log::info!(
                    "  {} {}{}",
                    title.id.if_supports_color(Stdout, |t| t.dimmed()),
                    title.name,
                    title
                        .release_date
                        .as_deref()
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default(),
                );
            }
        }
        MissingKind::Updates => {
            let updates = sorted(state.missing_updates()?.into_values().collect());
            log::info!(
                "{}",
                format!("Updates available ({}):", updates.len())
                    .if_supports_color(Stdout, |t| t.bold()),
            );
            for title in &updates {
                log::info!(
                    "  {} {}: {} \u{2192} {}{}",
                    title.title_id.if_supports_color(Stdout, |t| t.dimmed()),
                    title.name.if_supports_color(Stdout, |t| t.bold()),
                    version_label(title.local_version),
                    version_label(title.latest_version).if_supports_color(Stdout, |t| t.green()),
                    title
                        .latest_date
                        .as_deref()
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default(),
                );
            }
        }
        MissingKind::Dlc => {
            let titles = sorted(state.missing_dlc()?.into_values().collect());
            log::info!(
                "{}",
                format!("Titles with missing add-ons ({}):", titles.len())
                    .if_supports_color(Stdout, |t| t.bold()),
            );
            for title in &titles {
                log::info!(
                    "  {} {}",
                    title.title_id.if_supports_color(Stdout, |t| t.dimmed()),
                    title.name.if_supports_color(Stdout, |t| t.bold()),
                );
                for addon in &title.missing_addons {
                    log::info!("      {}", addon);
                }
            }
        }
    }
    Ok(())
}

fn sorted(mut titles: Vec<IncompleteTitle>) -> Vec<IncompleteTitle> {
    titles.sort_by_key(|t| t.title_id);
    titles
}
