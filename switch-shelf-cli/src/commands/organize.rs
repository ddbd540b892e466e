use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use switch_shelf_lib::OrganizePlan;

use crate::cli_types::LibraryArgs;
use crate::error::CliError;

use super::{GlobalArgs, load_catalog, open_state, progress, scan_library};

/// Plan an organize run, print it, then apply it unless `dry_run`.
pub(crate) fn run_organize(
    global: &GlobalArgs,
    dry_run: bool,
    args: LibraryArgs,
) -> Result<(), CliError> {
    let mut state = open_state(global)?;
    if dry_run {
        log::info!(
            "{}",
            "Dry run: no files will be moved or deleted".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    load_catalog(global, &mut state, args.offline);
    if scan_library(global, &mut state, args.force)?.cancelled {
        log::info!("Nothing organized");
        return Ok(());
    }

    let plan = state.plan_organize()?;
    log::info!("");
    print_plan(&plan);

    if plan.is_empty() {
        log::info!(
            "{} Nothing to do, {} files already in place",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            plan.already_in_place.len(),
        );
        return Ok(());
    }
    if dry_run {
        log::info!("");
        log::info!(
            "Would move {} files and delete {} old updates",
            plan.moves.len(),
            plan.deletions.len(),
        );
        return Ok(());
    }

    let sink = progress(global);
    let executed = state.execute_organize(&plan, sink.as_ref());
    drop(sink);
    let summary = executed?;

    log::info!("");
    log::info!(
        "{}",
        "Organize complete:".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!(
        "  {} Moved: {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.moved,
    );
    log::info!("  Already in place: {}", summary.already_in_place);
    if summary.deleted > 0 {
        log::info!("  Old updates deleted: {}", summary.deleted);
    }
    if summary.folders_removed > 0 {
        log::info!("  Empty folders removed: {}", summary.folders_removed);
    }
    if summary.skipped_split > 0 {
        log::info!("  Split sets left alone: {}", summary.skipped_split);
    }
    for conflict in &summary.conflicts {
        log::warn!(
            "  {} {}",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            conflict,
        );
    }
    for error in &summary.errors {
        log::warn!(
            "  {} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            error,
        );
    }
    Ok(())
}

fn print_plan(plan: &OrganizePlan) {
    if !plan.deletions.is_empty() {
        log::info!(
            "{}",
            "Old updates to delete:".if_supports_color(Stdout, |t| t.bold()),
        );
        for deletion in &plan.deletions {
            log::info!(
                "  {} {} (v{})",
                "-".if_supports_color(Stdout, |t| t.red()),
                relative(&plan.root, &deletion.path),
                deletion.version,
            );
        }
        log::info!("");
    }

    if !plan.moves.is_empty() {
        log::info!("{}", "Moves:".if_supports_color(Stdout, |t| t.bold()));
        for planned in &plan.moves {
            log::info!(
                "  {}",
                relative(&plan.root, &planned.source).if_supports_color(Stdout, |t| t.dimmed()),
            );
            log::info!(
                "    \u{2192} {}",
                relative(&plan.root, &planned.target).if_supports_color(Stdout, |t| t.green()),
            );
        }
        log::info!("");
    }

    for (source, target) in &plan.conflicts {
        log::warn!(
            "  {} {}: destination already exists ({})",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            relative(&plan.root, source),
            relative(&plan.root, target),
        );
    }
    for path in &plan.skipped_split {
        log::info!(
            "  {}",
            format!("Split set left alone: {}", relative(&plan.root, path))
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
