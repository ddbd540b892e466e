use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use switch_shelf_core::TitleId;

use crate::cli_types::IgnoreList;
use crate::error::CliError;

use super::{GlobalArgs, open_state, read_keys};

/// Print the saved settings as TOML.
pub(crate) fn run_config_show(global: &GlobalArgs) -> Result<(), CliError> {
    let state = open_state(global)?;
    log::info!(
        "{}",
        format!("# {}", state.settings_path().display()).if_supports_color(Stdout, |t| t.dimmed()),
    );
    let text = toml::to_string_pretty(&state.settings)
        .map_err(|e| CliError::invalid_argument(format!("settings cannot be shown: {e}")))?;
    log::info!("{}", text.trim_end());
    Ok(())
}

pub(crate) fn run_config_path(global: &GlobalArgs) -> Result<(), CliError> {
    let state = open_state(global)?;
    log::info!("{}", state.settings_path().display());
    Ok(())
}

/// Save the library folder.
pub(crate) fn run_config_set_folder(global: &GlobalArgs, path: PathBuf) -> Result<(), CliError> {
    if !path.is_dir() {
        return Err(CliError::invalid_argument(format!(
            "{} is not a folder",
            path.display()
        )));
    }
    let path = path.canonicalize()?;
    let mut state = open_state(global)?;
    state.settings.folder = Some(path.clone());
    state.save_settings()?;
    log::info!(
        "{} Library folder set to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}

/// Save the key file location after checking that it parses.
pub(crate) fn run_config_set_keys(global: &GlobalArgs, path: PathBuf) -> Result<(), CliError> {
    let keys = read_keys(&path)?;
    if keys.is_empty() {
        return Err(CliError::keys(format!("{} holds no keys", path.display())));
    }
    let path = path.canonicalize()?;
    let mut state = open_state(global)?;
    state.settings.prod_keys = Some(path.clone());
    state.save_settings()?;
    log::info!(
        "{} Key file set to {} ({} keys)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        keys.len(),
    );
    Ok(())
}

/// Add a title id to the update or add-on ignore list.
pub(crate) fn run_config_ignore(
    global: &GlobalArgs,
    list: IgnoreList,
    title_id: &str,
) -> Result<(), CliError> {
    let id: TitleId = title_id
        .parse()
        .map_err(|e| CliError::invalid_argument(format!("{e}")))?;
    let mut state = open_state(global)?;
    let (ids, label) = match list {
        IgnoreList::Updates => (&mut state.settings.ignore_update_title_ids, "update"),
        IgnoreList::Dlc => (&mut state.settings.ignore_dlc_title_ids, "add-on"),
    };

    let text = id.to_string();
    if ids.iter().any(|existing| existing.eq_ignore_ascii_case(&text)) {
        log::info!(
            "{}",
            format!("{text} is already on the {label} ignore list")
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }
    ids.push(text.clone());
    state.save_settings()?;
    log::info!(
        "{} {} added to the {} ignore list",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        text,
        label,
    );
    Ok(())
}
