use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::error::CliError;

use super::{GlobalArgs, key_path, open_state, read_keys};

/// Report which key file would be used and whether it can open containers.
pub(crate) fn run_keys(global: &GlobalArgs) -> Result<(), CliError> {
    let state = open_state(global)?;
    let Some(path) = key_path(global, &state) else {
        return Err(CliError::keys(
            "no prod.keys found; pass --keys or run 'switch-shelf config set-keys <path>'",
        ));
    };

    let keys = read_keys(&path)?;
    log::info!(
        "Key file: {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!("  Keys: {}", keys.len());
    if keys.has_header_key() {
        log::info!(
            "  {} header_key present",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::warn!(
            "  {} header_key missing; containers cannot be decrypted",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
        );
    }
    Ok(())
}
