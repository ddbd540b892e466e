use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::error::CliError;

use super::{GlobalArgs, open_state};

/// Print the scan cache path.
pub(crate) fn run_cache_path(global: &GlobalArgs) -> Result<(), CliError> {
    let state = open_state(global)?;
    log::info!("{}", state.cache_path().display());
    Ok(())
}

/// Remove the scan cache.
pub(crate) fn run_cache_clear(global: &GlobalArgs) -> Result<(), CliError> {
    let state = open_state(global)?;
    let existed = state.cache_path().exists();
    state.clear_cache()?;
    if existed {
        log::info!(
            "{} Scan cache cleared",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "{}",
            "No scan cache to clear.".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}
