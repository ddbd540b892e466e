//! Application settings.
//!
//! Stored as TOML at `~/.config/switch-shelf/settings.toml`. A missing or
//! unreadable file yields the defaults; saving is atomic.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use switch_shelf_core::TitleId;

use crate::organize::OrganizeOptions;

pub const DEFAULT_TITLES_URL: &str =
    "https://raw.githubusercontent.com/blawar/titledb/master/US.en.json";
pub const DEFAULT_VERSIONS_URL: &str =
    "https://raw.githubusercontent.com/blawar/titledb/master/versions.json";

const KEYS_FILE: &str = "prod.keys";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Library root, also the organize target
    pub folder: Option<PathBuf>,
    /// Extra folders scanned along with `folder`
    pub scan_folders: Vec<PathBuf>,
    pub scan_recursively: bool,
    pub organize: OrganizeOptions,
    pub ignore_update_title_ids: Vec<String>,
    pub ignore_dlc_title_ids: Vec<String>,
    /// Skip the add-on version check in the missing updates report
    pub ignore_dlc_updates: bool,
    pub hide_demo_games: bool,
    pub titles_json_url: String,
    pub versions_json_url: String,
    pub titles_etag: Option<String>,
    pub versions_etag: Option<String>,
    /// Explicit key file location
    pub prod_keys: Option<PathBuf>,
    pub debug: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            folder: None,
            scan_folders: Vec::new(),
            scan_recursively: true,
            organize: OrganizeOptions::default(),
            ignore_update_title_ids: Vec::new(),
            ignore_dlc_title_ids: Vec::new(),
            ignore_dlc_updates: false,
            hide_demo_games: false,
            titles_json_url: DEFAULT_TITLES_URL.to_string(),
            versions_json_url: DEFAULT_VERSIONS_URL.to_string(),
            titles_etag: None,
            versions_etag: None,
            prod_keys: None,
            debug: false,
        }
    }
}

/// Canonical path to the settings file: `~/.config/switch-shelf/settings.toml`.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switch-shelf")
}

impl AppSettings {
    /// Read settings from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> AppSettings {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return AppSettings::default(),
            Err(e) => {
                log::warn!("Cannot read {}: {}; using defaults", path.display(), e);
                return AppSettings::default();
            }
        };
        match toml::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring invalid settings in {}: {}", path.display(), e);
                AppSettings::default()
            }
        }
    }

    /// Write settings to `path` atomically.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(io::Error::other)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &serialized)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Every folder a scan covers: the library root first, then the extras.
    pub fn all_scan_folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = self.folder.iter().cloned().collect();
        for extra in &self.scan_folders {
            if !folders.contains(extra) {
                folders.push(extra.clone());
            }
        }
        folders
    }

    pub fn ignored_update_ids(&self) -> HashSet<TitleId> {
        parse_ids(&self.ignore_update_title_ids)
    }

    pub fn ignored_dlc_ids(&self) -> HashSet<TitleId> {
        parse_ids(&self.ignore_dlc_title_ids)
    }

    /// Find a key file: the configured path, then the config folder, then
    /// `~/.switch/prod.keys`.
    pub fn locate_keys(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.prod_keys.iter().cloned().collect();
        candidates.push(config_dir().join(KEYS_FILE));
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".switch").join(KEYS_FILE));
        }
        candidates.into_iter().find(|p| p.is_file())
    }
}

fn parse_ids(ids: &[String]) -> HashSet<TitleId> {
    ids.iter()
        .filter_map(|raw| match raw.trim().parse::<TitleId>() {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Ignoring entry in ignore list: {e}");
                None
            }
        })
        .collect()
}
