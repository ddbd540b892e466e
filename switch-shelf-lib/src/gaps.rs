//! Gap analysis: what the remote catalog has that the local library lacks.
//!
//! All functions are pure. Results are keyed by title id and unordered;
//! callers sort when they need a stable order.

use std::collections::{HashMap, HashSet};

use switch_shelf_catalog::{RemoteCatalog, RemoteTitle};
use switch_shelf_core::TitleId;

use crate::local::LocalCatalog;

/// A title that is held locally but not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteTitle {
    pub title_id: TitleId,
    pub name: String,
    pub region: Option<String>,
    pub icon_url: Option<String>,
    /// Version currently held (newest update, else the base)
    pub local_version: u32,
    /// Newest version published
    pub latest_version: u32,
    pub latest_date: Option<String>,
    /// Missing add-ons as `"<name> [<id>]"`
    pub missing_addons: Vec<String>,
}

impl IncompleteTitle {
    fn new(title_id: TitleId, name: String, local_version: u32) -> Self {
        Self {
            title_id,
            name,
            region: None,
            icon_url: None,
            local_version,
            latest_version: local_version,
            latest_date: None,
            missing_addons: Vec::new(),
        }
    }

    fn with_remote(mut self, remote: &RemoteTitle) -> Self {
        if !remote.name.is_empty() {
            self.name = remote.name.clone();
        }
        self.region = remote.region.clone();
        self.icon_url = remote.icon_url.clone();
        self
    }
}

/// Remote base titles with no local family at all.
///
/// Entries without a name (add-on placeholders) are never reported.
pub fn missing_games(
    local: &LocalCatalog,
    remote: &RemoteCatalog,
    hide_demos: bool,
) -> HashMap<TitleId, RemoteTitle> {
    remote
        .iter()
        .filter(|(id, _)| local.family(**id).is_none())
        .filter(|(_, entry)| !entry.title.name.is_empty())
        .filter(|(_, entry)| !(hide_demos && entry.title.is_demo))
        .map(|(id, entry)| (*id, entry.title.clone()))
        .collect()
}

/// Titles whose newest local version is behind the catalog.
///
/// Add-ons held at a lower version than the catalog publishes are reported
/// too (keyed by add-on id) unless `skip_addon_updates` is set. Families
/// without a base never contribute.
pub fn missing_updates(
    local: &LocalCatalog,
    remote: &RemoteCatalog,
    ignore: &HashSet<TitleId>,
    skip_addon_updates: bool,
) -> HashMap<TitleId, IncompleteTitle> {
    let mut result = HashMap::new();

    for (base_id, family) in local.families() {
        if !family.has_base() || ignore.contains(base_id) {
            continue;
        }
        let Some(entry) = remote.get(*base_id) else {
            continue;
        };

        if let Some((latest, date)) = entry.latest_update() {
            let local_version = family.local_version();
            if latest > local_version {
                let mut title =
                    IncompleteTitle::new(*base_id, local.family_name(family), local_version)
                        .with_remote(&entry.title);
                title.latest_version = latest;
                title.latest_date = Some(date.to_string());
                result.insert(*base_id, title);
            }
        }

        if skip_addon_updates {
            continue;
        }
        for (addon_id, record) in &family.addons {
            if ignore.contains(addon_id) {
                continue;
            }
            let Some(published) = entry.addons.get(addon_id) else {
                continue;
            };
            let Some(latest) = published.version else {
                continue;
            };
            if latest > record.version {
                let mut title =
                    IncompleteTitle::new(*addon_id, local.record_name(record), record.version)
                        .with_remote(published);
                title.latest_version = latest;
                title.latest_date = published.release_date.clone();
                result.insert(*addon_id, title);
            }
        }
    }
    result
}

/// Titles with published add-ons that are not held locally.
///
/// `ignore` applies both to base ids (skip the whole title) and to single
/// add-on ids.
pub fn missing_dlc(
    local: &LocalCatalog,
    remote: &RemoteCatalog,
    ignore: &HashSet<TitleId>,
) -> HashMap<TitleId, IncompleteTitle> {
    let mut result = HashMap::new();

    for (base_id, family) in local.families() {
        if !family.has_base() || ignore.contains(base_id) {
            continue;
        }
        let Some(entry) = remote.get(*base_id) else {
            continue;
        };

        let missing: Vec<String> = entry
            .addons
            .iter()
            .filter(|(id, _)| !family.addons.contains_key(id) && !ignore.contains(id))
            .map(|(id, dlc)| format!("{} [{}]", dlc.name, id))
            .collect();
        if missing.is_empty() {
            continue;
        }

        let mut title =
            IncompleteTitle::new(*base_id, local.family_name(family), family.local_version())
                .with_remote(&entry.title);
        title.missing_addons = missing;
        result.insert(*base_id, title);
    }
    result
}

#[cfg(test)]
#[path = "tests/gaps_tests.rs"]
mod tests;
