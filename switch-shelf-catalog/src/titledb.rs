//! Decoding of the titledb `titles.json` / `versions.json` pair.
//!
//! `titles.json` is an object keyed by an eShop store id whose values describe
//! one title each; only entries carrying a well-formed title id are kept.
//! Add-on entries are attached to their base title, creating an empty
//! placeholder when the base shows up later (or never).
//!
//! `versions.json` maps a lowercase base title id to `{ "version": "date" }`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use switch_shelf_core::{ContentType, TitleId};

use crate::error::CatalogError;

/// One entry of the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTitle {
    pub id: TitleId,
    pub name: String,
    pub region: Option<String>,
    pub publisher: Option<String>,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub description: Option<String>,
    /// Release date as published (`YYYYMMDD`)
    pub release_date_raw: Option<u32>,
    /// Release date as `YYYY-MM-DD`, when the raw value is a valid date
    pub release_date: Option<String>,
    pub size: Option<u64>,
    pub is_demo: bool,
    /// Published version (meaningful for add-on entries)
    pub version: Option<u32>,
}

impl RemoteTitle {
    fn placeholder(id: TitleId) -> Self {
        Self {
            id,
            name: String::new(),
            region: None,
            publisher: None,
            icon_url: None,
            banner_url: None,
            description: None,
            release_date_raw: None,
            release_date: None,
            size: None,
            is_demo: false,
            version: None,
        }
    }
}

/// A base title with its add-ons and published updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTitleEntry {
    pub title: RemoteTitle,
    pub addons: BTreeMap<TitleId, RemoteTitle>,
    /// Update version -> release date
    pub updates: BTreeMap<u32, String>,
}

impl RemoteTitleEntry {
    fn new(title: RemoteTitle) -> Self {
        Self {
            title,
            addons: BTreeMap::new(),
            updates: BTreeMap::new(),
        }
    }

    /// Highest published update version and its release date.
    pub fn latest_update(&self) -> Option<(u32, &str)> {
        self.updates
            .iter()
            .next_back()
            .map(|(v, date)| (*v, date.as_str()))
    }

    /// Whether this entry was only created to hold add-ons.
    pub fn is_placeholder(&self) -> bool {
        self.title.name.is_empty()
    }
}

/// The decoded remote catalog, keyed by base title id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCatalog {
    pub titles: HashMap<TitleId, RemoteTitleEntry>,
}

impl RemoteCatalog {
    pub fn get(&self, id: TitleId) -> Option<&RemoteTitleEntry> {
        self.titles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TitleId, &RemoteTitleEntry)> {
        self.titles.iter()
    }

    /// Display name for any title id (base, update or add-on).
    pub fn name_of(&self, id: TitleId) -> Option<&str> {
        let entry = self.titles.get(&id.base_id())?;
        let name = match id.content_type() {
            ContentType::AddOn => entry.addons.get(&id).map(|t| t.name.as_str()),
            _ => Some(entry.title.name.as_str()),
        };
        name.filter(|n| !n.is_empty())
    }

    /// Decode both catalog documents.
    pub fn from_json(titles: &[u8], versions: &[u8]) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        catalog.merge_titles(titles)?;
        catalog.merge_versions(versions)?;
        log::debug!("Remote catalog holds {} base titles", catalog.len());
        Ok(catalog)
    }

    fn merge_titles(&mut self, json: &[u8]) -> Result<(), CatalogError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(json)
            .map_err(|e| CatalogError::malformed(format!("titles.json: {e}")))?;

        // Sorted so placeholder creation and duplicate resolution are stable
        let mut keys: Vec<&String> = raw.keys().collect();
        keys.sort();

        let mut skipped = 0usize;
        for key in keys {
            let Some(title) = raw.get(key).and_then(decode_title) else {
                skipped += 1;
                continue;
            };
            match title.id.content_type() {
                ContentType::Base => match self.titles.get_mut(&title.id) {
                    Some(entry) if entry.is_placeholder() => entry.title = title,
                    Some(_) => {}
                    None => {
                        self.titles.insert(title.id, RemoteTitleEntry::new(title));
                    }
                },
                ContentType::AddOn => {
                    let base = title.id.base_id();
                    self.titles
                        .entry(base)
                        .or_insert_with(|| RemoteTitleEntry::new(RemoteTitle::placeholder(base)))
                        .addons
                        .insert(title.id, title);
                }
                ContentType::Update => skipped += 1,
            }
        }
        if skipped > 0 {
            log::debug!("titles.json: ignored {skipped} entries without a usable id");
        }
        Ok(())
    }

    fn merge_versions(&mut self, json: &[u8]) -> Result<(), CatalogError> {
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_slice(json)
            .map_err(|e| CatalogError::malformed(format!("versions.json: {e}")))?;

        for (id, versions) in raw {
            let Ok(id) = id.parse::<TitleId>() else {
                continue;
            };
            let Some(entry) = self.titles.get_mut(&id.base_id()) else {
                continue;
            };
            for (version, date) in versions {
                if let Ok(v) = version.parse::<u32>() {
                    entry.updates.insert(v, date);
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTitle {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    release_date: Option<u32>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    banner_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    is_demo: Option<bool>,
}

fn decode_title(value: &serde_json::Value) -> Option<RemoteTitle> {
    let raw: RawTitle = serde_json::from_value(value.clone()).ok()?;
    let id = raw.id?.trim().parse::<TitleId>().ok()?;
    if !id.is_well_formed() {
        return None;
    }
    Some(RemoteTitle {
        id,
        name: raw.name.map(|n| n.trim().to_string()).unwrap_or_default(),
        region: raw.region,
        publisher: raw.publisher,
        icon_url: raw.icon_url,
        banner_url: raw.banner_url,
        description: raw.description,
        release_date: raw.release_date.and_then(format_release_date),
        release_date_raw: raw.release_date,
        size: raw.size,
        is_demo: raw.is_demo.unwrap_or(false),
        version: raw.version,
    })
}

/// `20200131` -> `2020-01-31`
pub fn format_release_date(raw: u32) -> Option<String> {
    chrono::NaiveDate::parse_from_str(&raw.to_string(), "%Y%m%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
