//! The local catalog: scanned files and the title families built from them.
//!
//! Files live in an arena indexed by [`FileId`]; content records point into
//! it. Families are keyed by base title id and hold every record whose id
//! maps to that base, whether or not the base itself was found.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use switch_shelf_core::util::title_name_from_file_name;
use switch_shelf_core::{
    ContainerFormat, ContainerKind, ContentType, DecodedContent, DisplayNames, FailureKind,
    Language, TitleId,
};

/// Index of a [`ContainerFile`] in the catalog arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// One scanned container (a single file or a whole split set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFile {
    pub folder: PathBuf,
    pub file_name: String,
    /// Total size in bytes (all volumes for split sets)
    pub size: u64,
    pub kind: ContainerKind,
    pub format: ContainerFormat,
    /// Physical volumes in order; empty unless the file is a split set
    pub volumes: Vec<PathBuf>,
}

impl ContainerFile {
    /// Path naming the container (the logical set name for split sets).
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }

    pub fn is_split(&self) -> bool {
        self.kind == ContainerKind::SplitVolume
    }

    pub fn is_multi_content(&self) -> bool {
        self.kind == ContainerKind::MultiContent
    }

    /// Lowercase extension of the file name, or the format's default.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| self.format.extension().to_string())
    }
}

/// Decoded metadata for one content unit, tied to the file holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title_id: TitleId,
    pub version: u32,
    pub names: DisplayNames,
    pub display_version: Option<String>,
    pub publisher: Option<String>,
    pub file: FileId,
}

impl ContentRecord {
    pub fn from_decoded(content: DecodedContent, file: FileId) -> Self {
        Self {
            title_id: content.title_id,
            version: content.version,
            names: content.names,
            display_version: content.display_version,
            publisher: content.publisher,
            file,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.title_id.content_type()
    }
}

/// Every record sharing one base title id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleFamily {
    pub base_id: TitleId,
    pub base: Option<ContentRecord>,
    /// Ordered by version, highest first
    pub updates: Vec<ContentRecord>,
    /// Index into `updates` of the newest update
    pub latest_update: Option<usize>,
    pub addons: BTreeMap<TitleId, ContentRecord>,
    /// Some record of this family lives in a multi-content container
    pub multi_content: bool,
    /// Some record of this family lives in a split set
    pub split: bool,
}

impl TitleFamily {
    pub fn new(base_id: TitleId) -> Self {
        Self {
            base_id,
            base: None,
            updates: Vec::new(),
            latest_update: None,
            addons: BTreeMap::new(),
            multi_content: false,
            split: false,
        }
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub fn latest_update(&self) -> Option<&ContentRecord> {
        self.latest_update.and_then(|i| self.updates.get(i))
    }

    /// Version held locally: the newest update, else the base.
    pub fn local_version(&self) -> u32 {
        self.latest_update()
            .or(self.base.as_ref())
            .map(|r| r.version)
            .unwrap_or(0)
    }

    /// All records of the family: base, updates, then add-ons.
    pub fn records(&self) -> impl Iterator<Item = &ContentRecord> {
        self.base
            .iter()
            .chain(self.updates.iter())
            .chain(self.addons.values())
    }

    fn insert(&mut self, record: ContentRecord) {
        match record.content_type() {
            ContentType::Base => {
                if let Some(existing) = &self.base {
                    log::debug!(
                        "{}: duplicate base (v{} already recorded), keeping the first",
                        record.title_id,
                        existing.version
                    );
                } else {
                    self.base = Some(record);
                }
            }
            ContentType::Update => {
                // Stable: equal versions stay in the order they were seen
                let pos = self
                    .updates
                    .iter()
                    .position(|u| u.version < record.version)
                    .unwrap_or(self.updates.len());
                self.updates.insert(pos, record);
                self.recompute_latest();
            }
            ContentType::AddOn => match self.addons.get(&record.title_id) {
                Some(existing) if existing.version >= record.version => {}
                _ => {
                    self.addons.insert(record.title_id, record);
                }
            },
        }
    }

    fn recompute_latest(&mut self) {
        self.latest_update = if self.updates.is_empty() {
            None
        } else {
            Some(0)
        };
    }

    fn is_empty(&self) -> bool {
        self.base.is_none() && self.updates.is_empty() && self.addons.is_empty()
    }
}

/// A candidate that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// The local library: file arena, title families and skipped files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCatalog {
    files: Vec<Option<ContainerFile>>,
    families: BTreeMap<TitleId, TitleFamily>,
    skipped: Vec<SkippedFile>,
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: ContainerFile) -> FileId {
        self.files.push(Some(file));
        FileId(self.files.len() - 1)
    }

    /// The file behind `id`, or `None` once it has been deleted.
    pub fn file(&self, id: FileId) -> Option<&ContainerFile> {
        self.files.get(id.0).and_then(Option::as_ref)
    }

    /// Live files with their ids.
    pub fn files(&self) -> impl Iterator<Item = (FileId, &ContainerFile)> {
        self.files
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FileId(i), f)))
    }

    pub fn num_files(&self) -> usize {
        self.files.iter().flatten().count()
    }

    /// Replace the arena slot for a moved file.
    pub fn relocate(&mut self, id: FileId, folder: PathBuf, file_name: String) {
        if let Some(Some(file)) = self.files.get_mut(id.0) {
            *file = ContainerFile {
                folder,
                file_name,
                ..file.clone()
            };
        }
    }

    /// Drop a deleted file and every record that pointed at it.
    pub fn remove_file(&mut self, id: FileId) {
        if let Some(slot) = self.files.get_mut(id.0) {
            *slot = None;
        }
        for family in self.families.values_mut() {
            if family.base.as_ref().is_some_and(|b| b.file == id) {
                family.base = None;
            }
            family.updates.retain(|u| u.file != id);
            family.recompute_latest();
            family.addons.retain(|_, a| a.file != id);
        }
        self.families.retain(|_, f| !f.is_empty());
    }

    /// File a record under its family. Records with malformed ids are dropped.
    pub fn add_record(&mut self, record: ContentRecord) {
        if !record.title_id.is_well_formed() {
            log::debug!("Ignoring record with malformed title id {}", record.title_id);
            return;
        }
        let kind = self.file(record.file).map(|f| f.kind);
        let family = self
            .families
            .entry(record.title_id.base_id())
            .or_insert_with(|| TitleFamily::new(record.title_id.base_id()));
        match kind {
            Some(ContainerKind::MultiContent) => family.multi_content = true,
            Some(ContainerKind::SplitVolume) => family.split = true,
            _ => {}
        }
        family.insert(record);
    }

    pub fn add_skipped(&mut self, skipped: SkippedFile) {
        self.skipped.push(skipped);
    }

    pub fn families(&self) -> &BTreeMap<TitleId, TitleFamily> {
        &self.families
    }

    pub fn family(&self, base_id: TitleId) -> Option<&TitleFamily> {
        self.families.get(&base_id)
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Families whose base application was not found.
    pub fn orphans(&self) -> impl Iterator<Item = &TitleFamily> {
        self.families.values().filter(|f| !f.has_base())
    }

    /// Name for a record: its control data, else the container file name.
    pub fn record_name(&self, record: &ContentRecord) -> String {
        if let Some(name) = record.names.resolve(Language::AmericanEnglish) {
            return name.to_string();
        }
        self.file(record.file)
            .map(|f| title_name_from_file_name(&f.file_name))
            .unwrap_or_default()
    }

    /// Name for a family, taken from its base when present.
    pub fn family_name(&self, family: &TitleFamily) -> String {
        match family.base.as_ref().or(family.latest_update()) {
            Some(record) => self.record_name(record),
            None => family
                .addons
                .values()
                .next()
                .map(|r| self.record_name(r))
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "tests/local_tests.rs"]
mod tests;
