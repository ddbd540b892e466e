//! Library organizer.
//!
//! Organizing is split into [`plan_organize`], which validates the templates
//! and works out every deletion and move without touching the filesystem,
//! and [`execute_organize`], which applies a plan and keeps the
//! [`LocalCatalog`] in step with the files it moved or deleted. Running the
//! same organize twice is a no-op the second time.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use switch_shelf_catalog::RemoteCatalog;
use switch_shelf_core::{ContentType, Language, ProgressSink, TitleId};

use crate::error::OrganizeError;
use crate::local::{ContentRecord, FileId, LocalCatalog, TitleFamily};

/// Characters that are never allowed in generated names.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '®', '™'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeOptions {
    /// Move every title's files into `<root>/<folder template>`
    pub create_folder_per_game: bool,
    /// Rename files using the file template
    pub rename_files: bool,
    /// Remove folders left empty below the root
    pub delete_empty_folders: bool,
    /// Delete every update file except the newest one
    pub delete_old_update_files: bool,
    pub folder_name_template: String,
    pub file_name_template: String,
    /// Keep generated names to ASCII
    pub switch_safe_file_names: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            create_folder_per_game: false,
            rename_files: false,
            delete_empty_folders: false,
            delete_old_update_files: false,
            folder_name_template: "{TITLE_NAME}".to_string(),
            file_name_template: "{TITLE_NAME} ({DLC_NAME})[{TITLE_ID}][v{VERSION}]".to_string(),
            switch_safe_file_names: true,
        }
    }
}

impl OrganizeOptions {
    fn moves_files(&self) -> bool {
        self.create_folder_per_game || self.rename_files
    }
}

/// Values substituted into a name template.
#[derive(Debug, Clone)]
struct TemplateFields<'a> {
    title_name: &'a str,
    title_id: TitleId,
    version: u32,
    version_txt: &'a str,
    region: &'a str,
    content_type: ContentType,
    dlc_name: &'a str,
}

fn render(template: &str, fields: &TemplateFields, switch_safe: bool) -> String {
    let rendered = template
        .replace("{TITLE_NAME}", fields.title_name)
        .replace("{TITLE_ID}", &fields.title_id.to_string())
        .replace("{VERSION_TXT}", fields.version_txt)
        .replace("{VERSION}", &fields.version.to_string())
        .replace("{REGION}", fields.region)
        .replace("{TYPE}", fields.content_type.tag())
        .replace("{DLC_NAME}", fields.dlc_name);
    sanitize(&rendered, switch_safe)
}

/// Strip characters that are unsafe in file names, drop brackets left empty
/// by blank substitutions and collapse whitespace.
pub fn sanitize(name: &str, switch_safe: bool) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .filter(|c| !switch_safe || c.is_ascii())
        .collect();
    loop {
        let next = cleaned.replace("[]", "").replace("()", "");
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(['.', ' ']).to_string()
}

fn is_usable_name(name: &str) -> bool {
    !name.replace('.', "").trim().is_empty()
}

/// Check every enabled template against sample values, including blank
/// region and add-on name.
pub fn validate_templates(options: &OrganizeOptions) -> Result<(), OrganizeError> {
    let mut checks: Vec<(&str, &str, &[ContentType])> = Vec::new();
    // Folders are always named after the base title
    if options.create_folder_per_game {
        checks.push(("folder", options.folder_name_template.as_str(), &[ContentType::Base]));
    }
    if options.rename_files {
        checks.push((
            "file",
            options.file_name_template.as_str(),
            &[ContentType::Base, ContentType::Update, ContentType::AddOn],
        ));
    }

    for (label, template, content_types) in checks {
        for &content_type in content_types {
            for (region, version_txt, dlc_name) in [("", "", ""), ("US", "1.0.0", "Probe Pack")] {
                let fields = TemplateFields {
                    title_name: "Probe Title",
                    title_id: TitleId::new(0x0100_0000_0000_0000),
                    version: 0,
                    version_txt,
                    region,
                    content_type,
                    dlc_name: if content_type == ContentType::AddOn {
                        dlc_name
                    } else {
                        ""
                    },
                };
                let rendered = render(template, &fields, options.switch_safe_file_names);
                if !is_usable_name(&rendered) {
                    return Err(OrganizeError::invalid_template(format!(
                        "{} template {:?} renders an empty name for {} content",
                        label,
                        template,
                        content_type.tag()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// A file to move or rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub file: FileId,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// An old update file to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub file: FileId,
    pub path: PathBuf,
    pub title_id: TitleId,
    pub version: u32,
}

/// Everything an organize run will do.
#[derive(Debug, Clone, Default)]
pub struct OrganizePlan {
    pub root: PathBuf,
    pub deletions: Vec<PlannedDeletion>,
    pub moves: Vec<PlannedMove>,
    pub already_in_place: Vec<PathBuf>,
    /// Targets that are taken, with the source that wanted them
    pub conflicts: Vec<(PathBuf, PathBuf)>,
    /// Split sets, which are never moved
    pub skipped_split: Vec<PathBuf>,
    pub delete_empty_folders: bool,
}

impl OrganizePlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.moves.is_empty() && !self.delete_empty_folders
    }
}

/// Summary of an executed plan.
#[derive(Debug, Clone, Default)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub already_in_place: usize,
    pub deleted: usize,
    pub folders_removed: usize,
    pub skipped_split: usize,
    pub conflicts: Vec<String>,
    pub errors: Vec<String>,
}

/// Work out an organize run for the library below `root`.
///
/// Fails with [`OrganizeError::InvalidTemplate`] before looking at any file
/// when an enabled template can render an empty name.
pub fn plan_organize(
    root: &Path,
    catalog: &LocalCatalog,
    remote: Option<&RemoteCatalog>,
    options: &OrganizeOptions,
) -> Result<OrganizePlan, OrganizeError> {
    validate_templates(options)?;

    let mut plan = OrganizePlan {
        root: root.to_path_buf(),
        delete_empty_folders: options.delete_empty_folders,
        ..Default::default()
    };

    let mut doomed: HashSet<FileId> = HashSet::new();
    if options.delete_old_update_files {
        for family in catalog.families().values() {
            for deletion in stale_updates(catalog, family) {
                doomed.insert(deletion.file);
                plan.deletions.push(deletion);
            }
        }
    }

    if !options.moves_files() {
        return Ok(plan);
    }

    let mut claimed: HashSet<FileId> = doomed;
    let mut targets: HashMap<PathBuf, PathBuf> = HashMap::new();

    // BTreeMap order: a multi-content file goes with the lowest base id
    for family in catalog.families().values().filter(|f| f.has_base()) {
        let title_name = family_title(catalog, remote, family, options.switch_safe_file_names);
        let region = remote
            .and_then(|r| r.get(family.base_id))
            .and_then(|e| e.title.region.clone())
            .unwrap_or_default();

        for record in family.records() {
            if !claimed.insert(record.file) {
                continue;
            }
            let Some(file) = catalog.file(record.file) else {
                continue;
            };
            let source = file.path();
            if file.is_split() {
                plan.skipped_split.push(source);
                continue;
            }

            let folder = if options.create_folder_per_game {
                let fields = folder_fields(family, &title_name, &region);
                root.join(render(
                    &options.folder_name_template,
                    &fields,
                    options.switch_safe_file_names,
                ))
            } else {
                file.folder.clone()
            };

            let file_name = if options.rename_files && !file.is_multi_content() {
                let dlc_name = addon_name(remote, record, &title_name);
                let fields = TemplateFields {
                    title_name: &title_name,
                    title_id: record.title_id,
                    version: record.version,
                    version_txt: record.display_version.as_deref().unwrap_or(""),
                    region: &region,
                    content_type: record.content_type(),
                    dlc_name: &dlc_name,
                };
                let stem = render(
                    &options.file_name_template,
                    &fields,
                    options.switch_safe_file_names,
                );
                format!("{}.{}", stem, file.extension())
            } else {
                file.file_name.clone()
            };

            let target = folder.join(file_name);
            if target == source {
                plan.already_in_place.push(source);
                continue;
            }
            if target.exists() || targets.contains_key(&target) {
                log::debug!(
                    "Conflict: {} -> {} is taken",
                    source.display(),
                    target.display()
                );
                plan.conflicts.push((source, target));
                continue;
            }
            targets.insert(target.clone(), source.clone());
            plan.moves.push(PlannedMove {
                file: record.file,
                source,
                target,
            });
        }
    }

    Ok(plan)
}

/// Update files of a family that a cleanup removes: every update except the
/// newest, as long as it sits alone in a plain container.
fn stale_updates(catalog: &LocalCatalog, family: &TitleFamily) -> Vec<PlannedDeletion> {
    if family.updates.len() < 2 {
        return Vec::new();
    }
    let Some(latest) = family.latest_update() else {
        return Vec::new();
    };
    family
        .updates
        .iter()
        .filter(|u| u.file != latest.file)
        .filter_map(|u| {
            let file = catalog.file(u.file)?;
            if file.is_split() || file.is_multi_content() {
                return None;
            }
            Some(PlannedDeletion {
                file: u.file,
                path: file.path(),
                title_id: u.title_id,
                version: u.version,
            })
        })
        .collect()
}

/// Title name for a family: the catalog's name when known, else the local one,
/// else the base id.
fn family_title(
    catalog: &LocalCatalog,
    remote: Option<&RemoteCatalog>,
    family: &TitleFamily,
    switch_safe: bool,
) -> String {
    let name = remote
        .and_then(|r| r.name_of(family.base_id))
        .map(str::to_string)
        .unwrap_or_else(|| catalog.family_name(family));
    if is_usable_name(&sanitize(&name, switch_safe)) {
        name
    } else {
        family.base_id.to_string()
    }
}

fn folder_fields<'a>(
    family: &'a TitleFamily,
    title_name: &'a str,
    region: &'a str,
) -> TemplateFields<'a> {
    let base = family.base.as_ref();
    TemplateFields {
        title_name,
        title_id: family.base_id,
        version: base.map(|b| b.version).unwrap_or(0),
        version_txt: base.and_then(|b| b.display_version.as_deref()).unwrap_or(""),
        region,
        content_type: ContentType::Base,
        dlc_name: "",
    }
}

/// Add-on name with the title name prefix removed; empty for other content
/// and for add-ons nobody has a name for.
fn addon_name(remote: Option<&RemoteCatalog>, record: &ContentRecord, title_name: &str) -> String {
    if record.content_type() != ContentType::AddOn {
        return String::new();
    }
    let Some(name) = remote
        .and_then(|r| r.name_of(record.title_id))
        .or_else(|| record.names.resolve(Language::AmericanEnglish))
    else {
        return String::new();
    };
    let short = name
        .strip_prefix(title_name)
        .unwrap_or(name)
        .trim_start_matches([' ', '-', ':', '–'])
        .trim();
    if short.is_empty() {
        name.trim().to_string()
    } else {
        short.to_string()
    }
}

/// Apply a plan: deletions, then moves, then empty-folder removal.
///
/// Per-file failures and conflicts are collected in the summary; the
/// catalog is updated for every file that was actually moved or deleted.
pub fn execute_organize(
    plan: &OrganizePlan,
    catalog: &mut LocalCatalog,
    progress: &dyn ProgressSink,
) -> OrganizeSummary {
    let mut summary = OrganizeSummary {
        already_in_place: plan.already_in_place.len(),
        skipped_split: plan.skipped_split.len(),
        conflicts: plan
            .conflicts
            .iter()
            .map(|(_, target)| OrganizeError::DestinationConflict(target.clone()).to_string())
            .collect(),
        ..Default::default()
    };
    let total = plan.deletions.len() + plan.moves.len();
    let mut done = 0;

    for deletion in &plan.deletions {
        done += 1;
        progress.report(done, total, &display_name(&deletion.path));
        match fs::remove_file(&deletion.path) {
            Ok(()) => {
                log::info!(
                    "Deleted old update {} v{}: {}",
                    deletion.title_id,
                    deletion.version,
                    deletion.path.display()
                );
                catalog.remove_file(deletion.file);
                summary.deleted += 1;
            }
            Err(e) => summary.errors.push(format!(
                "Failed to delete {}: {}",
                deletion.path.display(),
                e
            )),
        }
    }

    for planned in &plan.moves {
        done += 1;
        progress.report(done, total, &display_name(&planned.source));
        if planned.target.exists() {
            summary
                .conflicts
                .push(OrganizeError::DestinationConflict(planned.target.clone()).to_string());
            continue;
        }
        match move_file(&planned.source, &planned.target) {
            Ok(()) => {
                log::debug!(
                    "Moved {} -> {}",
                    planned.source.display(),
                    planned.target.display()
                );
                let folder = planned
                    .target
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                catalog.relocate(planned.file, folder, display_name(&planned.target));
                summary.moved += 1;
            }
            Err(e) => summary.errors.push(format!(
                "Failed to move {} -> {}: {}",
                planned.source.display(),
                planned.target.display(),
                e
            )),
        }
    }

    if plan.delete_empty_folders {
        summary.folders_removed = remove_empty_folders(&plan.root, &mut summary.errors);
    }

    summary
}

/// Validate, plan and execute in one call.
pub fn organize(
    root: &Path,
    catalog: &mut LocalCatalog,
    remote: Option<&RemoteCatalog>,
    options: &OrganizeOptions,
    progress: &dyn ProgressSink,
) -> Result<OrganizeSummary, OrganizeError> {
    let plan = plan_organize(root, catalog, remote, options)?;
    Ok(execute_organize(&plan, catalog, progress))
}

fn move_file(source: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(source, target)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Remove empty directories below `root`, deepest first. `root` itself is kept.
///
/// Symlinked directories are neither followed nor removed. A folder that
/// cannot be read or removed is recorded in `errors` and the pass continues.
fn remove_empty_folders(root: &Path, errors: &mut Vec<String>) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not read {}: {}", root.display(), e);
            errors.push(format!("Failed to read folder {}: {}", root.display(), e));
            return 0;
        }
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| fs::symlink_metadata(p).is_ok_and(|m| m.is_dir()))
        .collect();
    dirs.sort();

    let mut removed = 0;
    for dir in dirs {
        removed += remove_empty_folders(&dir, errors);
        let empty = match fs::read_dir(&dir) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                errors.push(format!("Failed to read folder {}: {}", dir.display(), e));
                continue;
            }
        };
        if !empty {
            continue;
        }
        match fs::remove_dir(&dir) {
            Ok(()) => removed += 1,
            Err(e) => {
                log::warn!("Could not remove {}: {}", dir.display(), e);
                errors.push(format!("Failed to remove folder {}: {}", dir.display(), e));
            }
        }
    }
    removed
}

#[cfg(test)]
#[path = "tests/organize_tests.rs"]
mod tests;
