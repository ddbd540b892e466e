//! Library overview: one row per title held with its base, plus issues.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use switch_shelf_catalog::RemoteCatalog;
use switch_shelf_core::TitleId;

use crate::local::{LocalCatalog, TitleFamily};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryRow {
    pub title_id: TitleId,
    pub name: String,
    /// Version string from the control data of the newest content held
    pub display_version: Option<String>,
    /// Version number of the newest update, if any
    pub update_version: Option<u32>,
    pub region: Option<String>,
    pub icon_url: Option<String>,
    /// `split`, `multi-content` or the file extension
    pub type_label: String,
    pub path: PathBuf,
    pub addon_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryIssue {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryReport {
    /// Sorted by title id
    pub rows: Vec<LibraryRow>,
    pub issues: Vec<LibraryIssue>,
    pub num_files: usize,
}

/// Build the overview. `remote` fills in names, regions and icons when loaded.
pub fn build_report(local: &LocalCatalog, remote: Option<&RemoteCatalog>) -> LibraryReport {
    let mut report = LibraryReport {
        num_files: local.num_files(),
        ..Default::default()
    };

    // One issue per file, even when it holds several orphaned titles
    let mut orphan_paths = HashSet::new();
    for family in local.families().values() {
        match row_for(local, remote, family) {
            Some(row) => report.rows.push(row),
            None => {
                for record in family.records() {
                    let Some(file) = local.file(record.file) else {
                        continue;
                    };
                    let path = file.path();
                    if orphan_paths.insert(path.clone()) {
                        report.issues.push(LibraryIssue {
                            path,
                            reason: "base file is missing".to_string(),
                        });
                    }
                }
            }
        }
    }

    for skipped in local.skipped() {
        report.issues.push(LibraryIssue {
            path: skipped.path.clone(),
            reason: format!("{}: {}", skipped.kind, skipped.reason),
        });
    }
    report
}

fn row_for(
    local: &LocalCatalog,
    remote: Option<&RemoteCatalog>,
    family: &TitleFamily,
) -> Option<LibraryRow> {
    let base = family.base.as_ref()?;
    let file = local.file(base.file)?;
    let entry = remote.and_then(|r| r.get(family.base_id));
    let latest = family.latest_update();

    let type_label = if family.split {
        "split".to_string()
    } else if family.multi_content {
        "multi-content".to_string()
    } else {
        file.extension()
    };

    Some(LibraryRow {
        title_id: family.base_id,
        name: remote
            .and_then(|r| r.name_of(family.base_id))
            .map(str::to_string)
            .unwrap_or_else(|| local.family_name(family)),
        display_version: latest
            .and_then(|u| u.display_version.clone())
            .or_else(|| base.display_version.clone()),
        update_version: latest.map(|u| u.version),
        region: entry.and_then(|e| e.title.region.clone()),
        icon_url: entry.and_then(|e| e.title.icon_url.clone()),
        type_label,
        path: file.path(),
        addon_count: family.addons.len(),
    })
}
