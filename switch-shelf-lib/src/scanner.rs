//! Directory scanner for container files.
//!
//! Produces one [`Candidate`] per logical container. Numbered split volumes
//! (`Game.nsp.00`, `Game.xc0`, or a `Game.nsp/` folder holding `00`, `01`,
//! ...) are grouped into a single candidate with their volumes in order.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use switch_shelf_core::{ContainerFormat, SplitVolume};

/// A logical container found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path naming the container (the set name for split volumes)
    pub path: PathBuf,
    /// Physical files in volume order (one for plain files)
    pub volumes: Vec<PathBuf>,
    pub format: ContainerFormat,
    pub split: bool,
}

impl Candidate {
    pub fn volume_refs(&self) -> Vec<&Path> {
        self.volumes.iter().map(PathBuf::as_path).collect()
    }
}

/// Build the extension set from a parser's file_extensions().
pub fn extension_set(extensions: &[&str]) -> HashSet<String> {
    extensions.iter().map(|e| e.to_lowercase()).collect()
}

/// Collect candidates below `folders`, sorted by path.
///
/// Hidden entries (leading `.`) are skipped. Folders that cannot be read are
/// logged and skipped.
pub fn collect_candidates(
    folders: &[PathBuf],
    recursive: bool,
    extensions: &HashSet<String>,
) -> Vec<Candidate> {
    let mut singles: Vec<Candidate> = Vec::new();
    let mut split_sets: BTreeMap<PathBuf, Vec<(u32, PathBuf, Option<ContainerFormat>)>> =
        BTreeMap::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();

    for folder in folders {
        walk(
            folder,
            recursive,
            extensions,
            &mut visited,
            &mut singles,
            &mut split_sets,
        );
    }

    for (logical, mut volumes) in split_sets {
        volumes.sort_by_key(|(index, _, _)| *index);
        let format = volumes
            .iter()
            .find_map(|(_, _, f)| *f)
            .unwrap_or(ContainerFormat::Nsp);
        singles.push(Candidate {
            path: logical,
            volumes: volumes.into_iter().map(|(_, p, _)| p).collect(),
            format,
            split: true,
        });
    }

    singles.sort_by(|a, b| a.path.cmp(&b.path));
    singles.dedup_by(|a, b| a.path == b.path);
    singles
}

fn walk(
    dir: &Path,
    recursive: bool,
    extensions: &HashSet<String>,
    visited: &mut HashSet<PathBuf>,
    singles: &mut Vec<Candidate>,
    split_sets: &mut BTreeMap<PathBuf, Vec<(u32, PathBuf, Option<ContainerFormat>)>>,
) {
    if !visited.insert(dir.to_path_buf()) {
        return;
    }
    let mut dir_entries: Vec<fs::DirEntry> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().collect(),
        Err(e) => {
            log::warn!("Cannot read {}: {}", dir.display(), e);
            return;
        }
    };
    dir_entries.sort_by_key(|e| e.path());

    for entry in &dir_entries {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if is_split_folder(&path) {
                for volume in folder_volumes(&path) {
                    add_volume(split_sets, volume.0, volume.1);
                }
            } else if recursive {
                walk(&path, recursive, extensions, visited, singles, split_sets);
            }
            continue;
        }
        if !path.is_file() {
            continue;
        }

        if let Some(volume) = SplitVolume::from_path(&path) {
            add_volume(split_sets, volume, path);
            continue;
        }
        if !has_matching_extension(&path, extensions) {
            continue;
        }
        if let Some(format) = ContainerFormat::from_path(&path) {
            singles.push(Candidate {
                volumes: vec![path.clone()],
                path,
                format,
                split: false,
            });
        }
    }
}

fn add_volume(
    split_sets: &mut BTreeMap<PathBuf, Vec<(u32, PathBuf, Option<ContainerFormat>)>>,
    volume: SplitVolume,
    path: PathBuf,
) {
    split_sets
        .entry(volume.logical)
        .or_default()
        .push((volume.index, path, volume.format));
}

/// A folder named like a container (`Game.nsp`) whose files are numbered volumes.
fn is_split_folder(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ContainerFormat::from_extension)
        .is_some()
        && !folder_volumes(path).is_empty()
}

fn folder_volumes(path: &Path) -> Vec<(SplitVolume, PathBuf)> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    let mut volumes: Vec<(SplitVolume, PathBuf)> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|p| SplitVolume::from_path(&p).map(|v| (v, p)))
        .collect();
    volumes.sort_by_key(|(v, _)| v.index);
    volumes
}

/// Check if a path has an extension in the allowed set.
fn has_matching_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switch_shelf_core::CONTAINER_EXTENSIONS;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn names(candidates: &[Candidate], root: &Path) -> Vec<String> {
        candidates
            .iter()
            .map(|c| c.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_flat_scan_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("b.nsp"));
        touch(&root.join("A.XCI"));
        touch(&root.join("notes.txt"));
        touch(&root.join(".hidden.nsp"));
        touch(&root.join("sub/c.nsz"));

        let exts = extension_set(CONTAINER_EXTENSIONS);
        let found = collect_candidates(&[root.to_path_buf()], false, &exts);
        assert_eq!(names(&found, root), vec!["A.XCI", "b.nsp"]);
        assert_eq!(found[0].format, ContainerFormat::Xci);

        let found = collect_candidates(&[root.to_path_buf()], true, &exts);
        assert_eq!(names(&found, root), vec!["A.XCI", "b.nsp", "sub/c.nsz"]);
    }

    #[test]
    fn test_split_sets_grouped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("Big.nsp.01"));
        touch(&root.join("Big.nsp.00"));
        touch(&root.join("Card.xc0"));
        touch(&root.join("Card.xc1"));
        touch(&root.join("Folder.nsp/00"));
        touch(&root.join("Folder.nsp/01"));

        let exts = extension_set(CONTAINER_EXTENSIONS);
        let found = collect_candidates(&[root.to_path_buf()], false, &exts);
        assert_eq!(names(&found, root), vec!["Big.nsp", "Card.xci", "Folder.nsp"]);
        assert!(found.iter().all(|c| c.split && c.volumes.len() == 2));
        assert!(found[0].volumes[0].ends_with("Big.nsp.00"));
        assert_eq!(found[1].format, ContainerFormat::Xci);
    }

    #[test]
    fn test_missing_folder_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let exts = extension_set(CONTAINER_EXTENSIONS);
        let found = collect_candidates(&[tmp.path().join("nope")], true, &exts);
        assert!(found.is_empty());
    }
}
