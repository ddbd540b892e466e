//! Persisted scan cache.
//!
//! Maps each container path to the fingerprint it had when last decoded and
//! the outcome of that decode. An unchanged fingerprint lets a rescan reuse
//! the outcome without opening the file.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use switch_shelf_core::{DecodedContent, FailureKind};

use crate::error::CacheError;

/// Cache format version. Bump this when the entry layout changes so stale
/// caches are discarded instead of misread.
pub const SCAN_CACHE_VERSION: u32 = 1;

const CACHE_FILE: &str = "scan-cache.json";

/// Size and modification time of a container (all volumes for split sets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

impl Fingerprint {
    /// Fingerprint a set of volumes: summed size, newest modification time.
    pub fn of_files(paths: &[PathBuf]) -> std::io::Result<Fingerprint> {
        let mut size = 0;
        let mut newest: Option<(i64, u32)> = None;
        for path in paths {
            let meta = fs::metadata(path)?;
            size += meta.len();
            let mtime = match meta.modified()?.duration_since(UNIX_EPOCH) {
                Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
                Err(e) => (-(e.duration().as_secs() as i64), e.duration().subsec_nanos()),
            };
            newest = newest.max(Some(mtime));
        }
        let (mtime_secs, mtime_nanos) = newest.unwrap_or((0, 0));
        Ok(Fingerprint {
            size,
            mtime_secs,
            mtime_nanos,
        })
    }
}

/// What the last decode of a file produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CachedOutcome {
    Decoded { contents: Vec<DecodedContent> },
    Skipped { kind: FailureKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    pub outcome: CachedOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCache {
    version: u32,
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl Default for ScanCache {
    fn default() -> Self {
        Self {
            version: SCAN_CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Get the default scan cache location.
pub fn default_cache_path() -> Result<PathBuf, CacheError> {
    cache_path_under(dirs::cache_dir())
}

fn cache_path_under(base: Option<PathBuf>) -> Result<PathBuf, CacheError> {
    let base = base.ok_or(CacheError::NoCacheDir)?;
    Ok(base.join("switch-shelf").join(CACHE_FILE))
}

impl ScanCache {
    /// Load a cache file. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<ScanCache, CacheError> {
        if !path.exists() {
            return Ok(ScanCache::default());
        }
        let contents = fs::read_to_string(path)?;
        let cache: ScanCache = serde_json::from_str(&contents)
            .map_err(|e| CacheError::corrupt(format!("{}: {e}", path.display())))?;
        if cache.version != SCAN_CACHE_VERSION {
            return Err(CacheError::corrupt(format!(
                "{}: version {} (expected {})",
                path.display(),
                cache.version,
                SCAN_CACHE_VERSION
            )));
        }
        Ok(cache)
    }

    /// Load a cache file, discarding it when it cannot be used.
    pub fn load_or_reset(path: &Path) -> ScanCache {
        match Self::load(path) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("{e}; rebuilding the scan cache from scratch");
                ScanCache::default()
            }
        }
    }

    /// Write the cache atomically.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(self)
            .map_err(|e| CacheError::corrupt(format!("serialize: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Outcome recorded for `path`, if its fingerprint still matches.
    pub fn lookup(&self, path: &Path, fingerprint: &Fingerprint) -> Option<&CachedOutcome> {
        self.entries
            .get(path)
            .filter(|e| e.fingerprint == *fingerprint)
            .map(|e| &e.outcome)
    }

    /// Replace the entry for `path`.
    pub fn insert(&mut self, path: PathBuf, fingerprint: Fingerprint, outcome: CachedOutcome) {
        self.entries.insert(
            path,
            CacheEntry {
                fingerprint,
                outcome,
            },
        );
    }

    pub fn remove(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    /// Carry an entry over to a file's new location. Renames keep size and
    /// modification time, so the fingerprint stays valid.
    pub fn rename_path(&mut self, from: &Path, to: PathBuf) {
        if let Some(entry) = self.entries.remove(from) {
            self.entries.insert(to, entry);
        }
    }

    /// Drop entries whose path is not in `live`. Returns how many were dropped.
    pub fn retain_paths(&mut self, live: &HashSet<PathBuf>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| live.contains(path));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
