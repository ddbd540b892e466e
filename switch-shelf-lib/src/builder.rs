//! Local catalog builder.
//!
//! Enumerates candidates, reuses scan cache outcomes for files whose
//! fingerprint is unchanged, decodes the rest on the [`WorkerPool`], and
//! files every decoded record into its title family. Results are merged in
//! candidate order once all workers are done, so the catalog does not
//! depend on worker timing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use switch_shelf_core::{
    ContainerKind, ContentParser, DecodedContent, FailureKind, ParseError, ProgressSink,
};

use crate::cache::{CachedOutcome, Fingerprint, ScanCache};
use crate::local::{ContainerFile, ContentRecord, LocalCatalog, SkippedFile};
use crate::scanner::{self, Candidate};
use crate::worker_pool::{WorkResult, WorkerPool};

/// Inputs of one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub folders: Vec<PathBuf>,
    pub recursive: bool,
    /// Decode every file even when the cache has a matching entry
    pub force: bool,
    /// Number of concurrent decodes
    pub workers: usize,
}

impl ScanOptions {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            recursive: true,
            force: false,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

/// Result of a scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub catalog: LocalCatalog,
    /// Candidates found on disk
    pub files_seen: usize,
    /// Decodes actually run (cache hits excluded)
    pub parser_invocations: usize,
    pub cache_hits: usize,
    /// The scan stopped early; the catalog only holds files finished before that
    pub cancelled: bool,
}

enum Resolved {
    Contents(Vec<DecodedContent>),
    Failed { kind: FailureKind, reason: String },
}

impl Resolved {
    fn from_cached(outcome: &CachedOutcome) -> Self {
        match outcome {
            CachedOutcome::Decoded { contents } => Self::Contents(contents.clone()),
            CachedOutcome::Skipped { kind, reason } => Self::Failed {
                kind: *kind,
                reason: reason.clone(),
            },
        }
    }

    fn from_parse(result: Result<Vec<DecodedContent>, ParseError>) -> Self {
        match result {
            Ok(contents) if contents.is_empty() => Self::Failed {
                kind: FailureKind::CorruptContainer,
                reason: "no content meta found".into(),
            },
            Ok(contents) => Self::Contents(contents),
            Err(e) => Self::Failed {
                kind: e.kind(),
                reason: e.to_string(),
            },
        }
    }

    /// Cache form of this outcome; transient failures are not cached.
    fn to_cached(&self) -> Option<CachedOutcome> {
        match self {
            Self::Contents(contents) => Some(CachedOutcome::Decoded {
                contents: contents.clone(),
            }),
            Self::Failed { kind, .. } if kind.is_transient() => None,
            Self::Failed { kind, reason } => Some(CachedOutcome::Skipped {
                kind: *kind,
                reason: reason.clone(),
            }),
        }
    }
}

fn candidate_label(candidate: &Candidate) -> String {
    candidate
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| candidate.path.display().to_string())
}

/// Scan `options.folders` and build a fresh [`LocalCatalog`].
///
/// `cache` is read for reuse and updated with every decode that finished.
/// Entries for paths no longer on disk are pruned only when the scan ran to
/// completion. Saving the cache is left to the caller.
pub async fn scan(
    options: &ScanOptions,
    parser: Arc<dyn ContentParser>,
    cache: &mut ScanCache,
    progress: &dyn ProgressSink,
    cancel: Option<Arc<AtomicBool>>,
) -> ScanOutcome {
    let extensions = scanner::extension_set(parser.file_extensions());
    let candidates = scanner::collect_candidates(&options.folders, options.recursive, &extensions);
    let total = candidates.len();
    log::info!("Found {} container files", total);

    let mut resolved: Vec<Option<Resolved>> = (0..total).map(|_| None).collect();
    let mut fingerprints: Vec<Option<Fingerprint>> = vec![None; total];
    let mut pending: Vec<usize> = Vec::new();
    let mut done = 0usize;
    let mut cache_hits = 0usize;

    for (i, candidate) in candidates.iter().enumerate() {
        match Fingerprint::of_files(&candidate.volumes) {
            Ok(fp) => {
                fingerprints[i] = Some(fp);
                let cached = if options.force {
                    None
                } else {
                    cache.lookup(&candidate.path, &fp)
                };
                match cached {
                    Some(outcome) => {
                        resolved[i] = Some(Resolved::from_cached(outcome));
                        cache_hits += 1;
                    }
                    None => {
                        pending.push(i);
                        continue;
                    }
                }
            }
            Err(e) => {
                resolved[i] = Some(Resolved::Failed {
                    kind: FailureKind::Unreadable,
                    reason: e.to_string(),
                });
            }
        }
        done += 1;
        progress.report(done, total, &candidate_label(candidate));
    }
    log::debug!("{} cache hits, {} files to decode", cache_hits, pending.len());

    let invocations = Arc::new(AtomicUsize::new(0));
    let mut cancelled = false;

    if !pending.is_empty() {
        let work: Vec<Vec<PathBuf>> = pending
            .iter()
            .map(|&i| candidates[i].volumes.clone())
            .collect();
        let pool_parser = parser.clone();
        let pool_invocations = invocations.clone();
        let mut pool = WorkerPool::start(
            options.workers,
            work,
            cancel.clone(),
            move |volumes: Vec<PathBuf>| {
                let parser = pool_parser.clone();
                let invocations = pool_invocations.clone();
                async move {
                    invocations.fetch_add(1, Ordering::Relaxed);
                    let joined = tokio::task::spawn_blocking(move || {
                        let refs: Vec<&Path> = volumes.iter().map(PathBuf::as_path).collect();
                        parser.parse(&refs)
                    })
                    .await;
                    match joined {
                        Ok(result) => result,
                        Err(e) => Err(ParseError::Io(std::io::Error::other(e.to_string()))),
                    }
                }
            },
        );

        while let Some((slot, result)) = pool.recv().await {
            let i = pending[slot];
            let candidate = &candidates[i];
            let outcome = match result {
                WorkResult::Done(parsed) => Resolved::from_parse(parsed),
                WorkResult::TimedOut => Resolved::Failed {
                    kind: FailureKind::Unreadable,
                    reason: "decode timed out".into(),
                },
                WorkResult::Cancelled => {
                    cancelled = true;
                    continue;
                }
            };

            if let Resolved::Failed { kind, reason } = &outcome {
                log::debug!("Skipping {}: {} ({})", candidate.path.display(), kind, reason);
            }
            if let Some(fp) = fingerprints[i] {
                match outcome.to_cached() {
                    Some(entry) => cache.insert(candidate.path.clone(), fp, entry),
                    None => cache.remove(&candidate.path),
                }
            }
            resolved[i] = Some(outcome);
            done += 1;
            progress.report(done, total, &candidate_label(candidate));
        }
    }

    if cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed)) && done < total {
        cancelled = true;
    }

    let catalog = merge(&candidates, resolved, &fingerprints);

    if cancelled {
        log::info!("Scan cancelled after {} of {} files", done, total);
    } else {
        let live = candidates.iter().map(|c| c.path.clone()).collect();
        let pruned = cache.retain_paths(&live);
        if pruned > 0 {
            log::debug!("Pruned {} stale scan cache entries", pruned);
        }
    }

    ScanOutcome {
        catalog,
        files_seen: total,
        parser_invocations: invocations.load(Ordering::Relaxed),
        cache_hits,
        cancelled,
    }
}

/// Blocking wrapper around [`scan`] on a current-thread runtime.
pub fn scan_blocking(
    options: &ScanOptions,
    parser: Arc<dyn ContentParser>,
    cache: &mut ScanCache,
    progress: &dyn ProgressSink,
    cancel: Option<Arc<AtomicBool>>,
) -> std::io::Result<ScanOutcome> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    Ok(rt.block_on(scan(options, parser, cache, progress, cancel)))
}

fn merge(
    candidates: &[Candidate],
    resolved: Vec<Option<Resolved>>,
    fingerprints: &[Option<Fingerprint>],
) -> LocalCatalog {
    let mut catalog = LocalCatalog::new();
    for ((candidate, outcome), fp) in candidates.iter().zip(resolved).zip(fingerprints) {
        match outcome {
            Some(Resolved::Contents(contents)) => {
                let file = ContainerFile {
                    folder: candidate
                        .path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default(),
                    file_name: candidate_label(candidate),
                    size: fp.map(|f| f.size).unwrap_or(0),
                    kind: ContainerKind::classify(candidate.split, contents.len()),
                    format: candidate.format,
                    volumes: if candidate.split {
                        candidate.volumes.clone()
                    } else {
                        Vec::new()
                    },
                };
                let id = catalog.add_file(file);
                for content in contents {
                    catalog.add_record(ContentRecord::from_decoded(content, id));
                }
            }
            Some(Resolved::Failed { kind, reason }) => catalog.add_skipped(SkippedFile {
                path: candidate.path.clone(),
                kind,
                reason,
            }),
            None => {}
        }
    }
    catalog
}

#[cfg(test)]
#[path = "tests/builder_tests.rs"]
mod tests;
