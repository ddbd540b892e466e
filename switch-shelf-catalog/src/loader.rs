use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use switch_shelf_core::ProgressSink;

use crate::error::CatalogError;
use crate::fetch::{self, DEFAULT_TIMEOUT, FetchSource};
use crate::titledb::RemoteCatalog;

pub const TITLES_FILE: &str = "titles.json";
pub const VERSIONS_FILE: &str = "versions.json";

/// Where to fetch the two catalog documents and the ETags stored last time.
#[derive(Debug, Clone, Default)]
pub struct CatalogSources {
    pub titles_url: String,
    pub versions_url: String,
    pub titles_etag: Option<String>,
    pub versions_etag: Option<String>,
}

/// Result of a successful refresh. The caller persists the ETags.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub titles_etag: Option<String>,
    pub versions_etag: Option<String>,
    /// At least one document came from the local copy after a failed request
    pub offline: bool,
    pub title_count: usize,
}

/// Get the default directory for downloaded catalog documents.
pub fn default_data_dir() -> Result<PathBuf, CatalogError> {
    let base = dirs::cache_dir()
        .ok_or_else(|| CatalogError::unavailable("Could not determine cache directory", false))?;
    Ok(base.join("switch-shelf"))
}

/// Loads the remote catalog and keeps the last one that decoded successfully.
pub struct RemoteCatalogLoader {
    data_dir: PathBuf,
    timeout: Duration,
    current: Option<RemoteCatalog>,
}

impl RemoteCatalogLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            current: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The last successfully loaded catalog, if any.
    pub fn catalog(&self) -> Option<&RemoteCatalog> {
        self.current.as_ref()
    }

    /// Download (conditionally) and decode both documents.
    ///
    /// New bodies replace the on-disk copies only after both decode. On any
    /// error the previously loaded catalog stays in place, in memory and on
    /// disk.
    pub fn refresh(
        &mut self,
        sources: &CatalogSources,
        progress: &dyn ProgressSink,
    ) -> Result<RefreshOutcome, CatalogError> {
        let client = fetch::build_client(self.timeout)?;

        let titles_dest = self.data_dir.join(TITLES_FILE);
        let versions_dest = self.data_dir.join(VERSIONS_FILE);

        progress.report(1, 3, "Downloading titles.json");
        let titles = fetch::fetch_document(
            &client,
            &sources.titles_url,
            &titles_dest,
            sources.titles_etag.as_deref(),
        )?;

        progress.report(2, 3, "Downloading versions.json");
        let versions = match fetch::fetch_document(
            &client,
            &sources.versions_url,
            &versions_dest,
            sources.versions_etag.as_deref(),
        ) {
            Ok(v) => v,
            Err(e) => {
                titles.discard();
                return Err(e);
            }
        };

        progress.report(3, 3, "Processing titles and updates");
        let catalog = match decode_files(&titles.path, &versions.path) {
            Ok(c) => c,
            Err(e) => {
                titles.discard();
                versions.discard();
                return Err(e);
            }
        };
        titles.commit(&titles_dest)?;
        versions.commit(&versions_dest)?;
        let title_count = catalog.len();
        self.current = Some(catalog);

        Ok(RefreshOutcome {
            titles_etag: titles.etag,
            versions_etag: versions.etag,
            offline: titles.source == FetchSource::DiskFallback
                || versions.source == FetchSource::DiskFallback,
            title_count,
        })
    }

    /// Decode the documents already on disk without touching the network.
    pub fn load_local(&mut self) -> Result<usize, CatalogError> {
        let titles = self.data_dir.join(TITLES_FILE);
        let versions = self.data_dir.join(VERSIONS_FILE);
        if !titles.is_file() || !versions.is_file() {
            return Err(CatalogError::unavailable(
                format!("no local catalog in {}", self.data_dir.display()),
                false,
            ));
        }
        let catalog = decode_files(&titles, &versions)?;
        let count = catalog.len();
        self.current = Some(catalog);
        Ok(count)
    }
}

fn decode_files(titles: &Path, versions: &Path) -> Result<RemoteCatalog, CatalogError> {
    let titles = fs::read(titles)?;
    let versions = fs::read(versions)?;
    RemoteCatalog::from_json(&titles, &versions)
}
