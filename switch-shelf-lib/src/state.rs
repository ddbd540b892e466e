//! The library context object.
//!
//! [`LibraryState`] owns everything an operation needs: settings, the local
//! catalog from the last scan, the remote catalog loader and the scan cache
//! location. Front ends create one and pass it to every call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use switch_shelf_catalog::{
    CatalogSources, RefreshOutcome, RemoteCatalog, RemoteCatalogLoader, RemoteTitle,
    default_data_dir,
};
use switch_shelf_core::{ContentParser, ProgressSink, TitleId};

use crate::builder::{self, ScanOptions};
use crate::cache::{self, ScanCache};
use crate::error::LibraryError;
use crate::gaps::{self, IncompleteTitle};
use crate::local::LocalCatalog;
use crate::organize::{self, OrganizePlan, OrganizeSummary};
use crate::report::{self, LibraryReport};
use crate::settings::{self, AppSettings};

/// Counters from the last scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub files_seen: usize,
    pub parser_invocations: usize,
    pub cache_hits: usize,
    pub families: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

pub struct LibraryState {
    pub settings: AppSettings,
    settings_path: PathBuf,
    cache_path: PathBuf,
    /// Library root for this session only; never saved
    folder_override: Option<PathBuf>,
    local: Option<LocalCatalog>,
    remote: RemoteCatalogLoader,
}

impl LibraryState {
    /// Open with explicit file locations (settings file, scan cache file and
    /// catalog download folder).
    pub fn open(settings_path: PathBuf, cache_path: PathBuf, data_dir: PathBuf) -> Self {
        let settings = AppSettings::load_from(&settings_path);
        Self {
            settings,
            settings_path,
            cache_path,
            folder_override: None,
            local: None,
            remote: RemoteCatalogLoader::new(data_dir),
        }
    }

    /// Open with the standard per-user locations.
    pub fn open_default() -> Result<Self, LibraryError> {
        Ok(Self::open(
            settings::settings_path(),
            cache::default_cache_path()?,
            default_data_dir()?,
        ))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Folder holding the downloaded catalog documents.
    pub fn catalog_dir(&self) -> &Path {
        self.remote.data_dir()
    }

    pub fn save_settings(&self) -> Result<(), LibraryError> {
        self.settings.save_to(&self.settings_path)?;
        Ok(())
    }

    pub fn local(&self) -> Option<&LocalCatalog> {
        self.local.as_ref()
    }

    pub fn remote(&self) -> Option<&RemoteCatalog> {
        self.remote.catalog()
    }

    fn require_local(&self) -> Result<&LocalCatalog, LibraryError> {
        self.local
            .as_ref()
            .ok_or_else(|| LibraryError::not_loaded("The library has not been scanned"))
    }

    fn require_remote(&self) -> Result<&RemoteCatalog, LibraryError> {
        self.remote
            .catalog()
            .ok_or_else(|| LibraryError::not_loaded("The title catalog is not loaded"))
    }

    /// Use `folder` as the library root without touching the saved settings.
    pub fn set_folder_override(&mut self, folder: PathBuf) {
        self.folder_override = Some(folder);
    }

    /// The library root: the session override, else the saved folder.
    pub fn library_folder(&self) -> Option<&Path> {
        self.folder_override
            .as_deref()
            .or(self.settings.folder.as_deref())
    }

    fn library_root(&self) -> Result<PathBuf, LibraryError> {
        self.library_folder()
            .map(Path::to_path_buf)
            .ok_or(LibraryError::NoLibraryFolder)
    }

    pub fn scan_options(&self, force: bool) -> Result<ScanOptions, LibraryError> {
        let folders = match &self.folder_override {
            Some(folder) => vec![folder.clone()],
            None => self.settings.all_scan_folders(),
        };
        if folders.is_empty() {
            return Err(LibraryError::NoLibraryFolder);
        }
        Ok(ScanOptions {
            recursive: self.settings.scan_recursively,
            force,
            ..ScanOptions::new(folders)
        })
    }

    /// Scan the configured folders and replace the local catalog.
    ///
    /// The scan cache is loaded first (a damaged cache means a full rescan)
    /// and saved afterwards, also after a cancelled scan.
    pub fn scan(
        &mut self,
        parser: Arc<dyn ContentParser>,
        force: bool,
        progress: &dyn ProgressSink,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ScanStats, LibraryError> {
        let options = self.scan_options(force)?;
        let mut cache = ScanCache::load_or_reset(&self.cache_path);
        let outcome = builder::scan_blocking(&options, parser, &mut cache, progress, cancel)?;
        if let Err(e) = cache.save(&self.cache_path) {
            log::warn!("Could not save the scan cache: {e}");
        }

        let stats = ScanStats {
            files_seen: outcome.files_seen,
            parser_invocations: outcome.parser_invocations,
            cache_hits: outcome.cache_hits,
            families: outcome.catalog.families().len(),
            skipped: outcome.catalog.skipped().len(),
            cancelled: outcome.cancelled,
        };
        self.local = Some(outcome.catalog);
        Ok(stats)
    }

    /// Fetch the remote catalog, storing the new ETags in the settings.
    pub fn refresh_catalog(
        &mut self,
        progress: &dyn ProgressSink,
    ) -> Result<RefreshOutcome, LibraryError> {
        let sources = CatalogSources {
            titles_url: self.settings.titles_json_url.clone(),
            versions_url: self.settings.versions_json_url.clone(),
            titles_etag: self.settings.titles_etag.clone(),
            versions_etag: self.settings.versions_etag.clone(),
        };
        let outcome = self.remote.refresh(&sources, progress)?;

        if outcome.titles_etag != self.settings.titles_etag
            || outcome.versions_etag != self.settings.versions_etag
        {
            self.settings.titles_etag = outcome.titles_etag.clone();
            self.settings.versions_etag = outcome.versions_etag.clone();
            if let Err(e) = self.save_settings() {
                log::warn!("Could not store catalog ETags: {e}");
            }
        }
        Ok(outcome)
    }

    /// Decode the previously downloaded catalog without network access.
    pub fn load_catalog(&mut self) -> Result<usize, LibraryError> {
        Ok(self.remote.load_local()?)
    }

    pub fn report(&self) -> Result<LibraryReport, LibraryError> {
        Ok(report::build_report(self.require_local()?, self.remote()))
    }

    pub fn missing_games(&self) -> Result<HashMap<TitleId, RemoteTitle>, LibraryError> {
        Ok(gaps::missing_games(
            self.require_local()?,
            self.require_remote()?,
            self.settings.hide_demo_games,
        ))
    }

    pub fn missing_updates(&self) -> Result<HashMap<TitleId, IncompleteTitle>, LibraryError> {
        Ok(gaps::missing_updates(
            self.require_local()?,
            self.require_remote()?,
            &self.settings.ignored_update_ids(),
            self.settings.ignore_dlc_updates,
        ))
    }

    pub fn missing_dlc(&self) -> Result<HashMap<TitleId, IncompleteTitle>, LibraryError> {
        Ok(gaps::missing_dlc(
            self.require_local()?,
            self.require_remote()?,
            &self.settings.ignored_dlc_ids(),
        ))
    }

    /// Plan an organize run of the library folder with the saved options.
    pub fn plan_organize(&self) -> Result<OrganizePlan, LibraryError> {
        let root = self.library_root()?;
        Ok(organize::plan_organize(
            &root,
            self.require_local()?,
            self.remote(),
            &self.settings.organize,
        )?)
    }

    /// Apply a plan and move the scan cache entries along with the files.
    pub fn execute_organize(
        &mut self,
        plan: &OrganizePlan,
        progress: &dyn ProgressSink,
    ) -> Result<OrganizeSummary, LibraryError> {
        let local = self
            .local
            .as_mut()
            .ok_or_else(|| LibraryError::not_loaded("The library has not been scanned"))?;
        let summary = organize::execute_organize(plan, local, progress);

        let mut cache = ScanCache::load_or_reset(&self.cache_path);
        for deletion in &plan.deletions {
            if !deletion.path.exists() {
                cache.remove(&deletion.path);
            }
        }
        for planned in &plan.moves {
            if !planned.source.exists() && planned.target.exists() {
                cache.rename_path(&planned.source, planned.target.clone());
            }
        }
        if let Err(e) = cache.save(&self.cache_path) {
            log::warn!("Could not save the scan cache: {e}");
        }
        Ok(summary)
    }

    pub fn organize(&mut self, progress: &dyn ProgressSink) -> Result<OrganizeSummary, LibraryError> {
        let plan = self.plan_organize()?;
        self.execute_organize(&plan, progress)
    }

    /// Delete the scan cache file so the next scan decodes everything.
    pub fn clear_cache(&self) -> Result<(), LibraryError> {
        match std::fs::remove_file(&self.cache_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
