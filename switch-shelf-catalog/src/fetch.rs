//! Conditional download of one catalog document.
//!
//! A stored ETag is sent as `If-None-Match` only while the on-disk copy it
//! describes still exists. When the server cannot be reached, the on-disk
//! copy stands in for the download.
//!
//! A fresh body is staged next to the destination and only replaces it on
//! [`FetchOutcome::commit`], so the caller can validate it first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_NONE_MATCH};

use crate::error::CatalogError;

/// Request timeout applied to every catalog download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the document returned by [`fetch_document`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fresh body staged next to the destination
    Downloaded,
    /// Server answered 304; the on-disk copy is current
    NotModified,
    /// Server unreachable or failing; the on-disk copy was used instead
    DiskFallback,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// File holding the document: the staged body or the on-disk copy
    pub path: PathBuf,
    /// ETag to store for the next request
    pub etag: Option<String>,
    pub source: FetchSource,
}

impl FetchOutcome {
    /// Move a staged download over `dest`. No-op for on-disk copies.
    pub fn commit(&self, dest: &Path) -> Result<(), CatalogError> {
        if self.source == FetchSource::Downloaded && self.path != dest {
            fs::rename(&self.path, dest)?;
        }
        Ok(())
    }

    /// Drop a staged download, leaving the on-disk copy untouched.
    pub fn discard(&self) {
        if self.source != FetchSource::Downloaded {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            log::debug!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

/// Path a fresh download of `dest` is staged at.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

pub fn build_client(timeout: Duration) -> Result<Client, CatalogError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("switch-shelf/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Fetch `url` for `dest`, honoring `etag`. A downloaded body is staged and
/// must be committed to replace `dest`.
pub fn fetch_document(
    client: &Client,
    url: &str,
    dest: &Path,
    etag: Option<&str>,
) -> Result<FetchOutcome, CatalogError> {
    let have_copy = dest.is_file();
    let etag = etag.filter(|e| !e.is_empty());

    let mut request = client.get(url);
    if let (true, Some(tag)) = (have_copy, etag) {
        request = request.header(IF_NONE_MATCH, tag);
    }

    let response = match request.send() {
        Ok(r) => r,
        Err(e) => {
            let retryable = e.is_timeout() || e.is_connect() || e.is_request();
            return fall_back(dest, etag, format!("{url}: {e}"), retryable);
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
        if have_copy {
            log::debug!("{url} not modified");
            return Ok(FetchOutcome {
                path: dest.to_path_buf(),
                etag: etag.map(str::to_string),
                source: FetchSource::NotModified,
            });
        }
        return Err(CatalogError::unavailable(
            format!("{url}: 304 without a local copy"),
            false,
        ));
    }
    if !status.is_success() {
        let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
        return fall_back(dest, etag, format!("HTTP {status} for {url}"), retryable);
    }

    let new_etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = match response.bytes() {
        Ok(b) => b,
        Err(e) => return fall_back(dest, etag, format!("{url}: {e}"), true),
    };

    let staged = staging_path(dest);
    write_staged(&staged, &body)?;
    log::info!("Downloaded {} ({} bytes)", url, body.len());
    Ok(FetchOutcome {
        path: staged,
        etag: new_etag,
        source: FetchSource::Downloaded,
    })
}

fn fall_back(
    dest: &Path,
    etag: Option<&str>,
    reason: String,
    retryable: bool,
) -> Result<FetchOutcome, CatalogError> {
    if dest.is_file() {
        log::warn!("{reason}; using local copy {}", dest.display());
        return Ok(FetchOutcome {
            path: dest.to_path_buf(),
            etag: etag.map(str::to_string),
            source: FetchSource::DiskFallback,
        });
    }
    Err(CatalogError::unavailable(reason, retryable))
}

fn write_staged(staged: &Path, data: &[u8]) -> Result<(), CatalogError> {
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(staged, data)?;
    Ok(())
}
