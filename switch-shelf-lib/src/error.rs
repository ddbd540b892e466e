use std::path::PathBuf;

use switch_shelf_catalog::CatalogError;
use thiserror::Error;

/// Errors from the persisted scan cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but cannot be decoded or has another version
    #[error("Scan cache is corrupt: {0}")]
    CacheCorrupt(String),

    /// The platform has no per-user cache directory
    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CacheCorrupt(msg.into())
    }
}

/// Errors from planning or executing an organize run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// A template renders to an empty folder or file name
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// The destination path is already taken
    #[error("Destination already exists: {}", .0.display())]
    DestinationConflict(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrganizeError {
    pub fn invalid_template(msg: impl Into<String>) -> Self {
        Self::InvalidTemplate(msg.into())
    }
}

/// Errors surfaced by [`LibraryState`](crate::LibraryState) operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An operation needs data that has not been loaded yet
    #[error("{0}")]
    NotLoaded(String),

    /// No library folder is configured
    #[error("No library folder configured")]
    NoLibraryFolder,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LibraryError {
    pub fn not_loaded(msg: impl Into<String>) -> Self {
        Self::NotLoaded(msg.into())
    }
}
