//! Remote title catalog: titledb downloads and decoding.

pub mod error;
pub mod fetch;
pub mod loader;
pub mod titledb;

pub use error::CatalogError;
pub use fetch::{FetchOutcome, FetchSource, fetch_document};
pub use loader::{CatalogSources, RefreshOutcome, RemoteCatalogLoader, default_data_dir};
pub use titledb::{RemoteCatalog, RemoteTitle, RemoteTitleEntry};
