//! Library management for Nintendo Switch container collections.
//!
//! Scans folders into a [`LocalCatalog`], compares it with the remote title
//! catalog, and organizes the files on disk. [`LibraryState`] ties the
//! pieces together for front ends.

pub mod builder;
pub mod cache;
pub mod error;
pub mod gaps;
pub mod local;
pub mod organize;
pub mod report;
pub mod scanner;
pub mod settings;
pub mod state;
pub mod worker_pool;

pub use builder::{ScanOptions, ScanOutcome, scan, scan_blocking};
pub use cache::{SCAN_CACHE_VERSION, ScanCache};
pub use error::{CacheError, LibraryError, OrganizeError};
pub use gaps::{IncompleteTitle, missing_dlc, missing_games, missing_updates};
pub use local::{ContainerFile, ContentRecord, FileId, LocalCatalog, SkippedFile, TitleFamily};
pub use organize::{
    OrganizeOptions, OrganizePlan, OrganizeSummary, execute_organize, plan_organize,
};
pub use report::{LibraryIssue, LibraryReport, LibraryRow, build_report};
pub use settings::AppSettings;
pub use state::{LibraryState, ScanStats};
