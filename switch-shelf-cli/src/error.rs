use switch_shelf_catalog::CatalogError;
use switch_shelf_lib::LibraryError;
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Library operation failed
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Title catalog could not be loaded
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Key file missing or unusable
    #[error("Key error: {0}")]
    Keys(String),

    /// Invalid command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    pub(crate) fn keys(msg: impl Into<String>) -> Self {
        Self::Keys(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
