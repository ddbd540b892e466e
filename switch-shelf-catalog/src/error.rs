/// Errors that can occur while fetching or decoding the remote title catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable { message: String, retryable: bool },

    #[error("Malformed catalog data: {0}")]
    CatalogMalformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    pub fn unavailable(msg: impl Into<String>, retryable: bool) -> Self {
        Self::CatalogUnavailable {
            message: msg.into(),
            retryable,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::CatalogMalformed(msg.into())
    }

    /// Whether trying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CatalogUnavailable {
                retryable: true,
                ..
            }
        )
    }
}
