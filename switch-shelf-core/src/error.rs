use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while decoding a container.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A required key slot is absent or the supplied key does not decrypt
    #[error("Missing keys: {0}")]
    MissingKeys(String),

    /// The container structure is malformed
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// One or more volumes of a split set are absent
    #[error("Incomplete split set: {0}")]
    IncompleteSplitSet(String),

    /// Known container, but a revision or section layout this parser does not read
    #[error("Unsupported revision: {0}")]
    UnsupportedRevision(String),

    /// I/O error while reading the container
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub fn missing_keys(msg: impl Into<String>) -> Self {
        Self::MissingKeys(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptContainer(msg.into())
    }

    pub fn incomplete_split(msg: impl Into<String>) -> Self {
        Self::IncompleteSplitSet(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedRevision(msg.into())
    }

    /// Classification used when the failure is recorded as a skipped file.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingKeys(_) => FailureKind::MissingKeys,
            Self::CorruptContainer(_) => FailureKind::CorruptContainer,
            Self::IncompleteSplitSet(_) => FailureKind::IncompleteSplitSet,
            Self::UnsupportedRevision(_) => FailureKind::UnsupportedRevision,
            Self::Io(_) => FailureKind::Unreadable,
        }
    }
}

/// Classification of a container that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    MissingKeys,
    CorruptContainer,
    IncompleteSplitSet,
    UnsupportedRevision,
    Unreadable,
}

impl FailureKind {
    /// Whether the same file may decode on a later run without changing.
    ///
    /// Key failures depend on the key file, I/O failures on the environment.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::MissingKeys | Self::Unreadable)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MissingKeys => "missing keys",
            Self::CorruptContainer => "corrupt container",
            Self::IncompleteSplitSet => "incomplete split set",
            Self::UnsupportedRevision => "unsupported revision",
            Self::Unreadable => "unreadable",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
