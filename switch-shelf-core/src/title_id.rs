//! Title identifiers and the content type encoded in them.
//!
//! Every content unit carries a 64-bit title id. Base applications end in
//! `000`, their patches in `800`, and add-on content sets bit 12 with a
//! per-add-on index in the low 12 bits:
//!
//! ```text
//! 0100ABCD12340000  base application
//! 0100ABCD12340800  update for that application
//! 0100ABCD12341001  first add-on for that application
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const ADDON_BIT: u64 = 0x1000;
const PATCH_SUFFIX: u64 = 0x800;
const LOW_MASK: u64 = 0xFFF;

/// Kind of content a title id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentType {
    Base,
    Update,
    AddOn,
}

impl ContentType {
    /// Short tag used in file name templates.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::Update => "UPD",
            Self::AddOn => "DLC",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Update => f.write_str("update"),
            Self::AddOn => f.write_str("add-on"),
        }
    }
}

/// A 64-bit title id, displayed as 16 uppercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TitleId(u64);

impl TitleId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Classify the id, or `None` if it matches no known layout.
    pub fn classify(self) -> Option<ContentType> {
        if self.0 & ADDON_BIT != 0 {
            Some(ContentType::AddOn)
        } else if self.0 & LOW_MASK == PATCH_SUFFIX {
            Some(ContentType::Update)
        } else if self.0 & LOW_MASK == 0 {
            Some(ContentType::Base)
        } else {
            None
        }
    }

    pub fn is_well_formed(self) -> bool {
        self.classify().is_some()
    }

    /// Content type of a well-formed id. Malformed ids are reported as
    /// [`ContentType::Base`]; callers validate with [`is_well_formed`](Self::is_well_formed) first.
    pub fn content_type(self) -> ContentType {
        self.classify().unwrap_or(ContentType::Base)
    }

    /// Id of the base application this content belongs to.
    pub fn base_id(self) -> TitleId {
        match self.classify() {
            Some(ContentType::AddOn) => TitleId(self.0 & !(ADDON_BIT | LOW_MASK)),
            _ => TitleId(self.0 & !LOW_MASK),
        }
    }

    /// Id of the update for this id's base application.
    pub fn update_id(self) -> TitleId {
        TitleId(self.base_id().0 | PATCH_SUFFIX)
    }

    /// Lowercase form, as used by the version list documents.
    pub fn to_lower_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Error returned when a string is not a 16-digit hex title id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid title id: {0:?}")]
pub struct InvalidTitleId(pub String);

impl FromStr for TitleId {
    type Err = InvalidTitleId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidTitleId(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(TitleId)
            .map_err(|_| InvalidTitleId(s.to_string()))
    }
}

impl From<TitleId> for String {
    fn from(id: TitleId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TitleId {
    type Error = InvalidTitleId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
#[path = "tests/title_id_tests.rs"]
mod tests;
