use std::io::{Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod container;
pub mod error;
pub mod keys;
pub mod names;
pub mod progress;
pub mod title_id;
pub mod util;

pub use container::{CONTAINER_EXTENSIONS, ContainerFormat, ContainerKind, SplitVolume};
pub use error::{FailureKind, ParseError};
pub use keys::{KeyLookup, KeySet, key_array};
pub use names::{DisplayNames, Language};
pub use progress::{LogProgress, ProgressSink, SilentProgress};
pub use title_id::{ContentType, InvalidTitleId, TitleId};

/// Metadata decoded from one content unit inside a container.
///
/// A plain package yields exactly one of these; multi-content packages yield
/// one per embedded content meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedContent {
    /// Title id of the content unit (application, patch or add-on id)
    pub title_id: TitleId,

    /// Numeric version from the content meta (e.g. 65536 for v1.0.1 patches)
    pub version: u32,

    /// Per-language titles from the control data. Empty when the control
    /// data was not present or not readable.
    #[serde(default)]
    pub names: DisplayNames,

    /// Human-facing version string from the control data (e.g. "1.0.2")
    #[serde(default)]
    pub display_version: Option<String>,

    /// Publisher from the control data
    #[serde(default)]
    pub publisher: Option<String>,
}

impl DecodedContent {
    pub fn new(title_id: TitleId, version: u32) -> Self {
        Self {
            title_id,
            version,
            names: DisplayNames::default(),
            display_version: None,
            publisher: None,
        }
    }

    /// Content type derived from the title id.
    pub fn content_type(&self) -> ContentType {
        self.title_id.content_type()
    }
}

/// A reader that implements both Read and Seek.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Trait for decoding container files into content metadata.
///
/// `volumes` holds every physical file of one logical container in volume
/// order: a single path for plain files, several for split sets.
pub trait ContentParser: Send + Sync {
    /// Decode every content unit stored in the container.
    ///
    /// # Returns
    /// * `Ok(contents)` - One entry per content meta found (never empty)
    /// * `Err(ParseError)` - The container could not be decoded
    fn parse(&self, volumes: &[&Path]) -> Result<Vec<DecodedContent>, ParseError>;

    /// Lowercase file extensions this parser accepts as candidates.
    fn file_extensions(&self) -> &'static [&'static str];
}
