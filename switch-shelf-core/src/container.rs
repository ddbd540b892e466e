//! Container formats and split-volume naming.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions accepted as container candidates.
pub const CONTAINER_EXTENSIONS: &[&str] = &["nsp", "nsz", "xci", "xcz"];

/// On-disk container format, as named by the (logical) file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
    /// PFS0 package
    Nsp,
    /// PFS0 package with compressed program sections
    Nsz,
    /// Gamecard image
    Xci,
    /// Gamecard image with compressed program sections
    Xcz,
}

impl ContainerFormat {
    pub fn from_extension(ext: &str) -> Option<ContainerFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "nsp" => Some(Self::Nsp),
            "nsz" => Some(Self::Nsz),
            "xci" => Some(Self::Xci),
            "xcz" => Some(Self::Xcz),
            _ => None,
        }
    }

    /// Format of a path by its extension, seeing through split suffixes.
    pub fn from_path(path: &Path) -> Option<ContainerFormat> {
        if let Some(volume) = SplitVolume::from_path(path) {
            return volume.format;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Nsp => "nsp",
            Self::Nsz => "nsz",
            Self::Xci => "xci",
            Self::Xcz => "xcz",
        }
    }

    pub fn is_gamecard(self) -> bool {
        matches!(self, Self::Xci | Self::Xcz)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Physical layout of a logical container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    SingleContent,
    MultiContent,
    SplitVolume,
}

impl ContainerKind {
    /// Split sets are reported as split even when they hold several titles.
    pub fn classify(split: bool, content_count: usize) -> ContainerKind {
        if split {
            Self::SplitVolume
        } else if content_count > 1 {
            Self::MultiContent
        } else {
            Self::SingleContent
        }
    }
}

/// One numbered volume of a split container.
///
/// Recognized layouts:
/// - `Game.nsp.00`, `Game.nsp.01`, ...
/// - `Game.xc0`, `Game.xc1`, ... and `Game.ns0`, `Game.ns1`, ...
/// - a folder `Game.nsp/` holding `00`, `01`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitVolume {
    /// Path that names the whole set (`Game.nsp`, `Game.xci`)
    pub logical: PathBuf,
    /// Zero-based volume number
    pub index: u32,
    /// Format implied by the set name, if recognizable
    pub format: Option<ContainerFormat>,
}

impl SplitVolume {
    /// Recognize a volume by its file name. Returns `None` for ordinary files.
    pub fn from_path(path: &Path) -> Option<SplitVolume> {
        let file_name = path.file_name()?.to_str()?;
        let parent = path.parent().unwrap_or_else(|| Path::new(""));

        // Folder layout: Game.nsp/00
        if file_name.len() == 2 && file_name.bytes().all(|b| b.is_ascii_digit()) {
            let folder_format = parent
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ContainerFormat::from_extension);
            if folder_format.is_some() {
                return Some(SplitVolume {
                    logical: parent.to_path_buf(),
                    index: file_name.parse().ok()?,
                    format: folder_format,
                });
            }
            return None;
        }

        let (stem, ext) = file_name.rsplit_once('.')?;

        // Game.nsp.00
        if ext.len() == 2 && ext.bytes().all(|b| b.is_ascii_digit()) {
            let inner_ext = Path::new(stem).extension().and_then(|e| e.to_str())?;
            let format = ContainerFormat::from_extension(inner_ext)?;
            return Some(SplitVolume {
                logical: parent.join(stem),
                index: ext.parse().ok()?,
                format: Some(format),
            });
        }

        // Game.xc0 / Game.ns0
        if !ext.is_ascii() {
            return None;
        }
        let lower = ext.to_ascii_lowercase();
        let (prefix, digits) = lower.split_at(lower.len().min(2));
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let format = match prefix {
            "xc" => ContainerFormat::Xci,
            "ns" => ContainerFormat::Nsp,
            _ => return None,
        };
        Some(SplitVolume {
            logical: parent.join(format!("{stem}.{}", format.extension())),
            index: digits.parse().ok()?,
            format: Some(format),
        })
    }
}

/// Check that `indices` (sorted ascending) run 0, 1, 2, ... without gaps.
///
/// Returns the first missing index when the set is incomplete.
pub fn first_missing_volume(indices: &[u32]) -> Option<u32> {
    for (expected, &actual) in indices.iter().enumerate() {
        let expected = expected as u32;
        if actual != expected {
            return Some(expected);
        }
    }
    if indices.is_empty() { Some(0) } else { None }
}

#[cfg(test)]
#[path = "tests/container_tests.rs"]
mod tests;
