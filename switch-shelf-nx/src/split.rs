//! Multi-volume split containers read as one stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use switch_shelf_core::container::first_missing_volume;
use switch_shelf_core::{ParseError, SplitVolume};

struct Volume {
    file: File,
    start: u64,
    len: u64,
}

/// Concatenation of numbered volumes behaving like a single file.
pub struct MultiVolumeReader {
    volumes: Vec<Volume>,
    total: u64,
    pos: u64,
}

impl MultiVolumeReader {
    /// Open every volume of a split set.
    ///
    /// Paths may be given in any order; they are sorted by volume number and
    /// must run 00, 01, ... without gaps.
    pub fn open(paths: &[&Path]) -> Result<Self, ParseError> {
        let mut numbered: Vec<(u32, PathBuf)> = Vec::with_capacity(paths.len());
        for path in paths {
            let volume = SplitVolume::from_path(path).ok_or_else(|| {
                ParseError::incomplete_split(format!(
                    "{} is not a numbered volume",
                    path.display()
                ))
            })?;
            numbered.push((volume.index, path.to_path_buf()));
        }
        numbered.sort_by_key(|(index, _)| *index);

        let indices: Vec<u32> = numbered.iter().map(|(i, _)| *i).collect();
        if let Some(missing) = first_missing_volume(&indices) {
            let name = paths
                .first()
                .and_then(|p| SplitVolume::from_path(p))
                .map(|v| v.logical.display().to_string())
                .unwrap_or_default();
            return Err(ParseError::incomplete_split(format!(
                "volume {missing:02} of {name} is missing"
            )));
        }

        let mut volumes = Vec::with_capacity(numbered.len());
        let mut start = 0u64;
        for (index, path) in numbered {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(ParseError::incomplete_split(format!(
                        "volume {index:02} ({}) is missing",
                        path.display()
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            let len = file.metadata()?.len();
            volumes.push(Volume { file, start, len });
            start += len;
        }

        Ok(Self {
            volumes,
            total: start,
            pos: 0,
        })
    }

    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl Read for MultiVolumeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.total {
            return Ok(0);
        }
        let pos = self.pos;
        let Some(volume) = self
            .volumes
            .iter_mut()
            .find(|v| pos >= v.start && pos < v.start + v.len)
        else {
            return Ok(0);
        };
        let within = pos - volume.start;
        let available = (volume.len - within).min(buf.len() as u64) as usize;
        volume.file.seek(SeekFrom::Start(within))?;
        let n = volume.file.read(&mut buf[..available])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MultiVolumeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(d) => self.total as i128 + d as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of split set",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_volumes(dir: &Path, parts: &[(&str, &[u8])]) -> Vec<PathBuf> {
        parts
            .iter()
            .map(|(name, data)| {
                let p = dir.join(name);
                fs::write(&p, data).unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn test_reads_across_volume_boundaries() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = write_volumes(
            tmp.path(),
            &[("Game.nsp.01", b"EFGH"), ("Game.nsp.00", b"ABCD"), ("Game.nsp.02", b"IJ")],
        );
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut reader = MultiVolumeReader::open(&refs).unwrap();
        assert_eq!(reader.len(), 10);

        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"ABCDEFGHIJ");

        reader.seek(SeekFrom::Start(3)).unwrap();
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"DEFG");

        reader.seek(SeekFrom::End(-1)).unwrap();
        let mut last = [0u8; 1];
        reader.read_exact(&mut last).unwrap();
        assert_eq!(&last, b"J");
    }

    #[test]
    fn test_gap_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = write_volumes(tmp.path(), &[("Game.xc0", b"AB"), ("Game.xc2", b"CD")]);
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let err = MultiVolumeReader::open(&refs).err().unwrap();
        assert!(matches!(err, ParseError::IncompleteSplitSet(ref m) if m.contains("01")));
    }

    #[test]
    fn test_missing_first_volume() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = write_volumes(tmp.path(), &[("Game.nsp.01", b"AB")]);
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let err = MultiVolumeReader::open(&refs).err().unwrap();
        assert!(matches!(err, ParseError::IncompleteSplitSet(_)));
    }

    #[test]
    fn test_vanished_volume() {
        let tmp = tempfile::tempdir().unwrap();
        let mut paths = write_volumes(tmp.path(), &[("Game.nsp.00", b"AB")]);
        paths.push(tmp.path().join("Game.nsp.01"));
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let err = MultiVolumeReader::open(&refs).err().unwrap();
        assert!(matches!(err, ParseError::IncompleteSplitSet(_)));
    }
}
