//! PFS0 and HFS0 partition filesystems.
//!
//! Both share one layout: a 0x10-byte header (magic, file count, string
//! table size), a file entry table, the string table, then file data.
//! PFS0 entries are 0x18 bytes; HFS0 entries are 0x40 bytes and add a
//! SHA-256 over the first `hashed_region_size` bytes of each file.

use sha2::{Digest, Sha256};
use switch_shelf_core::ParseError;

use crate::bytes::{ReadAt, array_at, read_u32_le, read_u64_le, strtab_name};

pub(crate) const PFS0_MAGIC: [u8; 4] = *b"PFS0";
pub(crate) const HFS0_MAGIC: [u8; 4] = *b"HFS0";

const HEADER_SIZE: u64 = 0x10;
const MAX_FILES: u32 = 0x4000;
const MAX_STRTAB: u32 = 0x10_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartitionKind {
    Pfs0,
    Hfs0,
}

impl PartitionKind {
    fn magic(self) -> [u8; 4] {
        match self {
            Self::Pfs0 => PFS0_MAGIC,
            Self::Hfs0 => HFS0_MAGIC,
        }
    }

    fn entry_size(self) -> u64 {
        match self {
            Self::Pfs0 => 0x18,
            Self::Hfs0 => 0x40,
        }
    }
}

/// One file inside a partition. `offset` is absolute within the source.
#[derive(Debug, Clone)]
pub(crate) struct PartitionEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    /// HFS0 only: length and SHA-256 of the verified prefix
    pub hashed: Option<(u32, [u8; 32])>,
}

#[derive(Debug, Clone)]
pub(crate) struct Partition {
    pub kind: PartitionKind,
    pub entries: Vec<PartitionEntry>,
}

impl Partition {
    /// Read the partition whose header starts at `base`.
    pub(crate) fn read(
        src: &mut dyn ReadAt,
        base: u64,
        kind: PartitionKind,
    ) -> Result<Partition, ParseError> {
        let header = src.read_at(base, HEADER_SIZE as usize)?;
        if header[0..4] != kind.magic() {
            return Err(ParseError::corrupt(format!(
                "expected {} magic at 0x{base:X}",
                String::from_utf8_lossy(&kind.magic())
            )));
        }
        let num_files = read_u32_le(&header, 4);
        let strtab_size = read_u32_le(&header, 8);
        if num_files > MAX_FILES || strtab_size > MAX_STRTAB {
            return Err(ParseError::corrupt(format!(
                "implausible partition header ({num_files} files, {strtab_size} byte string table)"
            )));
        }

        let table_len = num_files as u64 * kind.entry_size();
        let table = src.read_at(base + HEADER_SIZE, (table_len + strtab_size as u64) as usize)?;
        let (entry_table, strtab) = table.split_at(table_len as usize);
        let data_start = base + HEADER_SIZE + table_len + strtab_size as u64;

        let mut entries = Vec::with_capacity(num_files as usize);
        for i in 0..num_files as usize {
            let raw = &entry_table[i * kind.entry_size() as usize..][..kind.entry_size() as usize];
            let rel_offset = read_u64_le(raw, 0x00);
            let size = read_u64_le(raw, 0x08);
            let name_offset = read_u32_le(raw, 0x10) as usize;
            let name = strtab_name(strtab, name_offset)
                .ok_or_else(|| ParseError::corrupt(format!("bad name offset for entry {i}")))?;
            let hashed = match kind {
                PartitionKind::Pfs0 => None,
                PartitionKind::Hfs0 => Some((read_u32_le(raw, 0x14), array_at::<32>(raw, 0x20))),
            };
            let offset = data_start.checked_add(rel_offset).ok_or_else(|| {
                ParseError::corrupt(format!("offset of entry {i} overflows"))
            })?;
            entries.push(PartitionEntry {
                name,
                offset,
                size,
                hashed,
            });
        }

        Ok(Partition { kind, entries })
    }

    pub(crate) fn find(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn with_suffix<'a>(
        &'a self,
        suffix: &'a str,
    ) -> impl Iterator<Item = &'a PartitionEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.name.to_ascii_lowercase().ends_with(suffix))
    }
}

impl PartitionEntry {
    /// Read the whole file. Only for small files (metadata, tickets).
    pub(crate) fn read_all(&self, src: &mut dyn ReadAt) -> Result<Vec<u8>, ParseError> {
        if self.size > 0x100_0000 {
            return Err(ParseError::corrupt(format!(
                "{} is too large to load ({} bytes)",
                self.name, self.size
            )));
        }
        src.read_at(self.offset, self.size as usize)
    }

    /// Check the HFS0 prefix hash. PFS0 entries always pass.
    pub(crate) fn verify(&self, src: &mut dyn ReadAt) -> Result<(), ParseError> {
        let Some((len, expected)) = self.hashed else {
            return Ok(());
        };
        let len = (len as u64).min(self.size);
        let data = src.read_at(self.offset, len as usize)?;
        let actual: [u8; 32] = Sha256::digest(&data).into();
        if actual != expected {
            return Err(ParseError::corrupt(format!(
                "hash mismatch in {}",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::StreamSource;
    use crate::fixtures;
    use std::io::Cursor;

    #[test]
    fn test_read_pfs0() {
        let data = fixtures::build_pfs0(&[
            ("a.nca", vec![1u8; 10]),
            ("b.tik", vec![2u8; 4]),
        ]);
        let mut cursor = Cursor::new(data);
        let mut src = StreamSource::new(&mut cursor);
        let part = Partition::read(&mut src, 0, PartitionKind::Pfs0).unwrap();
        assert_eq!(part.entries.len(), 2);
        let b = part.find("b.tik").unwrap();
        assert_eq!(b.size, 4);
        assert_eq!(b.read_all(&mut src).unwrap(), vec![2u8; 4]);
        assert_eq!(part.with_suffix(".nca").count(), 1);
    }

    #[test]
    fn test_hfs0_hash_verification() {
        let mut data = fixtures::build_hfs0(&[("x.cnmt.nca", vec![7u8; 0x300])]);
        {
            let mut cursor = Cursor::new(data.clone());
            let mut src = StreamSource::new(&mut cursor);
            let part = Partition::read(&mut src, 0, PartitionKind::Hfs0).unwrap();
            part.entries[0].verify(&mut src).unwrap();
        }
        let last = data.len() - 0x300;
        data[last] ^= 0xFF;
        let mut cursor = Cursor::new(data);
        let mut src = StreamSource::new(&mut cursor);
        let part = Partition::read(&mut src, 0, PartitionKind::Hfs0).unwrap();
        let err = part.entries[0].verify(&mut src).unwrap_err();
        assert!(matches!(err, ParseError::CorruptContainer(_)));
    }

    #[test]
    fn test_entry_offset_overflow() {
        let mut data = fixtures::build_pfs0(&[("a.nca", vec![1u8; 10])]);
        data[0x10..0x18].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let mut src = StreamSource::new(&mut cursor);
        let err = Partition::read(&mut src, 0, PartitionKind::Pfs0).unwrap_err();
        assert!(matches!(err, ParseError::CorruptContainer(ref m) if m.contains("overflows")));
    }

    #[test]
    fn test_wrong_magic() {
        let data = fixtures::build_pfs0(&[("a", vec![0u8; 4])]);
        let mut cursor = Cursor::new(data);
        let mut src = StreamSource::new(&mut cursor);
        let err = Partition::read(&mut src, 0, PartitionKind::Hfs0).unwrap_err();
        assert!(matches!(err, ParseError::CorruptContainer(_)));
    }

    #[test]
    fn test_implausible_header() {
        let mut data = vec![0u8; 0x10];
        data[..4].copy_from_slice(&PFS0_MAGIC);
        data[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let mut src = StreamSource::new(&mut cursor);
        assert!(Partition::read(&mut src, 0, PartitionKind::Pfs0).is_err());
    }
}
