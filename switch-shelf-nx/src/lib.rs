//! Switch container decoding.
//!
//! Reads NSP/NSZ packages (PFS0) and XCI/XCZ gamecard images (HFS0),
//! decrypts the content meta NCAs inside them and returns one
//! [`DecodedContent`] per content meta. Control data (names, display
//! version) is read from the matching control NCA when present.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use switch_shelf_core::{
    CONTAINER_EXTENSIONS, ContentParser, DecodedContent, KeyLookup, ParseError, ReadSeek,
    SplitVolume,
};

mod bytes;
mod cnmt;
mod crypto;
mod nacp;
mod nca;
mod partition;
mod romfs;
pub mod split;
mod ticket;
mod xci;

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;

use bytes::{ReadAt, StreamSource};
use cnmt::{ContentMeta, MetaType};
use nacp::ControlData;
use nca::{FsType, NcaContentType, NcaHeader, SectionReader};
use partition::{Partition, PartitionEntry, PartitionKind};
use ticket::Ticket;

pub use split::MultiVolumeReader;

/// Container layout recognized from its signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `PFS0` at offset 0 (NSP, NSZ)
    Package,
    /// `HEAD` at offset 0x100 (XCI, XCZ)
    Gamecard,
}

/// Identify the container layout from its contents.
pub fn detect_layout(reader: &mut dyn ReadSeek) -> Result<Layout, ParseError> {
    let mut head = [0u8; 0x104];
    reader.seek(SeekFrom::Start(0))?;
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled >= 4 && head[0..4] == partition::PFS0_MAGIC {
        return Ok(Layout::Package);
    }
    if filled >= 0x104 && head[0x100..0x104] == xci::HEAD_MAGIC {
        return Ok(Layout::Gamecard);
    }
    Err(ParseError::corrupt("no PFS0 or gamecard signature"))
}

/// Decode every content meta in a container stream.
pub fn parse_container(
    reader: &mut dyn ReadSeek,
    keys: &dyn KeyLookup,
) -> Result<Vec<DecodedContent>, ParseError> {
    let layout = detect_layout(reader)?;
    let mut src = StreamSource::new(reader);
    let partition = match layout {
        Layout::Package => Partition::read(&mut src, 0, PartitionKind::Pfs0)?,
        Layout::Gamecard => xci::secure_partition(&mut src)?,
    };

    let tickets = ticket::collect_tickets(&mut src, &partition)?;
    let metas: Vec<&PartitionEntry> = partition.with_suffix(".cnmt.nca").collect();
    if metas.is_empty() {
        return Err(ParseError::corrupt("no content meta NCA found"));
    }

    let mut contents = Vec::with_capacity(metas.len());
    for entry in metas {
        contents.push(decode_meta(&mut src, &partition, entry, keys, &tickets)?);
    }
    Ok(contents)
}

fn decode_meta(
    src: &mut dyn ReadAt,
    partition: &Partition,
    entry: &PartitionEntry,
    keys: &dyn KeyLookup,
    tickets: &HashMap<[u8; 16], Ticket>,
) -> Result<DecodedContent, ParseError> {
    entry.verify(src)?;
    let header = NcaHeader::read(src, entry.offset, keys)?;
    if header.content_type != NcaContentType::Meta {
        return Err(ParseError::corrupt(format!(
            "{} is not a meta NCA",
            entry.name
        )));
    }
    let section = header.section(0)?.clone();
    if section.fs_type != FsType::PartitionFs {
        return Err(ParseError::corrupt(format!(
            "{} has no partition section",
            entry.name
        )));
    }
    let key = header.section_key(keys, tickets)?;
    let mut reader = SectionReader::new(src, entry.offset, section, Some(key))?;
    let pfs_offset = reader.payload_offset();
    let pfs = Partition::read(&mut reader, pfs_offset, PartitionKind::Pfs0)?;
    let cnmt_entry = pfs
        .with_suffix(".cnmt")
        .next()
        .ok_or_else(|| ParseError::corrupt(format!("{} holds no .cnmt", entry.name)))?
        .clone();
    let meta = ContentMeta::parse(&cnmt_entry.read_all(&mut reader)?)?;

    let mut content = DecodedContent::new(meta.title_id, meta.version);
    if meta.meta_type != MetaType::AddOn {
        match read_control(src, partition, &meta, keys, tickets) {
            Ok(Some(control)) => {
                content.names = control.names;
                content.publisher = control.publisher;
                content.display_version = control.display_version;
            }
            Ok(None) => log::debug!("{}: no control data", meta.title_id),
            Err(e) => log::debug!("{}: control data unreadable: {}", meta.title_id, e),
        }
    }
    Ok(content)
}

fn read_control(
    src: &mut dyn ReadAt,
    partition: &Partition,
    meta: &ContentMeta,
    keys: &dyn KeyLookup,
    tickets: &HashMap<[u8; 16], Ticket>,
) -> Result<Option<ControlData>, ParseError> {
    let Some(record) = meta.control_record() else {
        return Ok(None);
    };
    let Some(entry) = partition.find(&record.nca_name()) else {
        return Ok(None);
    };
    if entry.size != record.size {
        log::debug!(
            "{}: size {} differs from content record ({})",
            entry.name,
            entry.size,
            record.size
        );
    }

    let header = NcaHeader::read(src, entry.offset, keys)?;
    let section = header.section(0)?.clone();
    if section.fs_type != FsType::RomFs {
        return Ok(None);
    }
    let key = header.section_key(keys, tickets)?;
    let mut reader = SectionReader::new(src, entry.offset, section, Some(key))?;
    let base = reader.payload_offset();
    match romfs::read_file(&mut reader, base, "control.nacp")? {
        Some(data) => ControlData::parse(&data).map(Some),
        None => Ok(None),
    }
}

/// [`ContentParser`] over files on disk.
pub struct NxParser {
    keys: Arc<dyn KeyLookup>,
}

impl NxParser {
    pub fn new(keys: Arc<dyn KeyLookup>) -> Self {
        Self { keys }
    }
}

impl ContentParser for NxParser {
    fn parse(&self, volumes: &[&Path]) -> Result<Vec<DecodedContent>, ParseError> {
        let is_split = volumes.len() > 1
            || volumes
                .first()
                .is_some_and(|p| SplitVolume::from_path(p).is_some());
        if is_split {
            let mut reader = MultiVolumeReader::open(volumes)?;
            return parse_container(&mut reader, self.keys.as_ref());
        }
        let path = volumes
            .first()
            .ok_or_else(|| ParseError::corrupt("no file given"))?;
        let mut reader = BufReader::new(File::open(path)?);
        parse_container(&mut reader, self.keys.as_ref())
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        CONTAINER_EXTENSIONS
    }
}

#[cfg(test)]
#[path = "tests/parser_tests.rs"]
mod tests;
