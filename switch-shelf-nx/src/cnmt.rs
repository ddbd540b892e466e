//! Content meta (`*.cnmt`) records.

use switch_shelf_core::{ContentType, ParseError, TitleId};

use crate::bytes::{array_at, read_u16_le, read_u32_le, read_u64_le};

const HEADER_SIZE: usize = 0x20;
const RECORD_SIZE: usize = 0x38;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetaType {
    Application,
    Patch,
    AddOn,
}

impl MetaType {
    fn from_byte(b: u8) -> Result<MetaType, ParseError> {
        match b {
            0x80 => Ok(Self::Application),
            0x81 => Ok(Self::Patch),
            0x82 => Ok(Self::AddOn),
            0x83 => Err(ParseError::unsupported("delta content meta")),
            0x01..=0x05 => Err(ParseError::unsupported(format!(
                "system content meta type 0x{b:02X}"
            ))),
            _ => Err(ParseError::corrupt(format!("unknown content meta type 0x{b:02X}"))),
        }
    }

    pub(crate) fn content_type(self) -> ContentType {
        match self {
            Self::Application => ContentType::Base,
            Self::Patch => ContentType::Update,
            Self::AddOn => ContentType::AddOn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordType {
    Meta,
    Program,
    Data,
    Control,
    HtmlDocument,
    LegalInformation,
    DeltaFragment,
    Other(u8),
}

impl From<u8> for RecordType {
    fn from(b: u8) -> Self {
        match b {
            0 => Self::Meta,
            1 => Self::Program,
            2 => Self::Data,
            3 => Self::Control,
            4 => Self::HtmlDocument,
            5 => Self::LegalInformation,
            6 => Self::DeltaFragment,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ContentRecord {
    pub id: [u8; 16],
    pub size: u64,
    pub record_type: RecordType,
}

impl ContentRecord {
    /// File name of the NCA holding this content.
    pub(crate) fn nca_name(&self) -> String {
        format!("{}.nca", switch_shelf_core::util::to_hex(&self.id))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ContentMeta {
    pub title_id: TitleId,
    pub version: u32,
    pub meta_type: MetaType,
    pub records: Vec<ContentRecord>,
}

impl ContentMeta {
    pub(crate) fn parse(data: &[u8]) -> Result<ContentMeta, ParseError> {
        if data.len() < HEADER_SIZE {
            return Err(ParseError::corrupt("content meta too small"));
        }
        let title_id = TitleId::new(read_u64_le(data, 0x00));
        let version = read_u32_le(data, 0x08);
        let meta_type = MetaType::from_byte(data[0x0C])?;
        let ext_header_size = read_u16_le(data, 0x0E) as usize;
        let count = read_u16_le(data, 0x10) as usize;

        let records_start = HEADER_SIZE + ext_header_size;
        if data.len() < records_start + count * RECORD_SIZE {
            return Err(ParseError::corrupt(format!(
                "content meta declares {count} records but is {} bytes",
                data.len()
            )));
        }

        let records = (0..count)
            .map(|i| {
                let raw = &data[records_start + i * RECORD_SIZE..][..RECORD_SIZE];
                let mut size_bytes = [0u8; 8];
                size_bytes[..6].copy_from_slice(&raw[0x30..0x36]);
                ContentRecord {
                    id: array_at::<16>(raw, 0x20),
                    size: u64::from_le_bytes(size_bytes),
                    record_type: RecordType::from(raw[0x36]),
                }
            })
            .collect();

        let meta = ContentMeta {
            title_id,
            version,
            meta_type,
            records,
        };
        meta.check_id()?;
        Ok(meta)
    }

    /// The meta type must agree with the layout of the title id.
    fn check_id(&self) -> Result<(), ParseError> {
        match self.title_id.classify() {
            Some(kind) if kind == self.meta_type.content_type() => Ok(()),
            Some(kind) => Err(ParseError::corrupt(format!(
                "title id {} looks like {kind} content but meta says {}",
                self.title_id,
                self.meta_type.content_type()
            ))),
            None => Err(ParseError::corrupt(format!(
                "malformed title id {}",
                self.title_id
            ))),
        }
    }

    pub(crate) fn control_record(&self) -> Option<&ContentRecord> {
        self.records
            .iter()
            .find(|r| r.record_type == RecordType::Control)
    }
}
