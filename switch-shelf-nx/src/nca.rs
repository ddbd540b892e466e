//! NCA archives: header decryption, key resolution and section access.
//!
//! Header layout (after XTS decryption of the first 0xC00 bytes):
//!
//! | offset | field                                       |
//! |--------|---------------------------------------------|
//! | 0x200  | magic (`NCA3` or `NCA2`)                    |
//! | 0x205  | content type                                |
//! | 0x206  | key generation (old field)                  |
//! | 0x207  | key area encryption key index               |
//! | 0x220  | key generation                              |
//! | 0x230  | rights id                                   |
//! | 0x240  | 4 section entries (start/end in 0x200 units) |
//! | 0x300  | encrypted key area (4 x 16 bytes)           |
//! | 0x400  | 4 filesystem headers, 0x200 each            |

use std::collections::HashMap;

use switch_shelf_core::{KeyLookup, ParseError, key_array, util::to_hex};

use crate::bytes::{ReadAt, align_up, array_at, read_u64_le, read_u32_le};
use crate::crypto;
use crate::ticket::Ticket;

pub(crate) const HEADER_SIZE: usize = 0xC00;
const MEDIA_UNIT: u64 = 0x200;
const FS_HEADERS: usize = 0x400;
const FS_HEADER_SIZE: usize = 0x200;
const KEY_AREA: usize = 0x300;
/// Key area slot holding the AES-CTR section key.
const CTR_KEY_SLOT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NcaContentType {
    Program,
    Meta,
    Control,
    Manual,
    Data,
    PublicData,
}

impl NcaContentType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Program),
            1 => Some(Self::Meta),
            2 => Some(Self::Control),
            3 => Some(Self::Manual),
            4 => Some(Self::Data),
            5 => Some(Self::PublicData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FsType {
    RomFs,
    PartitionFs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionEncryption {
    None,
    Xts,
    Ctr,
    Bktr,
}

/// One filesystem section of an NCA.
#[derive(Debug, Clone)]
pub(crate) struct Section {
    /// Byte range within the NCA
    pub start: u64,
    pub end: u64,
    pub fs_type: FsType,
    pub encryption: SectionEncryption,
    pub ctr: [u8; 8],
    /// Offset of the payload filesystem within the section: the PFS0 header
    /// for partition sections, the RomFS header (IVFC level 5) for RomFS
    pub payload_offset: u64,
}

/// Decrypted NCA header.
#[derive(Debug, Clone)]
pub(crate) struct NcaHeader {
    pub content_type: NcaContentType,
    pub key_revision: u8,
    pub key_area_index: u8,
    pub rights_id: [u8; 16],
    pub sections: Vec<Option<Section>>,
    encrypted_key_area: [u8; 64],
}

impl NcaHeader {
    /// Read and decrypt the header of the NCA at `nca_offset`.
    pub(crate) fn read(
        src: &mut dyn ReadAt,
        nca_offset: u64,
        keys: &dyn KeyLookup,
    ) -> Result<NcaHeader, ParseError> {
        let header_key: [u8; 32] = key_array(keys, "header_key")
            .ok_or_else(|| ParseError::missing_keys("header_key is not available"))?;
        let encrypted = src.read_at(nca_offset, HEADER_SIZE)?;
        let mut raw = encrypted.clone();
        crypto::xts_decrypt(&header_key, &mut raw, 0);
        if &raw[0x200..0x204] == b"NCA2" {
            // NCA2 encrypts every filesystem header as its own sector 0
            for i in 0..4 {
                let range = FS_HEADERS + i * FS_HEADER_SIZE..FS_HEADERS + (i + 1) * FS_HEADER_SIZE;
                let mut fs = encrypted[range.clone()].to_vec();
                crypto::xts_decrypt(&header_key, &mut fs, 0);
                raw[range].copy_from_slice(&fs);
            }
        }
        Self::parse(&raw)
    }

    pub(crate) fn parse(raw: &[u8]) -> Result<NcaHeader, ParseError> {
        match &raw[0x200..0x204] {
            b"NCA3" | b"NCA2" => {}
            b"NCA1" | b"NCA0" => {
                return Err(ParseError::unsupported(format!(
                    "{} archives",
                    String::from_utf8_lossy(&raw[0x200..0x204])
                )));
            }
            _ => {
                return Err(ParseError::missing_keys(
                    "header_key does not decrypt the NCA header",
                ));
            }
        }

        let content_type = NcaContentType::from_byte(raw[0x205]).ok_or_else(|| {
            ParseError::corrupt(format!("unknown NCA content type {}", raw[0x205]))
        })?;
        let key_revision = raw[0x206].max(raw[0x220]).saturating_sub(1);

        let mut sections = Vec::with_capacity(4);
        for i in 0..4 {
            let entry = &raw[0x240 + i * 0x10..];
            let start = read_u32_le(entry, 0) as u64 * MEDIA_UNIT;
            let end = read_u32_le(entry, 4) as u64 * MEDIA_UNIT;
            if end <= start {
                sections.push(None);
                continue;
            }
            let fs = &raw[FS_HEADERS + i * FS_HEADER_SIZE..][..FS_HEADER_SIZE];
            sections.push(Some(parse_fs_header(fs, start, end)?));
        }

        Ok(NcaHeader {
            content_type,
            key_revision,
            key_area_index: raw[0x207],
            rights_id: array_at::<16>(raw, 0x230),
            sections,
            encrypted_key_area: array_at::<64>(raw, KEY_AREA),
        })
    }

    pub(crate) fn has_rights_id(&self) -> bool {
        self.rights_id.iter().any(|&b| b != 0)
    }

    /// Resolve the AES-CTR key for this NCA's sections.
    pub(crate) fn section_key(
        &self,
        keys: &dyn KeyLookup,
        tickets: &HashMap<[u8; 16], Ticket>,
    ) -> Result<[u8; 16], ParseError> {
        if self.has_rights_id() {
            let ticket = tickets.get(&self.rights_id).ok_or_else(|| {
                ParseError::missing_keys(format!(
                    "no ticket for rights id {}",
                    to_hex(&self.rights_id)
                ))
            })?;
            if ticket.personalized {
                return Err(ParseError::missing_keys(format!(
                    "ticket {} is personalized",
                    to_hex(&self.rights_id)
                )));
            }
            let kek_name = format!("titlekek_{:02x}", self.key_revision);
            let kek: [u8; 16] = key_array(keys, &kek_name)
                .ok_or_else(|| ParseError::missing_keys(format!("{kek_name} is not available")))?;
            return Ok(crypto::ecb_decrypt_block(&kek, &ticket.encrypted_title_key));
        }

        let family = match self.key_area_index {
            0 => "application",
            1 => "ocean",
            2 => "system",
            other => {
                return Err(ParseError::corrupt(format!(
                    "unknown key area index {other}"
                )));
            }
        };
        let kak_name = format!("key_area_key_{family}_{:02x}", self.key_revision);
        let kak: [u8; 16] = key_array(keys, &kak_name)
            .ok_or_else(|| ParseError::missing_keys(format!("{kak_name} is not available")))?;
        let slot = array_at::<16>(&self.encrypted_key_area, CTR_KEY_SLOT * 16);
        Ok(crypto::ecb_decrypt_block(&kak, &slot))
    }

    pub(crate) fn section(&self, index: usize) -> Result<&Section, ParseError> {
        self.sections
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| ParseError::corrupt(format!("NCA has no section {index}")))
    }
}

fn parse_fs_header(fs: &[u8], start: u64, end: u64) -> Result<Section, ParseError> {
    let fs_type = match fs[0x2] {
        0 => FsType::RomFs,
        1 => FsType::PartitionFs,
        other => return Err(ParseError::corrupt(format!("unknown fs type {other}"))),
    };
    let encryption = match fs[0x4] {
        0 | 1 => SectionEncryption::None,
        2 => SectionEncryption::Xts,
        3 => SectionEncryption::Ctr,
        4 => SectionEncryption::Bktr,
        other => {
            return Err(ParseError::unsupported(format!(
                "section encryption type {other}"
            )));
        }
    };
    let payload_offset = match fs_type {
        // HierarchicalSha256: last layer region is the PFS0
        FsType::PartitionFs => read_u64_le(fs, 0x40),
        // HierarchicalIntegrity (IVFC): level 5 holds the RomFS
        FsType::RomFs => read_u64_le(fs, 0x90),
    };
    Ok(Section {
        start,
        end,
        fs_type,
        encryption,
        ctr: array_at::<8>(fs, 0x140),
        payload_offset,
    })
}

/// Decrypting view of one section. Offsets are relative to the section start.
pub(crate) struct SectionReader<'a> {
    src: &'a mut dyn ReadAt,
    nca_offset: u64,
    section: Section,
    key: Option<[u8; 16]>,
}

impl<'a> SectionReader<'a> {
    pub(crate) fn new(
        src: &'a mut dyn ReadAt,
        nca_offset: u64,
        section: Section,
        key: Option<[u8; 16]>,
    ) -> Result<Self, ParseError> {
        match section.encryption {
            SectionEncryption::None => {}
            SectionEncryption::Ctr if key.is_some() => {}
            SectionEncryption::Ctr => {
                return Err(ParseError::missing_keys("no key for encrypted section"));
            }
            SectionEncryption::Xts | SectionEncryption::Bktr => {
                return Err(ParseError::unsupported(format!(
                    "{:?} section encryption",
                    section.encryption
                )));
            }
        }
        Ok(Self {
            src,
            nca_offset,
            section,
            key,
        })
    }

    pub(crate) fn payload_offset(&self) -> u64 {
        self.section.payload_offset
    }
}

impl ReadAt for SectionReader<'_> {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, ParseError> {
        let abs = self
            .section
            .start
            .checked_add(offset)
            .filter(|abs| abs.checked_add(len as u64).is_some_and(|end| end <= self.section.end))
            .ok_or_else(|| {
                ParseError::corrupt(format!("read of {len} bytes at 0x{offset:X} exceeds section"))
            })?;
        let aligned = abs & !0xF;
        let lead = (abs - aligned) as usize;
        let total = align_up((lead + len) as u64, 16).min(self.section.end - aligned) as usize;
        let mut buf = self.src.read_at(self.nca_offset + aligned, total)?;
        if let (SectionEncryption::Ctr, Some(key)) = (self.section.encryption, &self.key) {
            crypto::ctr_apply(key, &self.section.ctr, aligned, &mut buf);
        }
        Ok(buf[lead..lead + len].to_vec())
    }
}

#[cfg(test)]
#[path = "tests/nca_tests.rs"]
mod tests;
