//! Minimal RomFS reader: locate one file by name in the file meta table.

use switch_shelf_core::ParseError;

use crate::bytes::{ReadAt, read_u32_le, read_u64_le};

const HEADER_SIZE: usize = 0x50;
const FILE_ENTRY_SIZE: usize = 0x20;
const MAX_META_TABLE: u64 = 0x40_0000;

/// Find `name` anywhere in the RomFS at `base` and return its contents.
///
/// Returns `Ok(None)` if no file with that name exists.
pub(crate) fn read_file(
    src: &mut dyn ReadAt,
    base: u64,
    name: &str,
) -> Result<Option<Vec<u8>>, ParseError> {
    let header = src.read_at(base, HEADER_SIZE)?;
    if read_u64_le(&header, 0x00) != HEADER_SIZE as u64 {
        return Err(ParseError::corrupt("RomFS header size mismatch"));
    }
    let meta_offset = read_u64_le(&header, 0x38);
    let meta_size = read_u64_le(&header, 0x40);
    let data_offset = read_u64_le(&header, 0x48);
    if meta_size > MAX_META_TABLE {
        return Err(ParseError::corrupt("RomFS file table too large"));
    }

    let meta_start = base
        .checked_add(meta_offset)
        .ok_or_else(|| ParseError::corrupt("RomFS file table offset overflows"))?;
    let table = src.read_at(meta_start, meta_size as usize)?;
    let mut pos = 0usize;
    while pos + FILE_ENTRY_SIZE <= table.len() {
        let entry = &table[pos..];
        let file_offset = read_u64_le(entry, 0x08);
        let file_size = read_u64_le(entry, 0x10);
        let name_size = read_u32_le(entry, 0x1C) as usize;
        let name_end = FILE_ENTRY_SIZE + name_size;
        let Some(raw_name) = entry.get(FILE_ENTRY_SIZE..name_end) else {
            return Err(ParseError::corrupt("RomFS file entry name out of bounds"));
        };
        if raw_name == name.as_bytes() {
            if file_size > 0x10_0000 {
                return Err(ParseError::corrupt(format!("{name} is implausibly large")));
            }
            let start = base
                .checked_add(data_offset)
                .and_then(|o| o.checked_add(file_offset))
                .ok_or_else(|| ParseError::corrupt(format!("{name} offset overflows")))?;
            let data = src.read_at(start, file_size as usize)?;
            return Ok(Some(data));
        }
        pos += FILE_ENTRY_SIZE + name_size.div_ceil(4) * 4;
    }
    Ok(None)
}
