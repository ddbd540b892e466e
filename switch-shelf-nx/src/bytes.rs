//! Byte reading helpers and random access over container data.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use switch_shelf_core::{ParseError, ReadSeek};

pub(crate) fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub(crate) fn read_u64_le(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ])
}

/// Copy `N` bytes starting at `offset`.
pub(crate) fn array_at<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// Read a NUL-terminated name from a string table.
pub(crate) fn strtab_name(strtab: &[u8], offset: usize) -> Option<String> {
    let tail = strtab.get(offset..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    std::str::from_utf8(&tail[..end]).ok().map(str::to_string)
}

pub(crate) fn align_up(val: u64, align: u64) -> u64 {
    val.div_ceil(align) * align
}

/// Random access to a byte region (a whole container or one NCA section).
pub(crate) trait ReadAt {
    /// Read exactly `len` bytes at `offset`.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, ParseError>;
}

/// Unencrypted access to the underlying container stream.
pub(crate) struct StreamSource<'a> {
    inner: &'a mut dyn ReadSeek,
}

impl<'a> StreamSource<'a> {
    pub(crate) fn new(inner: &'a mut dyn ReadSeek) -> Self {
        Self { inner }
    }
}

impl ReadAt for StreamSource<'_> {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, ParseError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => Ok(buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ParseError::corrupt(format!(
                "truncated: {len} bytes at 0x{offset:X} past end of data"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_readers() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16_le(&buf, 0), 0x0201);
        assert_eq!(read_u32_le(&buf, 0), 0x04030201);
        assert_eq!(read_u64_le(&buf, 0), 0x0807060504030201);
        assert_eq!(array_at::<2>(&buf, 6), [0x07, 0x08]);
    }

    #[test]
    fn test_strtab_name() {
        let strtab = b"first.nca\0second.tik\0";
        assert_eq!(strtab_name(strtab, 0).as_deref(), Some("first.nca"));
        assert_eq!(strtab_name(strtab, 10).as_deref(), Some("second.tik"));
        assert_eq!(strtab_name(strtab, 99), None);
    }

    #[test]
    fn test_truncated_read_is_corrupt() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let mut src = StreamSource::new(&mut cursor);
        assert_eq!(src.read_at(8, 8).unwrap().len(), 8);
        let err = src.read_at(12, 8).unwrap_err();
        assert!(matches!(err, ParseError::CorruptContainer(_)));
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(0x200, 0x200), 0x200);
    }
}
