use super::*;
use std::io::Cursor;

use crate::bytes::StreamSource;
use crate::fixtures::{self, NcaSpec};

fn meta_nca(rights_id: Option<[u8; 16]>, key_generation: u8) -> Vec<u8> {
    let payload = fixtures::build_pfs0(&[("x.cnmt", vec![0x77u8; 0x40])]);
    fixtures::build_nca(&NcaSpec {
        content_type: 1,
        fs_type: 1,
        payload: &payload,
        rights_id,
        key_generation,
    })
}

#[test]
fn test_header_fields() {
    let nca = meta_nca(None, 0);
    let mut cursor = Cursor::new(nca);
    let mut src = StreamSource::new(&mut cursor);
    let header = NcaHeader::read(&mut src, 0, &fixtures::test_keys()).unwrap();
    assert_eq!(header.content_type, NcaContentType::Meta);
    assert_eq!(header.key_revision, 0);
    assert!(!header.has_rights_id());
    let section = header.section(0).unwrap();
    assert_eq!(section.start, 0xC00);
    assert_eq!(section.fs_type, FsType::PartitionFs);
    assert_eq!(section.encryption, SectionEncryption::Ctr);
    assert!(header.section(1).is_err());
}

#[test]
fn test_key_revision_uses_newer_field() {
    let nca = meta_nca(None, 5);
    let mut cursor = Cursor::new(nca);
    let mut src = StreamSource::new(&mut cursor);
    let header = NcaHeader::read(&mut src, 0, &fixtures::test_keys()).unwrap();
    assert_eq!(header.key_revision, 4);
}

#[test]
fn test_key_area_and_section_decryption() {
    let nca = meta_nca(None, 0);
    let keys = fixtures::test_keys();
    let mut cursor = Cursor::new(nca);
    let mut src = StreamSource::new(&mut cursor);
    let header = NcaHeader::read(&mut src, 0, &keys).unwrap();
    let key = header.section_key(&keys, &HashMap::new()).unwrap();
    assert_eq!(key, fixtures::SECTION_KEY);

    let section = header.section(0).unwrap().clone();
    let mut reader = SectionReader::new(&mut src, 0, section, Some(key)).unwrap();
    // Unaligned read in the middle of the section
    let magic = reader.read_at(0, 4).unwrap();
    assert_eq!(magic, b"PFS0");
    let tail = reader.read_at(0x13, 5).unwrap();
    assert_eq!(tail.len(), 5);
    assert!(reader.read_at(0x10000, 4).is_err());
}

#[test]
fn test_rights_id_without_ticket() {
    let nca = meta_nca(Some([0x42; 16]), 0);
    let keys = fixtures::test_keys();
    let mut cursor = Cursor::new(nca);
    let mut src = StreamSource::new(&mut cursor);
    let header = NcaHeader::read(&mut src, 0, &keys).unwrap();
    assert!(header.has_rights_id());
    let err = header.section_key(&keys, &HashMap::new()).unwrap_err();
    assert!(matches!(err, ParseError::MissingKeys(_)));
}

#[test]
fn test_unsupported_magic() {
    let mut raw = vec![0u8; HEADER_SIZE];
    raw[0x200..0x204].copy_from_slice(b"NCA0");
    let err = NcaHeader::parse(&raw).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedRevision(_)));
}

#[test]
fn test_nca2_filesystem_headers() {
    let mut nca = meta_nca(None, 0);
    let mut plain = nca[..HEADER_SIZE].to_vec();
    crypto::xts_decrypt(&fixtures::HEADER_KEY, &mut plain, 0);
    plain[0x200..0x204].copy_from_slice(b"NCA2");

    let mut encrypted = plain.clone();
    crypto::xts_encrypt(&fixtures::HEADER_KEY, &mut encrypted[..FS_HEADERS], 0);
    for i in 0..4 {
        let start = FS_HEADERS + i * FS_HEADER_SIZE;
        crypto::xts_encrypt(
            &fixtures::HEADER_KEY,
            &mut encrypted[start..start + FS_HEADER_SIZE],
            0,
        );
    }
    nca[..HEADER_SIZE].copy_from_slice(&encrypted);

    let mut cursor = Cursor::new(nca);
    let mut src = StreamSource::new(&mut cursor);
    let header = NcaHeader::read(&mut src, 0, &fixtures::test_keys()).unwrap();
    let section = header.section(0).unwrap();
    assert_eq!(section.fs_type, FsType::PartitionFs);
    assert_eq!(section.encryption, SectionEncryption::Ctr);
}

#[test]
fn test_xts_section_unsupported() {
    let mut raw = vec![0u8; HEADER_SIZE];
    raw[0x200..0x204].copy_from_slice(b"NCA3");
    raw[0x240..0x244].copy_from_slice(&6u32.to_le_bytes());
    raw[0x244..0x248].copy_from_slice(&8u32.to_le_bytes());
    raw[0x402] = 1;
    raw[0x404] = 2;
    let header = NcaHeader::parse(&raw).unwrap();
    let section = header.section(0).unwrap().clone();
    let mut cursor = Cursor::new(vec![0u8; 0x1000]);
    let mut src = StreamSource::new(&mut cursor);
    let err = SectionReader::new(&mut src, 0, section, None).err().unwrap();
    assert!(matches!(err, ParseError::UnsupportedRevision(_)));
}

#[test]
fn test_section_read_offset_overflow() {
    let section = Section {
        start: 0x400,
        end: 0x800,
        fs_type: FsType::PartitionFs,
        encryption: SectionEncryption::None,
        ctr: [0; 8],
        payload_offset: 0,
    };
    let mut cursor = Cursor::new(vec![0u8; 0x800]);
    let mut src = StreamSource::new(&mut cursor);
    let mut reader = SectionReader::new(&mut src, 0, section, None).unwrap();
    assert_eq!(reader.read_at(0x3F0, 0x10).unwrap().len(), 0x10);
    for offset in [u64::MAX, u64::MAX - 0x400] {
        let err = reader.read_at(offset, 0x10).unwrap_err();
        assert!(matches!(err, ParseError::CorruptContainer(_)));
    }
}
