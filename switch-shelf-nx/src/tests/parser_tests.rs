use super::*;
use std::io::Cursor;

use switch_shelf_core::{ContentType, KeySet, Language, TitleId};

use crate::fixtures::{self, TitleSpec};

const BASE: u64 = 0x0100_ABCD_1234_0000;
const UPDATE: u64 = 0x0100_ABCD_1234_0800;
const ADDON: u64 = 0x0100_ABCD_1234_1001;

fn parse(data: Vec<u8>, keys: &KeySet) -> Result<Vec<DecodedContent>, ParseError> {
    let mut cursor = Cursor::new(data);
    parse_container(&mut cursor, keys)
}

#[test]
fn test_detect_layout() {
    let mut nsp = Cursor::new(fixtures::build_nsp(&[TitleSpec::addon(ADDON)]));
    assert_eq!(detect_layout(&mut nsp).unwrap(), Layout::Package);
    let mut xci = Cursor::new(fixtures::build_xci(&[TitleSpec::addon(ADDON)]));
    assert_eq!(detect_layout(&mut xci).unwrap(), Layout::Gamecard);
    let mut junk = Cursor::new(vec![0x55u8; 0x400]);
    assert!(matches!(
        detect_layout(&mut junk),
        Err(ParseError::CorruptContainer(_))
    ));
}

#[test]
fn test_base_package_with_control_data() {
    let nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game")]);
    let contents = parse(nsp, &fixtures::test_keys()).unwrap();
    assert_eq!(contents.len(), 1);
    let c = &contents[0];
    assert_eq!(c.title_id, TitleId::new(BASE));
    assert_eq!(c.content_type(), ContentType::Base);
    assert_eq!(c.version, 0);
    assert_eq!(c.names.get(Language::AmericanEnglish), Some("Space Game"));
    assert_eq!(c.display_version.as_deref(), Some("1.0.0"));
    assert_eq!(c.publisher.as_deref(), Some("Test Publisher"));
}

#[test]
fn test_update_with_title_key() {
    let nsp = fixtures::build_nsp(&[TitleSpec::update(UPDATE, 65536, "1.0.1").with_ticket()]);
    let contents = parse(nsp, &fixtures::test_keys()).unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].content_type(), ContentType::Update);
    assert_eq!(contents[0].version, 65536);
    assert_eq!(contents[0].display_version.as_deref(), Some("1.0.1"));
}

#[test]
fn test_addon_has_no_names() {
    let nsp = fixtures::build_nsp(&[TitleSpec::addon(ADDON)]);
    let contents = parse(nsp, &fixtures::test_keys()).unwrap();
    assert_eq!(contents[0].content_type(), ContentType::AddOn);
    assert_eq!(contents[0].title_id.base_id(), TitleId::new(BASE));
    assert!(contents[0].names.is_empty());
}

#[test]
fn test_multi_content_package() {
    let nsp = fixtures::build_nsp(&[
        TitleSpec::base(BASE, "Space Game"),
        TitleSpec::update(UPDATE, 131072, "1.0.2"),
        TitleSpec::addon(ADDON),
    ]);
    let contents = parse(nsp, &fixtures::test_keys()).unwrap();
    let ids: Vec<u64> = contents.iter().map(|c| c.title_id.raw()).collect();
    assert_eq!(ids, vec![BASE, UPDATE, ADDON]);
}

#[test]
fn test_gamecard_image() {
    let xci = fixtures::build_xci(&[TitleSpec::base(BASE, "Card Game")]);
    let contents = parse(xci, &fixtures::test_keys()).unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].names.primary(), Some("Card Game"));
}

#[test]
fn test_gamecard_hash_mismatch_is_corrupt() {
    let mut xci = fixtures::build_xci(&[TitleSpec::base(BASE, "Card Game")]);
    let meta_offset = {
        let mut cursor = Cursor::new(xci.clone());
        let mut src = StreamSource::new(&mut cursor);
        let secure = xci::secure_partition(&mut src).unwrap();
        secure.with_suffix(".cnmt.nca").next().unwrap().offset as usize
    };
    xci[meta_offset + 0x10] ^= 0xFF;
    let err = parse(xci, &fixtures::test_keys()).unwrap_err();
    assert!(matches!(err, ParseError::CorruptContainer(ref m) if m.contains("hash")));
}

#[test]
fn test_missing_header_key() {
    let nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game")]);
    let err = parse(nsp, &KeySet::new()).unwrap_err();
    assert!(matches!(err, ParseError::MissingKeys(_)));
}

#[test]
fn test_wrong_header_key() {
    let nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game")]);
    let mut keys = fixtures::test_keys();
    keys.insert("header_key", vec![0xEE; 32]);
    let err = parse(nsp, &keys).unwrap_err();
    assert!(matches!(err, ParseError::MissingKeys(_)));
}

#[test]
fn test_missing_title_kek() {
    let nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game").with_ticket()]);
    let mut keys = KeySet::new();
    keys.insert("header_key", fixtures::HEADER_KEY.to_vec());
    keys.insert("key_area_key_application_00", fixtures::KEY_AREA_KEY.to_vec());
    let err = parse(nsp, &keys).unwrap_err();
    assert!(matches!(err, ParseError::MissingKeys(ref m) if m.contains("titlekek_00")));
}

#[test]
fn test_newer_key_generation_needs_newer_key() {
    let nsp = fixtures::build_nsp(&[TitleSpec::addon(ADDON).with_key_generation(3)]);
    let err = parse(nsp, &fixtures::test_keys()).unwrap_err();
    assert!(
        matches!(err, ParseError::MissingKeys(ref m) if m.contains("key_area_key_application_02"))
    );
}

#[test]
fn test_truncated_package() {
    let mut nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game")]);
    nsp.truncate(0x400);
    let err = parse(nsp, &fixtures::test_keys()).unwrap_err();
    assert!(matches!(err, ParseError::CorruptContainer(_)));
}

#[test]
fn test_package_without_meta() {
    let nsp = fixtures::build_pfs0(&[("readme.txt", b"hello".to_vec())]);
    let err = parse(nsp, &fixtures::test_keys()).unwrap_err();
    assert!(matches!(err, ParseError::CorruptContainer(_)));
}

#[test]
fn test_nx_parser_on_disk_and_split() {
    let tmp = tempfile::tempdir().unwrap();
    let parser = NxParser::new(Arc::new(fixtures::test_keys()));
    let nsp = fixtures::build_nsp(&[TitleSpec::base(BASE, "Space Game")]);

    let single = tmp.path().join("Space Game.nsp");
    std::fs::write(&single, &nsp).unwrap();
    let contents = parser.parse(&[single.as_path()]).unwrap();
    assert_eq!(contents[0].title_id, TitleId::new(BASE));

    let (first, second) = nsp.split_at(nsp.len() / 2);
    let v0 = tmp.path().join("Split.nsp.00");
    let v1 = tmp.path().join("Split.nsp.01");
    std::fs::write(&v0, first).unwrap();
    std::fs::write(&v1, second).unwrap();
    let contents = parser.parse(&[v0.as_path(), v1.as_path()]).unwrap();
    assert_eq!(contents[0].names.primary(), Some("Space Game"));

    let err = parser.parse(&[v1.as_path()]).unwrap_err();
    assert!(matches!(err, ParseError::IncompleteSplitSet(_)));
}

#[test]
fn test_parser_extensions() {
    let parser = NxParser::new(Arc::new(KeySet::new()));
    assert!(parser.file_extensions().contains(&"xcz"));
}
