use super::*;

fn id(s: &str) -> TitleId {
    s.parse().unwrap()
}

#[test]
fn test_classify_base_update_addon() {
    assert_eq!(id("0100ABCD12340000").classify(), Some(ContentType::Base));
    assert_eq!(id("0100ABCD12340800").classify(), Some(ContentType::Update));
    assert_eq!(id("0100ABCD12341001").classify(), Some(ContentType::AddOn));
    assert_eq!(id("0100ABCD12341FFF").classify(), Some(ContentType::AddOn));
}

#[test]
fn test_malformed_id() {
    let bad = id("0100ABCD12340123");
    assert_eq!(bad.classify(), None);
    assert!(!bad.is_well_formed());
}

#[test]
fn test_base_id_derivation() {
    let base = id("01007EF00011E000");
    assert_eq!(id("01007EF00011E800").base_id(), base);
    assert_eq!(id("01007EF00011F001").base_id(), base);
    assert_eq!(id("01007EF00011F0A3").base_id(), base);
    assert_eq!(base.base_id(), base);
    assert_eq!(id("01007EF00011F001").update_id(), id("01007EF00011E800"));
}

#[test]
fn test_display_and_parse() {
    let tid = TitleId::new(0x0100_0000_0001_0000);
    assert_eq!(tid.to_string(), "0100000000010000");
    assert_eq!(tid.to_lower_hex(), "0100000000010000");
    assert_eq!(id("0100abcd12340000"), id("0100ABCD12340000"));
    assert_eq!(id("0x0100ABCD12340000").raw(), 0x0100_ABCD_1234_0000);
    assert!("0100ABCD1234".parse::<TitleId>().is_err());
    assert!("0100ABCD1234000G".parse::<TitleId>().is_err());
}

#[test]
fn test_serde_as_hex_string() {
    let tid = id("0100ABCD12340800");
    assert_eq!(serde_json::to_string(&tid).unwrap(), "\"0100ABCD12340800\"");
    let back: TitleId = serde_json::from_str("\"0100abcd12340800\"").unwrap();
    assert_eq!(back, tid);
    assert!(serde_json::from_str::<TitleId>("\"nope\"").is_err());
}

#[test]
fn test_content_type_tags() {
    assert_eq!(ContentType::Base.tag(), "BASE");
    assert_eq!(ContentType::Update.tag(), "UPD");
    assert_eq!(ContentType::AddOn.tag(), "DLC");
}
