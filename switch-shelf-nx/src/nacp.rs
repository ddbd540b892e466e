//! Application control properties (`control.nacp`).

use switch_shelf_core::util::read_utf8_fixed;
use switch_shelf_core::{DisplayNames, Language, ParseError};

const TITLE_ENTRY_SIZE: usize = 0x300;
const TITLE_NAME_SIZE: usize = 0x200;
const DISPLAY_VERSION: usize = 0x3060;
const DISPLAY_VERSION_SIZE: usize = 0x10;

#[derive(Debug, Clone, Default)]
pub(crate) struct ControlData {
    pub names: DisplayNames,
    pub publisher: Option<String>,
    pub display_version: Option<String>,
}

impl ControlData {
    pub(crate) fn parse(data: &[u8]) -> Result<ControlData, ParseError> {
        if data.len() < DISPLAY_VERSION + DISPLAY_VERSION_SIZE {
            return Err(ParseError::corrupt(format!(
                "control data too small ({} bytes)",
                data.len()
            )));
        }

        let mut names = DisplayNames::new();
        let mut publisher = None;
        for (i, lang) in Language::ALL.iter().enumerate() {
            let entry = &data[i * TITLE_ENTRY_SIZE..][..TITLE_ENTRY_SIZE];
            names.insert(*lang, read_utf8_fixed(&entry[..TITLE_NAME_SIZE]));
            if publisher.is_none() {
                let p = read_utf8_fixed(&entry[TITLE_NAME_SIZE..]);
                if !p.is_empty() {
                    publisher = Some(p);
                }
            }
        }

        let version = read_utf8_fixed(&data[DISPLAY_VERSION..][..DISPLAY_VERSION_SIZE]);
        Ok(ControlData {
            names,
            publisher,
            display_version: (!version.is_empty()).then_some(version),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_parse_names_and_version() {
        let data = fixtures::build_nacp(&[(0, "Space Game"), (2, "スペースゲーム")], "1.0.2");
        let nacp = ControlData::parse(&data).unwrap();
        assert_eq!(nacp.names.get(Language::AmericanEnglish), Some("Space Game"));
        assert_eq!(nacp.names.get(Language::Japanese), Some("スペースゲーム"));
        assert_eq!(nacp.names.len(), 2);
        assert_eq!(nacp.display_version.as_deref(), Some("1.0.2"));
        assert_eq!(nacp.publisher.as_deref(), Some("Test Publisher"));
    }

    #[test]
    fn test_fallback_when_english_missing() {
        let data = fixtures::build_nacp(&[(3, "Jeu")], "");
        let nacp = ControlData::parse(&data).unwrap();
        assert_eq!(nacp.names.primary(), Some("Jeu"));
        assert_eq!(nacp.display_version, None);
    }

    #[test]
    fn test_too_small() {
        assert!(ControlData::parse(&[0u8; 0x100]).is_err());
    }
}
