//! Named key slots used to decrypt container metadata.
//!
//! Key files are plain text with one `name = hexvalue` entry per line, the
//! layout used by `prod.keys`. Only parsing is done here; no key derivation.

use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Lookup of key material by slot name (e.g. `header_key`, `titlekek_00`).
pub trait KeyLookup: Send + Sync {
    fn key(&self, name: &str) -> Option<&[u8]>;
}

/// Fetch a slot that must be exactly `N` bytes long.
pub fn key_array<const N: usize>(keys: &dyn KeyLookup, name: &str) -> Option<[u8; N]> {
    keys.key(name).and_then(|k| k.try_into().ok())
}

/// Key slots loaded from a key file.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, Vec<u8>>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name = hex` lines. Comments (`#`, `;`), blank lines and lines
    /// with invalid hex are skipped.
    pub fn parse(text: &str) -> Self {
        let mut keys = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                log::debug!("keys: line {} has no '='", line_no + 1);
                continue;
            };
            match decode_hex(value.trim()) {
                Some(bytes) => {
                    keys.insert(name.trim().to_ascii_lowercase(), bytes);
                }
                None => log::debug!("keys: invalid hex for '{}'", name.trim()),
            }
        }
        Self { keys }
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.keys.insert(name.into().to_ascii_lowercase(), value);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether the header key is present, the minimum for reading anything.
    pub fn has_header_key(&self) -> bool {
        self.key("header_key").is_some_and(|k| k.len() == 32)
    }
}

impl KeyLookup for KeySet {
    fn key(&self, name: &str) -> Option<&[u8]> {
        self.keys
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }
}

/// Decode an even-length hex string.
pub fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || !s.len().is_multiple_of(2) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_file() {
        let text = "\
# comment
header_key = 00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff
KEY_AREA_KEY_APPLICATION_00=0102030405060708090a0b0c0d0e0f10

broken line
titlekek_00 = zz
";
        let keys = KeySet::parse(text);
        assert_eq!(keys.len(), 2);
        assert!(keys.has_header_key());
        let kak: [u8; 16] = key_array(&keys, "key_area_key_application_00").unwrap();
        assert_eq!(kak[0], 0x01);
        assert_eq!(kak[15], 0x10);
        assert!(keys.key("titlekek_00").is_none());
    }

    #[test]
    fn test_key_array_wrong_length() {
        let mut keys = KeySet::new();
        keys.insert("header_key", vec![0u8; 16]);
        assert!(key_array::<32>(&keys, "header_key").is_none());
        assert!(!keys.has_header_key());
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("00ff10"), Some(vec![0x00, 0xFF, 0x10]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex(""), None);
        assert_eq!(decode_hex("é1"), None);
    }
}
