/// Format a byte count with fractional KB/MB/GB (e.g., "1.5 KB", "2.3 GB").
pub fn format_bytes_approx(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KB * KB * KB {
        format!("{:.1} GB", b / (KB * KB * KB))
    } else if b >= KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Read a NUL-terminated UTF-8 string from a fixed-size field.
///
/// Invalid sequences are replaced; surrounding whitespace is trimmed.
pub fn read_utf8_fixed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim().to_string()
}

/// Render bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Derive a display title from a file name such as
/// `Some Game [0100ABCD12340000][v0].nsp`: everything before the first
/// `[` or `(`, trimmed. Falls back to the stem when that is empty.
pub fn title_name_from_file_name(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let cut = stem.find(['[', '(']).unwrap_or(stem.len());
    let name = stem[..cut].trim();
    if name.is_empty() {
        stem.trim().to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_approx() {
        assert_eq!(format_bytes_approx(512), "512 B");
        assert_eq!(format_bytes_approx(1536), "1.5 KB");
        assert_eq!(format_bytes_approx(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_bytes_approx(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_read_utf8_fixed() {
        assert_eq!(read_utf8_fixed(b"Hello\0\0\0garbage"), "Hello");
        assert_eq!(read_utf8_fixed("ポケモン\0".as_bytes()), "ポケモン");
        assert_eq!(read_utf8_fixed(b"  padded  "), "padded");
    }

    #[test]
    fn test_title_name_from_file_name() {
        assert_eq!(
            title_name_from_file_name("Super Game [0100ABCD12340000][v0].nsp"),
            "Super Game"
        );
        assert_eq!(title_name_from_file_name("Other (USA).xci"), "Other");
        assert_eq!(title_name_from_file_name("[0100ABCD12340000].nsp"), "[0100ABCD12340000]");
        assert_eq!(title_name_from_file_name("Plain.nsz"), "Plain");
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x01, 0xAB, 0xFF]), "01abff");
    }
}
