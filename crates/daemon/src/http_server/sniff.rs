//! Magic-number content classification.

/// Length of the prefix read for sniffing. An object at most this
/// large is consumed entirely by the sniff.
pub const SNIFF_LEN: usize = 64;

/// Classify a content prefix.
///
/// Known magic numbers win; otherwise the prefix is called text when
/// it is free of binary control bytes.
pub fn detect(prefix: &[u8]) -> &'static str {
    if prefix.is_empty() {
        return "application/octet-stream";
    }
    if let Some(kind) = infer::get(prefix) {
        return kind.mime_type();
    }
    if looks_text(prefix) {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

/// Control bytes outside the usual whitespace/escape set mark the
/// prefix as binary.
fn looks_text(prefix: &[u8]) -> bool {
    !prefix.iter().any(|&b| {
        b <= 0x08 || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_magic() {
        let prefix = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x01];
        assert_eq!(detect(&prefix), "image/png");
    }

    #[test]
    fn test_jpeg_magic() {
        assert_eq!(detect(&[0xff, 0xd8, 0xff, 0xe0, 0x00]), "image/jpeg");
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(detect(b"hello, world\n"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_binary_fallback() {
        assert_eq!(detect(&[0x00, 0x01, 0x02, 0x03]), "application/octet-stream");
    }

    #[test]
    fn test_empty_prefix() {
        assert_eq!(detect(&[]), "application/octet-stream");
    }
}
