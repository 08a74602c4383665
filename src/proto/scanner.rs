//! Frame scanning: locate complete pipe-terminated lines in a byte buffer,
//! and detect a client speaking TLS on a plaintext port (spec.md §4.2).
//!
//! Mirrors the shape of a non-IRC-protocol sniffer: cheap prefix checks
//! before anything is handed to the line parser.

/// Scan `buf` for complete `|`-terminated lines (or an overridden
/// delimiter), appending each line's bytes (without the delimiter) to
/// `out`. Returns the number of bytes consumed from the front of `buf`.
pub fn split_lines(buf: &[u8], delimiter: u8, out: &mut Vec<Vec<u8>>) -> usize {
    let mut consumed = 0;
    let mut start = 0;
    for (i, &b) in buf.iter().enumerate() {
        if b == delimiter {
            out.push(buf[start..i].to_vec());
            start = i + 1;
            consumed = start;
        }
    }
    consumed
}

/// A TLS ClientHello on a plaintext port starts with the record header
/// `0x16 0x03 <minor>` — detect just the first two bytes, matching
/// spec.md §4.2's "bytes 0x16 0x03 at offset 0".
pub fn looks_like_tls_hello(buf: &[u8]) -> bool {
    buf.len() >= 2 && buf[0] == 0x16 && buf[1] == 0x03
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_complete_lines() {
        let mut out = Vec::new();
        let consumed = split_lines(b"$Key abc|$ValidateNick bob|partial", b'|', &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], b"$Key abc");
        assert_eq!(out[1], b"$ValidateNick bob");
        assert_eq!(consumed, b"$Key abc|$ValidateNick bob|".len());
    }

    #[test]
    fn no_delimiter_consumes_nothing() {
        let mut out = Vec::new();
        let consumed = split_lines(b"no delimiter here", b'|', &mut out);
        assert_eq!(consumed, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn detects_tls_client_hello() {
        assert!(looks_like_tls_hello(&[0x16, 0x03, 0x01, 0x00]));
        assert!(!looks_like_tls_hello(b"$Key abc|"));
    }
}
