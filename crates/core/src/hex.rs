//! Hex dump formatting for traffic logs.

use std::fmt::Write;

/// Format bytes as a colon-separated hex dump, e.g. `0A:0B:0C:FF`.
pub fn fmt_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_hex() {
        assert_eq!(fmt_hex(&[]), "");
        assert_eq!(fmt_hex(&[0x0A]), "0A");
        assert_eq!(fmt_hex(&[0x0A, 0x0B, 0xFF]), "0A:0B:FF");
    }
}
