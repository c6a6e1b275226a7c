//! Content fingerprints embedded in cached filenames.

use sha2::{Digest, Sha256};

/// Number of hex characters in a fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Compute the fingerprint of a resource's final byte content.
///
/// SHA-256, hex-encoded, truncated to [`FINGERPRINT_LEN`] characters.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Whether `s` has the shape of a fingerprint.
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_stability() {
        assert_eq!(fingerprint(b"body { color: red }"), fingerprint(b"body { color: red }"));
    }

    #[test]
    fn test_fingerprint_different_content() {
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(b"");
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(is_fingerprint(&fp));
        // sha256("") = e3b0c442...
        assert!(fp.starts_with("e3b0c44298fc1c14"));
    }

    #[test]
    fn test_is_fingerprint_rejects_uppercase_and_length() {
        assert!(!is_fingerprint("E3B0C44298FC1C149AFBF4C8996FB924"));
        assert!(!is_fingerprint("e3b0c442"));
    }
}
