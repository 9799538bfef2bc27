//! Content identity: bullet ids and dedup hashes.
//!
//! Both derive from SHA-256 over a normalized form of the content, but they
//! normalize differently. The id only lowercases and trims, and keeps 12 hex
//! chars. The content hash also collapses internal whitespace and keeps the
//! full digest, so it is the key used for exact-duplicate detection.

use sha2::{Digest, Sha256};

/// Number of hex chars kept for a derived bullet id.
pub const ID_HEX_LEN: usize = 12;

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Deterministic id for `content`: lowercased, trimmed, hashed, truncated.
pub fn derive_id(content: &str) -> String {
    let normalized = content.trim().to_lowercase();
    let mut hex = sha256_hex(&normalized);
    hex.truncate(ID_HEX_LEN);
    hex
}

/// Lowercase `content` and collapse every whitespace run into a single space.
pub fn normalize_for_hash(content: &str) -> String {
    content
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full SHA-256 hex of the whitespace-collapsed, lowercased content.
pub fn content_hash(content: &str) -> String {
    sha256_hex(&normalize_for_hash(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ignores_case_and_outer_whitespace() {
        assert_eq!(
            derive_id("  Use a Number Line  "),
            derive_id("use a number line")
        );
        assert_eq!(derive_id("x").len(), ID_HEX_LEN);
    }

    #[test]
    fn id_keeps_inner_whitespace() {
        assert_ne!(derive_id("use  a number line"), derive_id("use a number line"));
    }

    #[test]
    fn hash_collapses_inner_whitespace() {
        assert_eq!(
            content_hash("Use\ta   number\nline"),
            content_hash("use a number line")
        );
        assert_eq!(content_hash("x").len(), 64);
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash("add tens first"), content_hash("add ones first"));
    }
}
