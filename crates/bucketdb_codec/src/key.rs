//! Key encoding.

/// Returns the stored form of a string key: its UTF-8 bytes.
#[must_use]
pub fn encode_key(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

/// Renders a stored key for display in listings.
///
/// Invalid UTF-8 sequences are replaced with `U+FFFD`.
#[must_use]
pub fn decode_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
