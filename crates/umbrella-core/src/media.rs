//! Encoded media helpers
//!
//! Media bytes are never decoded. The pipeline only needs the media type a
//! data URI declares and a bounded excerpt of the encoded text.

use lazy_static::lazy_static;
use regex::Regex;

/// Characters of encoded content quoted into a stage-1 prompt
pub const EXCERPT_CHARS: usize = 100;

lazy_static! {
    /// `data:<type>/<subtype>[;param]*,` prefix of a data URI
    static ref DATA_URI: Regex = Regex::new(
        r"^data:(?P<mime>[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*)?(?:;[^,]*)?,"
    ).unwrap();
}

/// Media type declared by a data URI, lowercased. `None` for anything that is
/// not a data URI or declares no type.
pub fn declared_media_type(encoded: &str) -> Option<String> {
    DATA_URI
        .captures(encoded)
        .and_then(|caps| caps.name("mime"))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// First `max_chars` characters of the encoded form, cut on a char boundary.
pub fn excerpt(encoded: &str, max_chars: usize) -> &str {
    match encoded.char_indices().nth(max_chars) {
        Some((idx, _)) => &encoded[..idx],
        None => encoded,
    }
}
