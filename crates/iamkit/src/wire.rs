//! Policy document wire encoding.
//!
//! IAM returns policy documents percent-encoded with query-string rules:
//! `%XX` escapes plus `+` for space. Documents are sent as plain text.

use thiserror::Error;

/// A policy document that is not valid query-string encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A `%` not followed by two hex digits
    #[error("invalid URL escape {escape:?} at byte {position}")]
    InvalidEscape {
        /// Byte offset of the `%`
        position: usize,
        /// The offending escape, truncated at the end of input
        escape: String,
    },

    /// The decoded bytes are not UTF-8
    #[error("decoded document is not valid UTF-8")]
    InvalidUtf8,
}

/// Decode a wire-form policy document.
pub fn decode_document(wire: &str) -> Result<String, DecodeError> {
    let bytes = wire.as_bytes();
    for (position, _) in wire.match_indices('%') {
        let valid = bytes
            .get(position + 1..position + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (position + 3).min(wire.len());
            return Err(DecodeError::InvalidEscape {
                position,
                escape: String::from_utf8_lossy(&bytes[position..end]).into_owned(),
            });
        }
    }

    let spaced = wire.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Encode a plain policy document into wire form.
pub fn encode_document(document: &str) -> String {
    urlencoding::encode(document).into_owned()
}
