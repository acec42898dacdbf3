//! Payload encoding.
//!
//! A payload is UTF-8 text stored from the start page onward, zero padded
//! to a whole number of pages. Reading stops at the first zero byte, so a
//! payload may not contain NUL itself.

use spotirfid_core::constants::PAGE_SIZE;
use spotirfid_hardware::{PageData, ZERO_PAGE};

use crate::error::{Result, TagError};

/// Split `text` into zero-padded pages.
///
/// # Errors
///
/// Returns [`TagError::InvalidPayload`] for an empty payload or one that
/// contains a NUL byte.
///
/// # Examples
///
/// ```
/// use spotirfid_rfid::payload::encode_payload;
///
/// let pages = encode_payload("hello").unwrap();
/// assert_eq!(pages, vec![*b"hell", *b"o\0\0\0"]);
/// ```
pub fn encode_payload(text: &str) -> Result<Vec<PageData>> {
    if text.is_empty() {
        return Err(TagError::invalid_payload("payload is empty"));
    }
    if text.as_bytes().contains(&0) {
        return Err(TagError::invalid_payload("payload contains a NUL byte"));
    }

    Ok(text
        .as_bytes()
        .chunks(PAGE_SIZE)
        .map(|chunk| {
            let mut page = ZERO_PAGE;
            page[..chunk.len()].copy_from_slice(chunk);
            page
        })
        .collect())
}

/// Reassemble text from pages, dropping the zero padding.
///
/// Bytes after the first zero are padding or stale memory and are ignored.
/// Invalid UTF-8 is replaced rather than rejected so a damaged tag still
/// produces a reportable payload.
pub fn decode_payload(pages: &[PageData]) -> String {
    let bytes: Vec<u8> = pages
        .iter()
        .flatten()
        .copied()
        .take_while(|b| *b != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Returns `true` if the encoded payload needs a terminator page to be
/// read back, i.e. its last page carries no padding.
pub fn needs_terminator(pages: &[PageData]) -> bool {
    pages.last().is_some_and(|page| page[PAGE_SIZE - 1] != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", 1)]
    #[case("abcd", 1)]
    #[case("abcde", 2)]
    #[case("spotify:album:6jbtHi5R0jMXoliU2OS0lo", 9)]
    fn test_page_count(#[case] text: &str, #[case] pages: usize) {
        assert_eq!(encode_payload(text).unwrap().len(), pages);
    }

    #[test]
    fn test_last_page_zero_padded() {
        let pages = encode_payload("spotify:track:abc").unwrap();
        assert_eq!(pages.last(), Some(&[b'c', 0, 0, 0]));
    }

    #[rstest]
    #[case("")]
    #[case("ab\0cd")]
    fn test_rejects_unstorable(#[case] text: &str) {
        assert!(matches!(
            encode_payload(text),
            Err(TagError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_decode_stops_at_padding() {
        let pages = [*b"MAST", *b"ER_T", *b"AG\0\0", *b"junk"];
        assert_eq!(decode_payload(&pages), "MASTER_TAG");
    }

    #[test]
    fn test_decode_multibyte() {
        let pages = encode_payload("café ☕").unwrap();
        assert_eq!(decode_payload(&pages), "café ☕");
    }

    #[test]
    fn test_needs_terminator() {
        assert!(needs_terminator(&encode_payload("abcd").unwrap()));
        assert!(!needs_terminator(&encode_payload("abc").unwrap()));
    }
}
