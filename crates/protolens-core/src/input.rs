//! Normalization of pasted payload text into bytes.
//!
//! Payloads arrive as text: either hex (optionally split by whitespace
//! and/or `0x`-prefixed) or base64. Hex wins whenever every character left
//! after stripping whitespace and `0x` markers is a lowercase hex digit.

use crate::error::{Error, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use tracing::trace;

/// Which text encoding a payload was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Hexadecimal digits
    Hex,
    /// Base64, in any of the accepted alphabets
    Base64,
}

/// Decodes payload text into bytes.
///
/// Empty (or whitespace-only) text yields an empty buffer.
pub fn parse_payload(text: &str) -> Result<Vec<u8>> {
    parse_payload_with_encoding(text).map(|(bytes, _)| bytes)
}

/// Like [`parse_payload`], also reporting which encoding was detected.
pub fn parse_payload_with_encoding(text: &str) -> Result<(Vec<u8>, PayloadEncoding)> {
    let hex_digits: String = text
        .split_whitespace()
        .map(|token| token.strip_prefix("0x").unwrap_or(token))
        .collect();

    if hex_digits.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        trace!("Payload looks like hex ({} digits)", hex_digits.len());
        return Ok((hex::decode(&hex_digits)?, PayloadEncoding::Hex));
    }

    let compact: String = text.split_whitespace().collect();
    trace!("Payload looks like base64 ({} chars)", compact.len());
    decode_base64(&compact).map(|bytes| (bytes, PayloadEncoding::Base64))
}

/// Tries the standard alphabet first, then the URL-safe one, each with and
/// without padding. The error reported is the one from the standard engine.
fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let first = match STANDARD.decode(text) {
        Ok(bytes) => return Ok(bytes),
        Err(e) => e,
    };

    [STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(text).ok())
        .ok_or(Error::InvalidBase64(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_hex() {
        let (bytes, encoding) = parse_payload_with_encoding("089601").unwrap();
        assert_eq!(bytes, vec![0x08, 0x96, 0x01]);
        assert_eq!(encoding, PayloadEncoding::Hex);
    }

    #[test]
    fn test_spaced_and_prefixed_hex() {
        assert_eq!(parse_payload("08 96 01").unwrap(), vec![0x08, 0x96, 0x01]);
        assert_eq!(
            parse_payload("0x08 0x96\n0x01").unwrap(),
            vec![0x08, 0x96, 0x01]
        );
        assert_eq!(parse_payload("0x089601").unwrap(), vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_payload("").unwrap().is_empty());
        assert!(parse_payload("  \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_odd_hex_is_error() {
        assert!(matches!(parse_payload("abc"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_base64() {
        // 08 96 01 12 07 "testing"
        let (bytes, encoding) = parse_payload_with_encoding("CJYBEgd0ZXN0aW5n").unwrap();
        assert_eq!(encoding, PayloadEncoding::Base64);
        assert_eq!(bytes[..3], [0x08, 0x96, 0x01]);
        assert_eq!(&bytes[5..], b"testing");
    }

    #[test]
    fn test_base64_variants() {
        // Unpadded and URL-safe forms of 0xfb 0xff
        assert_eq!(parse_payload("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(parse_payload("+/8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(parse_payload("-_8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(parse_payload("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_uppercase_hex_goes_to_base64() {
        // "CAFE" is valid base64 as well as uppercase hex
        let (_, encoding) = parse_payload_with_encoding("CAFE").unwrap();
        assert_eq!(encoding, PayloadEncoding::Base64);
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(matches!(
            parse_payload("not base64 at all!"),
            Err(Error::InvalidBase64(_))
        ));
    }
}
