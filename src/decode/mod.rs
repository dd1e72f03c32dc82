//! decode
//!
//! Content decoding boundary for recovered blob bytes.
//!
//! # Design
//!
//! Decoding is a pure function: bytes in, bytes out, with a typed error on
//! malformed input. The aggregator applies the decoder per blob; a decode
//! failure annotates that one blob and never blocks other items. Keeping
//! this behind a trait lets callers substitute richer decoders (encoding
//! detection, binary filtering) without touching the graph logic.

use thiserror::Error;

/// Errors from content decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The bytes are not valid in the decoder's expected encoding.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Pure content decoder: raw stored bytes to presentable bytes.
pub trait ContentDecoder: Send + Sync {
    /// Decode raw blob bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] on any input the decoder cannot handle.
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

/// Strict UTF-8 decoder: passes valid UTF-8 through unchanged and rejects
/// everything else. Binary blobs are reported by id and size only.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Decoder;

impl ContentDecoder for Utf8Decoder {
    fn decode(&self, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match std::str::from_utf8(raw) {
            Ok(_) => Ok(raw.to_vec()),
            Err(e) => Err(DecodeError::InvalidEncoding(format!(
                "not valid UTF-8 at byte {}",
                e.valid_up_to()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_passes_through() {
        let decoder = Utf8Decoder;
        let decoded = decoder.decode(b"SECRET=xyz\n").unwrap();
        assert_eq!(decoded, b"SECRET=xyz\n");
    }

    #[test]
    fn empty_input_is_valid() {
        assert_eq!(Utf8Decoder.decode(b"").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = Utf8Decoder.decode(&[0x66, 0x6f, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding(_)));
    }

    #[test]
    fn control_characters_are_still_valid_utf8() {
        // Control bytes like ^V (0x16) are valid UTF-8; rendering them is
        // the presentation layer's problem, not a decode failure.
        assert!(Utf8Decoder.decode(&[0x16, 0x0a]).is_ok());
    }
}
