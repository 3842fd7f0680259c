//! Text decoding for database strings
//!
//! The legacy v4 format stores GBK text, the IPDB v6 format stores UTF-8.
//! Both are decoded into canonical UTF-8 here; invalid byte runs never
//! surface as errors, they are replaced by a caller-supplied placeholder.

use encoding::all::GBK;
use encoding::{DecoderTrap, Encoding};
use std::fmt;

/// Text encoding of strings stored in a database image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoder {
    /// GBK / GB2312 double-byte text (qqwry.dat)
    Gbk,
    /// UTF-8 text (IPDB)
    Utf8,
}

/// Raised when a byte run is not valid in the decoder's encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Encoding that rejected the bytes
    pub decoder: TextDecoder,
    /// Decoder-specific reason
    pub reason: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {:?} text: {}", self.decoder, self.reason)
    }
}

impl std::error::Error for DecodeError {}

impl TextDecoder {
    /// Decode strictly, reporting invalid input
    pub fn try_decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            TextDecoder::Gbk => GBK
                .decode(bytes, DecoderTrap::Strict)
                .map_err(|reason| DecodeError {
                    decoder: self,
                    reason: reason.into_owned(),
                }),
            TextDecoder::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| DecodeError {
                    decoder: self,
                    reason: e.to_string(),
                }),
        }
    }

    /// Decode, substituting `placeholder` for invalid input
    pub fn decode(self, bytes: &[u8], placeholder: &str) -> String {
        match self.try_decode(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("{}; using placeholder", e);
                placeholder.to_string()
            }
        }
    }
}
