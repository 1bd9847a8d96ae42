//! Wire input handling: hex/Base64 detection and decoding.
//!
//! Frame text arrives either hex- or Base64-encoded. Classification is a
//! heuristic over the character set, not a validated encoding check: any
//! string made only of hex digits is treated as hex (the empty string
//! included), everything else as Base64. Malformed Base64 is only caught
//! when the bytes are actually decoded.

use base64::Engine;
use serde::Serialize;
use std::fmt;

use crate::error::{DecodeError, Result};

/// Detected input encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Hex,
    Base64,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Hex => write!(f, "hex"),
            Encoding::Base64 => write!(f, "base64"),
        }
    }
}

/// Classify frame text as hex or Base64.
pub fn detect_encoding(text: &str) -> Encoding {
    if text.chars().all(|c| c.is_ascii_hexdigit()) {
        Encoding::Hex
    } else {
        Encoding::Base64
    }
}

/// Decode frame text into raw bytes per the detected encoding.
pub fn decode_input(text: &str) -> Result<(Encoding, Vec<u8>)> {
    let encoding = detect_encoding(text);
    let bytes = match encoding {
        Encoding::Hex => hex::decode(text)
            .map_err(|e| DecodeError::MalformedFrame(format!("invalid hex input: {}", e)))?,
        Encoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| DecodeError::MalformedFrame(format!("invalid base64 input: {}", e)))?,
    };
    Ok((encoding, bytes))
}
