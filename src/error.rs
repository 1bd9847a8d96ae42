//! Error types for the decoder core.

use thiserror::Error;

/// Errors surfaced across the decode boundary.
///
/// MSB-search exhaustion is deliberately not represented here: a frame whose
/// MIC matches no counter candidate is still a decodable, reportable frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input bytes too short or internally inconsistent length fields.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Key string is not valid hex or does not decode to exactly 16 bytes.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Operation not defined for this frame type or key set
    /// (e.g. payload decryption of a Join Accept).
    #[error("unsupported frame operation: {0}")]
    UnsupportedFrameOperation(String),
}

/// Result type alias using DecodeError.
pub type Result<T> = std::result::Result<T, DecodeError>;
