//! # lora-decoder
//!
//! Decodes a raw LoRaWAN MAC-layer frame (hex- or Base64-encoded) into a
//! structured, human-readable report. When session keys are supplied the
//! decoder also validates the frame's MIC (brute-forcing the untransmitted
//! high 16 bits of the 32-bit frame counter) and decrypts the application
//! payload.
//!
//! The single entry point is [`decode`]; everything it returns is plain data
//! for the caller (CLI, HTTP handler, UI) to present. One frame per call,
//! no state kept between calls.
//!
//! ```no_run
//! let report = lora_decoder::decode(
//!     "40F17DBE4900020001954378762B11FF0D",
//!     Some("ec925802ae430ca77fd3dd73cb2cc588"),
//!     Some("44024241ed4ce9a68c6a8bc055233fd3"),
//! )?;
//! println!("{}", report.decoded);
//! # Ok::<(), lora_decoder::DecodeError>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod lorawan;
pub mod report;
pub mod wire;

pub use decode::{decode, DecodedReport, Property};
pub use error::{DecodeError, Result};
