//! LoRaWAN session key handling
//!
//! - NwkSKey for MIC verification on data frames
//! - AppSKey for application payload decryption and join-frame MIC checks
//!
//! Keys arrive as optional hex strings and live only for the duration of
//! one decode call; nothing here persists them.

use crate::error::{DecodeError, Result};

/// A 16-byte AES-128 key.
pub type AesKey = [u8; 16];

/// Optional session key pair supplied with a decode request.
#[derive(Debug, Clone, Default)]
pub struct SessionKeys {
    pub app_s_key: Option<AesKey>,
    pub nwk_s_key: Option<AesKey>,
}

impl SessionKeys {
    /// Parse keys from hex strings. `None` or an empty string means
    /// "no key supplied"; anything else must be exactly 32 hex characters.
    pub fn from_hex(app_s_key: Option<&str>, nwk_s_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            app_s_key: parse_key("AppSKey", app_s_key)?,
            nwk_s_key: parse_key("NwkSKey", nwk_s_key)?,
        })
    }
}

fn parse_key(name: &str, value: Option<&str>) -> Result<Option<AesKey>> {
    let text = match value {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };

    let bytes = hex::decode(text)
        .map_err(|e| DecodeError::InvalidKeyEncoding(format!("{} is not valid hex: {}", name, e)))?;
    let key: AesKey = bytes.try_into().map_err(|b: Vec<u8>| {
        DecodeError::InvalidKeyEncoding(format!(
            "{} must decode to 16 bytes, got {}",
            name,
            b.len()
        ))
    })?;
    Ok(Some(key))
}
