//! FRMPayload encryption/decryption.
//!
//! LoRaWAN data payloads are XORed against an AES-CTR-style keystream: one
//! A block per 16 bytes of payload, encrypted with the session key, with the
//! final block truncated to the payload length. The operation is symmetric,
//! so this "decrypt" also encrypts.
//!
//! Key selection follows 1.0.x: AppSKey for application ports, NwkSKey for
//! FPort 0 (MAC commands). Join Accept payloads use a different construction
//! entirely and are not handled here.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use super::keys::{AesKey, SessionKeys};
use super::Frame;
use crate::error::{DecodeError, Result};

/// Decrypt a data frame's FRMPayload. `msb` supplies the high 16 bits of
/// the 32-bit frame counter (0 when unknown).
pub fn decrypt_frm_payload(frame: &Frame, keys: &SessionKeys, msb: Option<u16>) -> Result<Vec<u8>> {
    let f = match frame {
        Frame::Data(f) => f,
        Frame::JoinRequest(_) | Frame::JoinAccept(_) => {
            return Err(DecodeError::UnsupportedFrameOperation(
                "join frame payloads cannot be decrypted with session keys".into(),
            ))
        }
        Frame::Proprietary(_) | Frame::Rfu(_) => {
            return Err(DecodeError::UnsupportedFrameOperation(
                "payload decryption is only defined for data frames".into(),
            ))
        }
    };

    let key: AesKey = match f.f_port {
        Some(0) => keys.nwk_s_key.ok_or_else(|| {
            DecodeError::UnsupportedFrameOperation(
                "FPort 0 payload requires the network session key".into(),
            )
        })?,
        _ => keys.app_s_key.ok_or_else(|| {
            DecodeError::UnsupportedFrameOperation(
                "payload decryption requires the application session key".into(),
            )
        })?,
    };

    let cipher = Aes128::new((&key).into());
    let fcnt32 = (msb.unwrap_or(0) as u32) << 16 | f.fcnt as u32;

    let mut out = Vec::with_capacity(f.frm_payload.len());
    for (i, chunk) in f.frm_payload.chunks(16).enumerate() {
        // A block per LoRaWAN 1.0.x, block index is 1-based
        let mut block = [0u8; 16];
        block[0] = 0x01;
        block[5] = f.direction().to_byte();
        block[6..10].copy_from_slice(&f.dev_addr.to_le_bytes());
        block[10..14].copy_from_slice(&fcnt32.to_le_bytes());
        block[15] = (i + 1) as u8;

        cipher.encrypt_block((&mut block).into());
        out.extend(chunk.iter().zip(block.iter()).map(|(c, k)| c ^ k));
    }

    Ok(out)
}
