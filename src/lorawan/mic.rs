//! Message Integrity Code computation, verification and frame-counter
//! MSB recovery.
//!
//! Data frames are authenticated with CMAC-AES128(NwkSKey, B0 | msg) where
//! B0 carries direction, DevAddr and the full 32-bit frame counter. Join
//! frames use CMAC-AES128 over the raw frame bytes with the application key;
//! the network key plays no role there (LoRaWAN 1.0.x).
//!
//! Only the low 16 bits of the frame counter are on the wire. When the
//! caller tracks no per-device state, the high 16 bits have to be recovered
//! by brute force: up to 65,536 CMAC evaluations per frame. That search is
//! the dominant cost of a keyed decode and is intentional.

use aes::Aes128;
use cmac::{Cmac, Mac};
use tracing::debug;

use super::keys::{AesKey, SessionKeys};
use super::{DataFrame, Frame};
use crate::error::{DecodeError, Result};

/// Outcome of the frame-counter MSB brute-force search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecovery {
    pub found: bool,
    /// Lowest MSB candidate whose MIC matched, when any did.
    pub msb: Option<u16>,
    /// Highest candidate evaluated: the matching one, or 0xFFFF after an
    /// exhaustive miss (exhaustion is a reportable result, not an error).
    pub searched_up_to: u16,
}

/// Format an MSB value as the 4-character uppercase hex the report uses.
pub fn format_msb(value: u16) -> String {
    format!("{:04X}", value)
}

/// Compute the MIC for a frame. For data frames `msb` supplies the high
/// 16 bits of the 32-bit counter (0 when absent); join frames ignore it.
pub fn compute_mic(frame: &Frame, keys: &SessionKeys, msb: Option<u16>) -> Result<[u8; 4]> {
    match frame {
        Frame::Data(f) => {
            let key = nwk_key(keys)?;
            Ok(data_mic(&key, f, &f.mic_message(), msb.unwrap_or(0)))
        }
        Frame::JoinRequest(f) => Ok(cmac4(&app_key(keys)?, &[&f.mic_message()])),
        Frame::JoinAccept(f) => Ok(cmac4(&app_key(keys)?, &[&f.mic_message()])),
        Frame::Proprietary(_) | Frame::Rfu(_) => Err(DecodeError::UnsupportedFrameOperation(
            "no MIC definition for proprietary/RFU frames".into(),
        )),
    }
}

/// Check the computed MIC against the one embedded in the frame.
pub fn verify_mic(frame: &Frame, keys: &SessionKeys, msb: Option<u16>) -> Result<bool> {
    Ok(compute_mic(frame, keys, msb)? == frame.mic())
}

/// Brute-force the unobserved high 16 bits of the frame counter.
///
/// Candidates are tried in ascending order, 0 through 65535, and the first
/// match wins: among all high-counter values that validate, the lowest is
/// the most likely (counters rarely wrap even once). Deterministic for a
/// fixed frame and key set.
pub fn recover_fcnt_msb(frame: &Frame, keys: &SessionKeys) -> Result<CounterRecovery> {
    let f = match frame {
        Frame::Data(f) => f,
        _ => {
            return Err(DecodeError::UnsupportedFrameOperation(
                "counter recovery is only defined for data frames".into(),
            ))
        }
    };
    let key = nwk_key(keys)?;
    let msg = f.mic_message();

    for candidate in 0..=u16::MAX {
        if data_mic(&key, f, &msg, candidate) == f.mic {
            debug!(msb = candidate, "frame counter MSB recovered");
            return Ok(CounterRecovery {
                found: true,
                msb: Some(candidate),
                searched_up_to: candidate,
            });
        }
    }

    debug!("frame counter MSB search exhausted without a match");
    Ok(CounterRecovery {
        found: false,
        msb: None,
        searched_up_to: u16::MAX,
    })
}

/// MIC of a data frame for one 32-bit counter candidate.
fn data_mic(key: &AesKey, f: &DataFrame, msg: &[u8], msb: u16) -> [u8; 4] {
    let fcnt32 = (msb as u32) << 16 | f.fcnt as u32;

    // B0 block per LoRaWAN 1.0.x
    let mut b0 = [0u8; 16];
    b0[0] = 0x49;
    b0[5] = f.direction().to_byte();
    b0[6..10].copy_from_slice(&f.dev_addr.to_le_bytes());
    b0[10..14].copy_from_slice(&fcnt32.to_le_bytes());
    b0[15] = msg.len() as u8;

    cmac4(key, &[&b0, msg])
}

fn cmac4(key: &AesKey, parts: &[&[u8]]) -> [u8; 4] {
    let mut mac = Cmac::<Aes128>::new(key.into());
    for part in parts {
        mac.update(part);
    }
    let tag = mac.finalize().into_bytes();
    let mut mic = [0u8; 4];
    mic.copy_from_slice(&tag[..4]);
    mic
}

fn nwk_key(keys: &SessionKeys) -> Result<AesKey> {
    keys.nwk_s_key.ok_or_else(|| {
        DecodeError::UnsupportedFrameOperation(
            "data frame MIC requires the network session key".into(),
        )
    })
}

fn app_key(keys: &SessionKeys) -> Result<AesKey> {
    keys.app_s_key.ok_or_else(|| {
        DecodeError::UnsupportedFrameOperation(
            "join frame MIC requires the application key".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lorawan::parse;

    const FRAME_HEX: &str = "40F17DBE4900020001954378762B11FF0D";
    const APP_S_KEY: &str = "ec925802ae430ca77fd3dd73cb2cc588";
    const NWK_S_KEY: &str = "44024241ed4ce9a68c6a8bc055233fd3";

    fn sample() -> (Frame, SessionKeys) {
        let frame = parse(&hex::decode(FRAME_HEX).unwrap()).unwrap();
        let keys = SessionKeys::from_hex(Some(APP_S_KEY), Some(NWK_S_KEY)).unwrap();
        (frame, keys)
    }

    #[test]
    fn test_known_frame_mic_is_valid_with_msb_zero() {
        let (frame, keys) = sample();
        assert!(verify_mic(&frame, &keys, Some(0)).unwrap());
        assert_eq!(
            compute_mic(&frame, &keys, None).unwrap(),
            [0x2B, 0x11, 0xFF, 0x0D]
        );
    }

    #[test]
    fn test_recovery_finds_lowest_msb() {
        let (frame, keys) = sample();
        let recovery = recover_fcnt_msb(&frame, &keys).unwrap();
        assert!(recovery.found);
        assert_eq!(recovery.msb, Some(0));
        assert_eq!(recovery.searched_up_to, 0);
    }

    #[test]
    fn test_recovery_is_deterministic() {
        let (frame, keys) = sample();
        let a = recover_fcnt_msb(&frame, &keys).unwrap();
        let b = recover_fcnt_msb(&frame, &keys).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_exhausted_search_is_not_an_error() {
        // Corrupt the embedded MIC so no candidate can match
        let (frame, keys) = sample();
        let mut f = match frame {
            Frame::Data(f) => f,
            _ => unreachable!(),
        };
        f.mic = [0x00, 0x00, 0x00, 0x00];
        let recovery = recover_fcnt_msb(&Frame::Data(f), &keys).unwrap();
        assert!(!recovery.found);
        assert_eq!(recovery.msb, None);
        assert_eq!(recovery.searched_up_to, u16::MAX);
    }

    #[test]
    fn test_data_frame_requires_nwk_key() {
        let (frame, _) = sample();
        let keys = SessionKeys::from_hex(Some(APP_S_KEY), None).unwrap();
        assert!(verify_mic(&frame, &keys, None).is_err());
    }

    #[test]
    fn test_join_request_uses_app_key_alone() {
        let data: Vec<u8> = vec![
            0x00, // MHDR (JoinRequest)
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // AppEUI
            0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, // DevEUI
            0x42, 0x00, // DevNonce
            0x00, 0x00, 0x00, 0x00, // MIC placeholder
        ];
        let frame = parse(&data).unwrap();
        let keys = SessionKeys::from_hex(Some(APP_S_KEY), None).unwrap();
        // Computes without a network key; verification result depends on
        // the placeholder MIC, which will not match.
        assert!(!verify_mic(&frame, &keys, None).unwrap());
    }

    #[test]
    fn test_format_msb() {
        assert_eq!(format_msb(0), "0000");
        assert_eq!(format_msb(1), "0001");
        assert_eq!(format_msb(15), "000F");
        assert_eq!(format_msb(255), "00FF");
        assert_eq!(format_msb(4095), "0FFF");
        assert_eq!(format_msb(0xABCD), "ABCD");
        assert_eq!(format_msb(65535), "FFFF");
    }

    #[test]
    fn test_format_msb_round_trips() {
        for v in [0u16, 1, 0x00FF, 0x0FFF, 0x1234, 0xABCD, 0xFFFF] {
            let text = format_msb(v);
            assert_eq!(text.len(), 4);
            assert_eq!(u16::from_str_radix(&text, 16).unwrap(), v);
        }
    }
}
