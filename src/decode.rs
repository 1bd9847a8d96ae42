//! Decode orchestration: the single entry point composing input decoding,
//! frame parsing, MIC checking, counter recovery, payload decryption and
//! report formatting.
//!
//! Which steps run depends on which keys are present and what frame type
//! parsed out. Parse and key-encoding failures abort the call; an exhausted
//! counter search does not, since "no candidate matched" is itself a finding
//! the report carries.

use serde::Serialize;
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::lorawan::keys::SessionKeys;
use crate::lorawan::{self, cipher, mic, Frame};
use crate::report::{self, Annotations, MicAnnotation};
use crate::wire;

/// One named finding about the frame, for the caller's property table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub description: String,
}

/// The decode result handed across the core boundary. The caller (HTTP
/// handler, UI, CLI) serializes or displays it; the core never retains it.
#[derive(Debug, Serialize)]
pub struct DecodedReport {
    pub properties: Vec<Property>,
    /// Annotated, column-aligned report text.
    pub decoded: String,
    pub frame: Frame,
}

/// Decode one frame. Keys are optional hex strings; absent or empty means
/// "not supplied" and limits the decode to parsing and rendering.
pub fn decode(
    frame_text: &str,
    app_key_hex: Option<&str>,
    nwk_key_hex: Option<&str>,
) -> Result<DecodedReport> {
    let keys = SessionKeys::from_hex(app_key_hex, nwk_key_hex)?;
    let (encoding, bytes) = wire::decode_input(frame_text)?;
    let frame = lorawan::parse(&bytes)?;
    debug!(%encoding, mtype = %frame.mtype(), len = bytes.len(), "frame parsed");

    let properties = vec![Property {
        name: "Encoded".to_string(),
        description: encoding.to_string(),
    }];

    let mut annotations = Annotations::default();

    // The app key gates all keyed processing; a Join Request needs nothing
    // else, data frames additionally need the network key.
    if keys.app_s_key.is_some() {
        match &frame {
            Frame::Data(f) => {
                if keys.nwk_s_key.is_none() {
                    return Err(DecodeError::UnsupportedFrameOperation(
                        "data frame validation requires both AppSKey and NwkSKey".into(),
                    ));
                }

                let recovery = mic::recover_fcnt_msb(&frame, &keys)?;
                // When no MSB matched, show what the MIC should have been
                // under MSB 0 rather than 0xFFFF
                let expected = mic::compute_mic(&frame, &keys, recovery.msb)?;
                annotations.mic = Some(MicAnnotation {
                    valid: recovery.found,
                    expected,
                    msb: recovery.msb,
                    searched_up_to: (!recovery.found).then_some(recovery.searched_up_to),
                    fcnt32: recovery
                        .msb
                        .map(|m| (m as u32) << 16 | f.fcnt as u32),
                });

                let plaintext = cipher::decrypt_frm_payload(&frame, &keys, recovery.msb)?;
                debug!(len = plaintext.len(), "payload decrypted");
                annotations.decrypted = Some(plaintext);
            }
            Frame::JoinRequest(_) | Frame::JoinAccept(_) => {
                // App key alone; no counter search and never any decryption
                let valid = mic::verify_mic(&frame, &keys, None)?;
                let expected = mic::compute_mic(&frame, &keys, None)?;
                annotations.mic = Some(MicAnnotation {
                    valid,
                    expected,
                    msb: None,
                    searched_up_to: None,
                    fcnt32: None,
                });
            }
            // No MIC or payload semantics are defined for these
            Frame::Proprietary(_) | Frame::Rfu(_) => {}
        }
    }

    let decoded = report::align(&report::render(&frame, &annotations));

    Ok(DecodedReport {
        properties,
        decoded,
        frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_HEX: &str = "40F17DBE4900020001954378762B11FF0D";
    const FRAME_B64: &str = "QPF9vkkAAgABlUN4disR/w0=";
    const APP_S_KEY: &str = "ec925802ae430ca77fd3dd73cb2cc588";
    const NWK_S_KEY: &str = "44024241ed4ce9a68c6a8bc055233fd3";

    #[test]
    fn test_decode_hex_without_keys() {
        let report = decode(FRAME_HEX, None, None).unwrap();
        assert_eq!(
            report.properties,
            vec![Property {
                name: "Encoded".to_string(),
                description: "hex".to_string(),
            }]
        );
        assert!(report.decoded.contains("Unconfirmed Data Up"));
        assert!(report.decoded.contains("DevAddr"));
        assert!(report.decoded.contains("FCnt"));
        assert!(!report.decoded.contains("expected"));
    }

    #[test]
    fn test_decode_base64_without_keys() {
        let report = decode(FRAME_B64, None, None).unwrap();
        assert_eq!(report.properties[0].description, "base64");
    }

    #[test]
    fn test_hex_and_base64_parse_to_identical_frame() {
        let from_hex = decode(FRAME_HEX, None, None).unwrap();
        let from_b64 = decode(FRAME_B64, None, None).unwrap();
        assert_eq!(from_hex.frame, from_b64.frame);
    }

    #[test]
    fn test_decode_with_keys_validates_and_decrypts() {
        let report = decode(FRAME_HEX, Some(APP_S_KEY), Some(NWK_S_KEY)).unwrap();
        assert!(report.decoded.contains("MIC"));
        assert!(report.decoded.contains("expected"));
        assert!(report.decoded.contains("decrypted"));
        assert!(report.decoded.contains("74657374"));
        assert!(!report.decoded.contains("INVALID"));
    }

    #[test]
    fn test_decode_output_is_aligned() {
        let report = decode(FRAME_HEX, Some(APP_S_KEY), Some(NWK_S_KEY)).unwrap();
        let positions: Vec<usize> = report
            .decoded
            .lines()
            .filter_map(|l| l.rfind(" = "))
            .collect();
        assert!(positions.len() > 1);
        assert!(positions.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_join_accept_always_warns() {
        let report = decode("20493EEB51FBA2116F810EDB3817674DC6", None, None).unwrap();
        assert!(report.decoded.contains("WARNING"));
        assert!(report
            .decoded
            .contains("The values below have not been decrypted"));
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let err = decode("FF", None, None).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedFrame(_)));
    }

    #[test]
    fn test_bad_key_aborts() {
        let err = decode(FRAME_HEX, Some("zz"), None).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidKeyEncoding(_)));
    }

    #[test]
    fn test_data_frame_with_app_key_only_is_rejected() {
        let err = decode(FRAME_HEX, Some(APP_S_KEY), None).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFrameOperation(_)));
    }

    #[test]
    fn test_wrong_keys_report_invalid_not_error() {
        // Swapped keys: the search exhausts, but the decode still succeeds
        let report = decode(FRAME_HEX, Some(NWK_S_KEY), Some(APP_S_KEY)).unwrap();
        assert!(report.decoded.contains("INVALID (tried MSB 0000-FFFF)"));
        assert!(report.decoded.contains("expected"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = decode(FRAME_HEX, None, None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["properties"][0]["name"], "Encoded");
        assert!(json["decoded"].is_string());
        assert_eq!(json["frame"]["kind"], "Data");
    }
}
