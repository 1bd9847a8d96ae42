//! Report rendering and column alignment.
//!
//! The decoded report is a block of `name = value` lines in the shape users
//! of the original lora-packet tooling expect: the raw PHYPayload breakdown,
//! the FHDR breakdown for data frames, then a summary block. Annotations
//! (MIC validity, recovered 32-bit counter, decrypted payload) are woven in
//! as extra text on the relevant lines plus continuation lines, and a final
//! alignment pass pads every name so the `=` signs share one column.

use crate::lorawan::mic::format_msb;
use crate::lorawan::{DataFrame, Frame, JoinAcceptFrame, JoinRequestFrame, RawFrame};

/// Extra findings to weave into the rendered report.
#[derive(Debug, Default)]
pub struct Annotations {
    pub mic: Option<MicAnnotation>,
    /// Decrypted FRMPayload, when decryption ran.
    pub decrypted: Option<Vec<u8>>,
}

/// MIC verification outcome for the report.
#[derive(Debug)]
pub struct MicAnnotation {
    pub valid: bool,
    /// The code the frame should carry, under the recovered MSB (or 0).
    pub expected: [u8; 4],
    /// Recovered counter MSB, when the search succeeded.
    pub msb: Option<u16>,
    /// Exhausted search bound, when a search ran and failed.
    pub searched_up_to: Option<u16>,
    /// Full 32-bit counter, when verification succeeded on a data frame.
    pub fcnt32: Option<u32>,
}

/// Render a frame plus annotations to unaligned report text.
pub fn render(frame: &Frame, ann: &Annotations) -> String {
    let mut lines: Vec<String> = Vec::new();

    let heading = match frame {
        Frame::Data(_) => "Data".to_string(),
        Frame::JoinAccept(_) => {
            // Never decrypted by this decoder, whatever keys were supplied
            "Join Accept -- WARNING: The values below have not been decrypted".to_string()
        }
        _ => frame.mtype().to_string(),
    };
    lines.push(format!("Message Type = {}", heading));
    lines.push(format!("PHYPayload = {}", hex_upper(&frame.phy_payload())));
    lines.push(String::new());
    lines.push("( PHYPayload = MHDR[1] | MACPayload[..] | MIC[4] )".to_string());
    lines.push(format!("MHDR = {:02X}", frame.mhdr()));
    lines.push(format!("MACPayload = {}", hex_upper(&frame.mac_payload())));
    lines.push(String::new());

    match frame {
        Frame::Data(f) => render_data(f, ann, &mut lines),
        Frame::JoinRequest(f) => render_join_request(f, ann, &mut lines),
        Frame::JoinAccept(f) => render_join_accept(f, ann, &mut lines),
        Frame::Proprietary(f) | Frame::Rfu(f) => render_raw(f, &mut lines),
    }

    lines.join("\n")
}

fn render_data(f: &DataFrame, ann: &Annotations, lines: &mut Vec<String>) {
    lines.push("( MACPayload = FHDR | FPort | FRMPayload )".to_string());
    lines.push(format!("FHDR = {}", hex_upper(&f.fhdr_bytes())));
    lines.push(format!(
        "FPort = {}",
        f.f_port.map(|p| format!("{:02X}", p)).unwrap_or_default()
    ));

    let mut payload_line = format!("FRMPayload = {}", hex_upper(&f.frm_payload));
    match &ann.decrypted {
        Some(plaintext) if !f.frm_payload.is_empty() => {
            payload_line.push_str(" (from packet, encrypted)");
            lines.push(payload_line);
            lines.push(format!(" = {} (decrypted)", hex_upper(plaintext)));
        }
        _ => lines.push(payload_line),
    }
    lines.push(String::new());

    lines.push("( FHDR = DevAddr[4] | FCtrl[1] | FCnt[2] | FOpts[0..15] )".to_string());
    lines.push(format!("DevAddr = {:08X} (Big Endian)", f.dev_addr));
    lines.push(format!("FCtrl = {:02X}", f.fctrl.to_byte()));
    lines.push(format!("FCnt = {:04X} (Big Endian)", f.fcnt));
    lines.push(format!("FOpts = {}", hex_upper(&f.f_opts)));
    lines.push(String::new());

    lines.push(format!("Message Type = {}", f.mtype));
    lines.push(format!("Direction = {}", f.direction()));

    let mut fcnt_line = format!("FCnt = {}", f.fcnt);
    let recovered = ann
        .mic
        .as_ref()
        .and_then(|m| m.fcnt32.map(|v| (v, m.msb.unwrap_or(0))));
    match recovered {
        Some((fcnt32, msb)) => {
            fcnt_line.push_str(" (from packet, 16 bits)");
            lines.push(fcnt_line);
            lines.push(format!(
                " = {} (32 bits, assuming MSB 0x{:04x})",
                fcnt32, msb
            ));
        }
        None => lines.push(fcnt_line),
    }

    lines.push(format!("FCtrl.ACK = {}", f.fctrl.ack));
    lines.push(format!("FCtrl.ADR = {}", f.fctrl.adr));

    let mut mic_line = format!("MIC = {}", hex_upper(&f.mic));
    if let Some(m) = &ann.mic {
        mic_line.push_str(" (from packet)");
        if !m.valid {
            mic_line.push_str(" INVALID");
            if let Some(hi) = m.searched_up_to {
                mic_line.push_str(&format!(" (tried MSB 0000-{})", format_msb(hi)));
            }
        }
        lines.push(mic_line);
        lines.push(format!(
            " = {} (expected, assuming 32 bits frame counter with MSB {})",
            hex_upper(&m.expected),
            format_msb(m.msb.unwrap_or(0))
        ));
    } else {
        lines.push(mic_line);
    }
}

fn render_join_request(f: &JoinRequestFrame, ann: &Annotations, lines: &mut Vec<String>) {
    lines.push("( MACPayload = AppEUI[8] | DevEUI[8] | DevNonce[2] )".to_string());
    lines.push(format!("AppEUI = {:016X} (Big Endian)", f.app_eui));
    lines.push(format!("DevEUI = {:016X} (Big Endian)", f.dev_eui));
    lines.push(format!("DevNonce = {:04X} (Big Endian)", f.dev_nonce));
    push_join_mic(&f.mic, ann, lines);
}

fn render_join_accept(f: &JoinAcceptFrame, ann: &Annotations, lines: &mut Vec<String>) {
    lines.push(
        "( MACPayload = AppNonce[3] | NetID[3] | DevAddr[4] | DLSettings[1] | RxDelay[1] | CFList[0|16] )"
            .to_string(),
    );
    lines.push(format!(
        "AppNonce = {} (Big Endian)",
        hex_upper_reversed(&f.app_nonce)
    ));
    lines.push(format!(
        "NetID = {} (Big Endian)",
        hex_upper_reversed(&f.net_id)
    ));
    lines.push(format!("DevAddr = {:08X} (Big Endian)", f.dev_addr));
    lines.push(format!("DLSettings = {:02X}", f.dl_settings));
    lines.push(format!("RxDelay = {:02X}", f.rx_delay));
    lines.push(format!("CFList = {}", hex_upper(&f.cf_list)));
    push_join_mic(&f.mic, ann, lines);
}

fn render_raw(f: &RawFrame, lines: &mut Vec<String>) {
    lines.push(format!("Payload = {}", hex_upper(&f.payload)));
    lines.push(format!("MIC = {}", hex_upper(&f.mic)));
}

fn push_join_mic(mic: &[u8; 4], ann: &Annotations, lines: &mut Vec<String>) {
    let mut mic_line = format!("MIC = {}", hex_upper(mic));
    if let Some(m) = &ann.mic {
        mic_line.push_str(" (from packet)");
        if !m.valid {
            mic_line.push_str(" INVALID");
        }
        lines.push(mic_line);
        lines.push(format!(" = {} (expected)", hex_upper(&m.expected)));
    } else {
        lines.push(mic_line);
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

fn hex_upper_reversed(bytes: &[u8]) -> String {
    let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
    hex::encode_upper(reversed)
}

/// Pad names so every `=` lands in the same column.
///
/// A line participates when it contains ` = `; its name is everything before
/// the last ` = `, trimmed of leading whitespace only. Other lines pass
/// through untouched. Idempotent.
pub fn align(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    let parsed: Vec<Option<(usize, &str)>> = lines
        .iter()
        .map(|line| {
            line.rfind(" = ")
                .map(|pos| (pos, line[..pos].trim_start()))
        })
        .collect();

    let max = parsed
        .iter()
        .flatten()
        .map(|(_, name)| name.len())
        .max()
        .unwrap_or(0);

    lines
        .iter()
        .zip(&parsed)
        .map(|(line, p)| match p {
            Some((pos, name)) => {
                format!("{}{}{}", " ".repeat(max - name.len()), name, &line[*pos..])
            }
            None => (*line).to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
