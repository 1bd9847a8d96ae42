//! LoRaWAN MAC frame model and wire parsing.
//!
//! Frame structure (data frames):
//!   MHDR(1) | DevAddr(4,LE) | FCtrl(1) | FCnt(2,LE) | FOpts(0..15) |
//!   [FPort(1) | FRMPayload(N)] | MIC(4)
//!
//! Join Request and Join Accept use their own fixed layouts and are parsed
//! by separate paths keyed on message type. Parsing is lossless: every frame
//! can reproduce its exact wire bytes from the parsed fields, which is what
//! MIC computation and the report renderer rely on.

pub mod cipher;
pub mod keys;
pub mod mic;

use serde::Serialize;
use std::fmt;

use crate::error::{DecodeError, Result};

/// Shortest possible frame: MHDR(1) + MIC(4).
pub const MIN_FRAME_LEN: usize = 5;

/// LoRaWAN MAC Header (MHDR) - Message Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    Rfu,
    Proprietary,
}

impl MType {
    /// Extract the message type from the MHDR byte. The 3-bit field covers
    /// all eight variants, so this cannot fail.
    pub fn from_mhdr(mhdr: u8) -> Self {
        match (mhdr >> 5) & 0x07 {
            0b000 => MType::JoinRequest,
            0b001 => MType::JoinAccept,
            0b010 => MType::UnconfirmedDataUp,
            0b011 => MType::UnconfirmedDataDown,
            0b100 => MType::ConfirmedDataUp,
            0b101 => MType::ConfirmedDataDown,
            0b110 => MType::Rfu,
            _ => MType::Proprietary,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(
            self,
            MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
                | MType::ConfirmedDataUp
                | MType::ConfirmedDataDown
        )
    }
}

impl fmt::Display for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MType::JoinRequest => write!(f, "Join Request"),
            MType::JoinAccept => write!(f, "Join Accept"),
            MType::UnconfirmedDataUp => write!(f, "Unconfirmed Data Up"),
            MType::UnconfirmedDataDown => write!(f, "Unconfirmed Data Down"),
            MType::ConfirmedDataUp => write!(f, "Confirmed Data Up"),
            MType::ConfirmedDataDown => write!(f, "Confirmed Data Down"),
            MType::Rfu => write!(f, "RFU"),
            MType::Proprietary => write!(f, "Proprietary"),
        }
    }
}

/// Transmission direction, as used in the MIC B0 block and the cipher
/// A blocks (0 = uplink, 1 = downlink).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn to_byte(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Frame Control byte (FCtrl)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FCtrl {
    pub adr: bool,
    pub adr_ack_req: bool,
    pub ack: bool,
    pub class_b: bool,
    pub f_opts_len: u8,
}

impl FCtrl {
    pub fn from_byte(b: u8) -> Self {
        Self {
            adr: (b & 0x80) != 0,
            adr_ack_req: (b & 0x40) != 0,
            ack: (b & 0x20) != 0,
            class_b: (b & 0x10) != 0,
            f_opts_len: b & 0x0F,
        }
    }

    pub fn to_byte(&self) -> u8 {
        (self.adr as u8) << 7
            | (self.adr_ack_req as u8) << 6
            | (self.ack as u8) << 5
            | (self.class_b as u8) << 4
            | (self.f_opts_len & 0x0F)
    }
}

/// Decoded LoRaWAN MAC frame, one variant per wire layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Frame {
    Data(DataFrame),
    JoinRequest(JoinRequestFrame),
    JoinAccept(JoinAcceptFrame),
    Proprietary(RawFrame),
    Rfu(RawFrame),
}

/// Confirmed/unconfirmed data frame, up or down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFrame {
    pub mhdr: u8,
    pub mtype: MType,
    pub dev_addr: u32,
    pub fctrl: FCtrl,
    /// The transmitted low 16 bits of the conceptually 32-bit frame counter.
    pub fcnt: u16,
    pub f_opts: Vec<u8>,
    pub f_port: Option<u8>,
    /// Ciphertext as read from the wire; decryption produces a new value.
    pub frm_payload: Vec<u8>,
    /// MIC in wire byte order.
    pub mic: [u8; 4],
}

impl DataFrame {
    pub fn direction(&self) -> Direction {
        match self.mtype {
            MType::UnconfirmedDataDown | MType::ConfirmedDataDown => Direction::Down,
            _ => Direction::Up,
        }
    }

    /// FHDR wire bytes: DevAddr(LE) | FCtrl | FCnt(LE) | FOpts
    pub fn fhdr_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(7 + self.f_opts.len());
        out.extend_from_slice(&self.dev_addr.to_le_bytes());
        out.push(self.fctrl.to_byte());
        out.extend_from_slice(&self.fcnt.to_le_bytes());
        out.extend_from_slice(&self.f_opts);
        out
    }

    /// MACPayload wire bytes: FHDR | [FPort | FRMPayload]
    pub fn mac_payload(&self) -> Vec<u8> {
        let mut out = self.fhdr_bytes();
        if let Some(port) = self.f_port {
            out.push(port);
            out.extend_from_slice(&self.frm_payload);
        }
        out
    }

    /// The bytes authenticated by the MIC: MHDR | MACPayload
    pub fn mic_message(&self) -> Vec<u8> {
        let mut out = vec![self.mhdr];
        out.extend_from_slice(&self.mac_payload());
        out
    }
}

/// Join Request: fixed 23-byte layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinRequestFrame {
    pub mhdr: u8,
    pub app_eui: u64,
    pub dev_eui: u64,
    pub dev_nonce: u16,
    pub mic: [u8; 4],
}

impl JoinRequestFrame {
    pub fn mac_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(18);
        out.extend_from_slice(&self.app_eui.to_le_bytes());
        out.extend_from_slice(&self.dev_eui.to_le_bytes());
        out.extend_from_slice(&self.dev_nonce.to_le_bytes());
        out
    }

    pub fn mic_message(&self) -> Vec<u8> {
        let mut out = vec![self.mhdr];
        out.extend_from_slice(&self.mac_payload());
        out
    }
}

/// Join Accept: fixed layout of 17 or 33 bytes. All fields after the MHDR
/// are ciphertext on the wire; this decoder never decrypts them, it only
/// reports them with a warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinAcceptFrame {
    pub mhdr: u8,
    /// Wire byte order (little-endian).
    pub app_nonce: [u8; 3],
    /// Wire byte order (little-endian).
    pub net_id: [u8; 3],
    pub dev_addr: u32,
    pub dl_settings: u8,
    pub rx_delay: u8,
    /// Empty, or 16 bytes when the optional channel list is present.
    pub cf_list: Vec<u8>,
    pub mic: [u8; 4],
}

impl JoinAcceptFrame {
    pub fn mac_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.cf_list.len());
        out.extend_from_slice(&self.app_nonce);
        out.extend_from_slice(&self.net_id);
        out.extend_from_slice(&self.dev_addr.to_le_bytes());
        out.push(self.dl_settings);
        out.push(self.rx_delay);
        out.extend_from_slice(&self.cf_list);
        out
    }

    pub fn mic_message(&self) -> Vec<u8> {
        let mut out = vec![self.mhdr];
        out.extend_from_slice(&self.mac_payload());
        out
    }
}

/// Proprietary or RFU frame: opaque payload between MHDR and MIC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFrame {
    pub mhdr: u8,
    pub payload: Vec<u8>,
    pub mic: [u8; 4],
}

impl Frame {
    pub fn mtype(&self) -> MType {
        match self {
            Frame::Data(f) => f.mtype,
            Frame::JoinRequest(_) => MType::JoinRequest,
            Frame::JoinAccept(_) => MType::JoinAccept,
            Frame::Proprietary(_) => MType::Proprietary,
            Frame::Rfu(_) => MType::Rfu,
        }
    }

    pub fn mhdr(&self) -> u8 {
        match self {
            Frame::Data(f) => f.mhdr,
            Frame::JoinRequest(f) => f.mhdr,
            Frame::JoinAccept(f) => f.mhdr,
            Frame::Proprietary(f) | Frame::Rfu(f) => f.mhdr,
        }
    }

    pub fn mic(&self) -> [u8; 4] {
        match self {
            Frame::Data(f) => f.mic,
            Frame::JoinRequest(f) => f.mic,
            Frame::JoinAccept(f) => f.mic,
            Frame::Proprietary(f) | Frame::Rfu(f) => f.mic,
        }
    }

    /// MACPayload wire bytes (everything between MHDR and MIC).
    pub fn mac_payload(&self) -> Vec<u8> {
        match self {
            Frame::Data(f) => f.mac_payload(),
            Frame::JoinRequest(f) => f.mac_payload(),
            Frame::JoinAccept(f) => f.mac_payload(),
            Frame::Proprietary(f) | Frame::Rfu(f) => f.payload.clone(),
        }
    }

    /// Full PHY payload as it appeared on the wire.
    pub fn phy_payload(&self) -> Vec<u8> {
        let mut out = vec![self.mhdr()];
        out.extend_from_slice(&self.mac_payload());
        out.extend_from_slice(&self.mic());
        out
    }
}

/// Parse a raw PHY payload into a frame.
pub fn parse(data: &[u8]) -> Result<Frame> {
    if data.len() < MIN_FRAME_LEN {
        return Err(DecodeError::MalformedFrame(format!(
            "frame too short: {} bytes (minimum {})",
            data.len(),
            MIN_FRAME_LEN
        )));
    }

    let mhdr = data[0];
    match MType::from_mhdr(mhdr) {
        MType::JoinRequest => parse_join_request(data),
        MType::JoinAccept => parse_join_accept(data),
        mtype if mtype.is_data() => parse_data_frame(mtype, data),
        MType::Rfu => Ok(Frame::Rfu(parse_raw(data))),
        _ => Ok(Frame::Proprietary(parse_raw(data))),
    }
}

fn parse_raw(data: &[u8]) -> RawFrame {
    let mic_start = data.len() - 4;
    let mut mic = [0u8; 4];
    mic.copy_from_slice(&data[mic_start..]);
    RawFrame {
        mhdr: data[0],
        payload: data[1..mic_start].to_vec(),
        mic,
    }
}

fn parse_join_request(data: &[u8]) -> Result<Frame> {
    // MHDR(1) + AppEUI(8) + DevEUI(8) + DevNonce(2) + MIC(4) = 23 bytes
    if data.len() != 23 {
        return Err(DecodeError::MalformedFrame(format!(
            "Join Request must be 23 bytes, got {}",
            data.len()
        )));
    }

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&data[19..23]);

    Ok(Frame::JoinRequest(JoinRequestFrame {
        mhdr: data[0],
        app_eui: u64::from_le_bytes(data[1..9].try_into().map_err(malformed)?),
        dev_eui: u64::from_le_bytes(data[9..17].try_into().map_err(malformed)?),
        dev_nonce: u16::from_le_bytes(data[17..19].try_into().map_err(malformed)?),
        mic,
    }))
}

fn parse_join_accept(data: &[u8]) -> Result<Frame> {
    // MHDR(1) + AppNonce(3) + NetID(3) + DevAddr(4) + DLSettings(1) +
    // RxDelay(1) + CFList(0|16) + MIC(4) = 17 or 33 bytes
    if data.len() != 17 && data.len() != 33 {
        return Err(DecodeError::MalformedFrame(format!(
            "Join Accept must be 17 or 33 bytes, got {}",
            data.len()
        )));
    }

    let mic_start = data.len() - 4;
    let mut mic = [0u8; 4];
    mic.copy_from_slice(&data[mic_start..]);

    Ok(Frame::JoinAccept(JoinAcceptFrame {
        mhdr: data[0],
        app_nonce: data[1..4].try_into().map_err(malformed)?,
        net_id: data[4..7].try_into().map_err(malformed)?,
        dev_addr: u32::from_le_bytes(data[7..11].try_into().map_err(malformed)?),
        dl_settings: data[11],
        rx_delay: data[12],
        cf_list: data[13..mic_start].to_vec(),
        mic,
    }))
}

fn parse_data_frame(mtype: MType, data: &[u8]) -> Result<Frame> {
    // Minimum: MHDR(1) + DevAddr(4) + FCtrl(1) + FCnt(2) + MIC(4) = 12 bytes
    if data.len() < 12 {
        return Err(DecodeError::MalformedFrame(format!(
            "data frame too short: {} bytes (minimum 12)",
            data.len()
        )));
    }

    let dev_addr = u32::from_le_bytes(data[1..5].try_into().map_err(malformed)?);
    let fctrl = FCtrl::from_byte(data[5]);
    let fcnt = u16::from_le_bytes(data[6..8].try_into().map_err(malformed)?);

    let mic_start = data.len() - 4;
    let f_opts_end = 8 + fctrl.f_opts_len as usize;
    if f_opts_end > mic_start {
        return Err(DecodeError::MalformedFrame(format!(
            "FOpts length {} exceeds available data",
            fctrl.f_opts_len
        )));
    }
    let f_opts = data[8..f_opts_end].to_vec();

    // FPort + FRMPayload are only present when bytes remain before the MIC
    let (f_port, frm_payload) = if f_opts_end < mic_start {
        (Some(data[f_opts_end]), data[f_opts_end + 1..mic_start].to_vec())
    } else {
        (None, vec![])
    };

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&data[mic_start..]);

    Ok(Frame::Data(DataFrame {
        mhdr: data[0],
        mtype,
        dev_addr,
        fctrl,
        fcnt,
        f_opts,
        f_port,
        frm_payload,
        mic,
    }))
}

fn malformed(e: std::array::TryFromSliceError) -> DecodeError {
    DecodeError::MalformedFrame(e.to_string())
}
