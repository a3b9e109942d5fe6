//! UBX framing: `B5 62 | class | id | len (LE u16) | payload | ck_a ck_b`.

use crate::UbxError;

pub const SYNC_CHAR_1: u8 = 0xB5;
pub const SYNC_CHAR_2: u8 = 0x62;

/// Sync (2) + class (1) + id (1) + length (2) + checksum (2).
pub const FRAME_OVERHEAD: usize = 8;
/// ACK-ACK and ACK-NAK both carry a two byte payload.
pub const ACK_FRAME_LEN: usize = FRAME_OVERHEAD + 2;

pub const CLASS_ACK: u8 = 0x05;
pub const ID_ACK_NAK: u8 = 0x00;
pub const ID_ACK_ACK: u8 = 0x01;

pub const CLASS_CFG: u8 = 0x06;
pub const ID_CFG_PRT: u8 = 0x00;
pub const ID_CFG_MSG: u8 = 0x01;

pub const CLASS_NMEA: u8 = 0xF0;

/// UART1 on u-blox 6/7/8 receivers.
pub const PORT_UART1: u8 = 0x01;

// 8 data bits, no parity, 1 stop bit
const UART_MODE_8N1: u32 = 0x0000_08D0;
const PROTO_UBX: u16 = 0x0001;
const PROTO_NMEA: u16 = 0x0002;
const PROTO_RTCM: u16 = 0x0004;

/// Standard NMEA sentences addressable through CFG-MSG (class 0xF0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmeaSentence {
    Gga,
    Gll,
    Gsa,
    Gsv,
    Rmc,
    Vtg,
}

impl NmeaSentence {
    pub fn msg_id(self) -> u8 {
        match self {
            NmeaSentence::Gga => 0x00,
            NmeaSentence::Gll => 0x01,
            NmeaSentence::Gsa => 0x02,
            NmeaSentence::Gsv => 0x03,
            NmeaSentence::Rmc => 0x04,
            NmeaSentence::Vtg => 0x05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    class: u8,
    id: u8,
    payload: Vec<u8>,
}

impl UbxFrame {
    pub fn new(class: u8, id: u8, payload: impl Into<Vec<u8>>) -> Result<Self, UbxError> {
        let payload = payload.into();
        if payload.len() > u16::MAX as usize {
            return Err(UbxError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { class, id, payload })
    }

    /// The ACK-ACK the receiver sends back for a message of `class`/`id`.
    pub(crate) fn ack_for(class: u8, id: u8) -> Self {
        Self { class: CLASS_ACK, id: ID_ACK_ACK, payload: vec![class, id] }
    }

    /// The ACK-NAK the receiver sends back for a message of `class`/`id`.
    pub(crate) fn nak_for(class: u8, id: u8) -> Self {
        Self { class: CLASS_ACK, id: ID_ACK_NAK, payload: vec![class, id] }
    }

    /// CFG-PRT for a UART port: 8N1, UBX+NMEA+RTCM in, UBX+NMEA out.
    pub fn cfg_prt_uart(port_id: u8, baud: u32) -> Result<Self, UbxError> {
        let mut payload = Vec::with_capacity(20);
        payload.push(port_id);
        payload.push(0); // reserved
        payload.extend_from_slice(&0u16.to_le_bytes()); // txReady
        payload.extend_from_slice(&UART_MODE_8N1.to_le_bytes());
        payload.extend_from_slice(&baud.to_le_bytes());
        payload.extend_from_slice(&(PROTO_UBX | PROTO_NMEA | PROTO_RTCM).to_le_bytes());
        payload.extend_from_slice(&(PROTO_UBX | PROTO_NMEA).to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes()); // flags
        payload.extend_from_slice(&0u16.to_le_bytes()); // reserved
        Self::new(CLASS_CFG, ID_CFG_PRT, payload)
    }

    /// CFG-MSG with per-port output rates (I2C, UART1, UART2, USB, SPI, reserved).
    pub fn cfg_msg_rate(sentence: NmeaSentence, rates: [u8; 6]) -> Result<Self, UbxError> {
        let mut payload = vec![CLASS_NMEA, sentence.msg_id()];
        payload.extend_from_slice(&rates);
        Self::new(CLASS_CFG, ID_CFG_MSG, payload)
    }

    pub fn disable_nmea(sentence: NmeaSentence) -> Result<Self, UbxError> {
        Self::cfg_msg_rate(sentence, [0; 6])
    }

    pub fn class(&self) -> u8 {
        self.class
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Port configuration is not acknowledged once the receiver has switched baud.
    pub fn is_port_config(&self) -> bool {
        self.class == CLASS_CFG && self.id == ID_CFG_PRT
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_OVERHEAD + self.payload.len());
        out.push(SYNC_CHAR_1);
        out.push(SYNC_CHAR_2);
        out.push(self.class);
        out.push(self.id);
        // length checked in `new`
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.payload);
        let (ck_a, ck_b) = checksum(&out[2..]);
        out.push(ck_a);
        out.push(ck_b);
        out
    }
}

/// 8-bit Fletcher over class, id, length and payload.
pub fn checksum(bytes: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;
    for &b in bytes {
        ck_a = ck_a.wrapping_add(b);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}
