//! CP2130 protocol constants and the bulk command header
//!
//! Control-transfer request codes live in the command table
//! ([`crate::command`]); this module holds what is shared by every request
//! plus the 8-byte header that frames SPI payload on the bulk endpoints.

// USB device identifiers
/// Silicon Labs USB VID
pub const CP2130_USB_VENDOR: u16 = 0x10C4;
/// CP2130 default USB PID
pub const CP2130_USB_PRODUCT: u16 = 0x87A0;

// Control transfer request types
/// Device-to-host, vendor, device recipient
pub const REQUEST_TYPE_IN: u8 = 0xC0;
/// Host-to-device, vendor, device recipient
pub const REQUEST_TYPE_OUT: u8 = 0x40;

/// wValue that unlocks writes to the one-time-programmable ROM
pub const OTP_WRITE_KEY: u16 = 0xA5F1;

// USB endpoints
/// Bulk OUT endpoint for commands and write payload
pub const WRITE_EP: u8 = 0x01;
/// Bulk IN endpoint for read payload
pub const READ_EP: u8 = 0x82;

/// Length of the bulk command header
pub const BULK_HEADER_LEN: usize = 8;

/// Number of GPIO pins, and of chip-select channels
pub const GPIO_COUNT: u8 = 11;

/// Base clock the SPI and clock-out dividers run from
pub const BASE_CLOCK_HZ: u32 = 24_000_000;

/// Bulk command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BulkOp {
    /// Clock in `len` bytes
    Read = 0x00,
    /// Clock out the payload that follows the header
    Write = 0x01,
    /// Full-duplex: clock out the payload and return as many bytes
    WriteRead = 0x02,
    /// Like [`BulkOp::Read`], paced by the RTR input
    ReadWithRtr = 0x04,
}

impl BulkOp {
    pub fn from_u8(op: u8) -> Option<Self> {
        match op {
            0x00 => Some(BulkOp::Read),
            0x01 => Some(BulkOp::Write),
            0x02 => Some(BulkOp::WriteRead),
            0x04 => Some(BulkOp::ReadWithRtr),
            _ => None,
        }
    }

    /// Whether payload bytes follow the header
    pub fn has_payload(self) -> bool {
        matches!(self, BulkOp::Write | BulkOp::WriteRead)
    }

    /// Whether the device answers on the bulk IN endpoint
    pub fn has_response(self) -> bool {
        !matches!(self, BulkOp::Write)
    }
}

/// Build the header: two reserved bytes, opcode, reserved, LE32 length
pub fn bulk_header(op: BulkOp, len: u32) -> [u8; BULK_HEADER_LEN] {
    let len = len.to_le_bytes();
    [0x00, 0x00, op as u8, 0x00, len[0], len[1], len[2], len[3]]
}

/// Split a header back into opcode and length
pub fn parse_bulk_header(header: &[u8]) -> Option<(BulkOp, u32)> {
    if header.len() < BULK_HEADER_LEN || header[0] != 0 || header[1] != 0 || header[3] != 0 {
        return None;
    }
    let op = BulkOp::from_u8(header[2])?;
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Some((op, len))
}

/// Build a complete bulk OUT command: header followed by `payload`
pub fn bulk_command(op: BulkOp, len: u32, payload: &[u8]) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(BULK_HEADER_LEN + payload.len());
    cmd.extend_from_slice(&bulk_header(op, len));
    cmd.extend_from_slice(payload);
    cmd
}
