//! WebSocket frame types.

use crate::sys::curl_ws_frame;
use bytes::Bytes;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Frame flags, passed to and from the engine verbatim.
///
/// The named constants mirror the engine's bit values; any other bits are
/// carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WsFlags(pub u32);

impl WsFlags {
    pub const TEXT: Self = Self(1 << 0);
    pub const BINARY: Self = Self(1 << 1);
    /// More fragments of the same message follow.
    pub const CONT: Self = Self(1 << 2);
    pub const CLOSE: Self = Self(1 << 3);
    pub const PING: Self = Self(1 << 4);
    /// Send a frame in pieces; the first call declares the full size.
    pub const OFFSET: Self = Self(1 << 5);
    pub const PONG: Self = Self(1 << 6);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_text(&self) -> bool {
        self.contains(Self::TEXT)
    }

    pub fn is_binary(&self) -> bool {
        self.contains(Self::BINARY)
    }

    pub fn is_close(&self) -> bool {
        self.contains(Self::CLOSE)
    }
}

impl BitOr for WsFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for WsFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for WsFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<u32> for WsFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// Metadata of the most recently received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsFrameMeta {
    /// Offset of this fragment within its frame.
    pub offset: i64,
    /// Payload bytes of the frame still to be received.
    pub bytes_left: i64,
    pub flags: WsFlags,
}

impl WsFrameMeta {
    /// Whether this fragment completes its frame.
    pub fn is_final_fragment(&self) -> bool {
        self.bytes_left == 0
    }
}

impl From<&curl_ws_frame> for WsFrameMeta {
    fn from(frame: &curl_ws_frame) -> Self {
        Self {
            offset: frame.offset,
            bytes_left: frame.bytesleft,
            flags: WsFlags(frame.flags as u32),
        }
    }
}

/// Outcome of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsSend {
    /// This many payload bytes were accepted.
    Sent(usize),
    /// The socket is not writable; retry later.
    WouldBlock,
}

/// Outcome of a receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsRecv {
    Frame { data: Bytes, flags: WsFlags },
    /// Nothing available right now. Not end of stream.
    Empty,
}

/// WebSocket close codes (RFC 6455).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: Self = Self(1000);
    /// Endpoint going away
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// Unsupported data type
    pub const UNSUPPORTED: Self = Self(1003);
    /// Invalid payload data
    pub const INVALID_PAYLOAD: Self = Self(1007);
    /// Policy violation
    pub const POLICY_VIOLATION: Self = Self(1008);
    /// Message too big
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// Internal server error
    pub const INTERNAL_ERROR: Self = Self(1011);

    /// Close frame payload: big-endian code followed by the reason.
    pub fn payload(&self, reason: &str) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&self.0.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        payload
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits_match_engine() {
        assert_eq!(WsFlags::TEXT.bits(), 0x01);
        assert_eq!(WsFlags::BINARY.bits(), 0x02);
        assert_eq!(WsFlags::CONT.bits(), 0x04);
        assert_eq!(WsFlags::CLOSE.bits(), 0x08);
        assert_eq!(WsFlags::PING.bits(), 0x10);
        assert_eq!(WsFlags::OFFSET.bits(), 0x20);
        assert_eq!(WsFlags::PONG.bits(), 0x40);
    }

    #[test]
    fn test_flags_combine_and_pass_through() {
        let flags = WsFlags::TEXT | WsFlags::CONT;
        assert!(flags.is_text());
        assert!(flags.contains(WsFlags::CONT));
        assert!(!flags.is_binary());

        let unknown = WsFlags::from(0x8000_0001);
        assert!(unknown.is_text());
        assert_eq!(unknown.bits(), 0x8000_0001);
    }

    #[test]
    fn test_meta_from_engine_frame() {
        let frame = curl_ws_frame {
            age: 0,
            flags: (WsFlags::BINARY | WsFlags::CONT).bits() as libc::c_int,
            offset: 16,
            bytesleft: 48,
            len: 16,
        };
        let meta = WsFrameMeta::from(&frame);
        assert_eq!(meta.offset, 16);
        assert_eq!(meta.bytes_left, 48);
        assert!(meta.flags.is_binary());
        assert!(!meta.is_final_fragment());
    }

    #[test]
    fn test_close_payload() {
        assert_eq!(CloseCode::NORMAL.payload("bye"), b"\x03\xe8bye");
        assert_eq!(u16::from(CloseCode::GOING_AWAY), 1001);
    }
}
