//! # Lockstep Wire Format
//!
//! Fixed 10-byte header, then the raw payload — no length field, the UDP
//! datagram boundary delimits the packet.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Packet Kind  |                Sequence Number                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    (cont.)    |             Acknowledgment Number              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    (cont.)    |   Final Flag  |          Payload ...           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All multi-byte fields are **big-endian**. The final flag occupies a whole
//! byte for alignment simplicity. There is no checksum: corruption detection
//! is out of scope for this protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Byte length of the fixed header: kind(1) + seq(4) + ack(4) + final(1).
pub const HEADER_LEN: usize = 10;

/// Wire value of the final-segment flag.
pub const FINAL_FLAG: u8 = 0x01;

/// Wire value for "more segments follow".
pub const MORE_FLAG: u8 = 0x00;

// ─── Packet Kind ────────────────────────────────────────────────────────────

/// Every packet on the wire carries exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Handshake initiation (SYN analogue).
    Connect = 0x01,
    /// Handshake reply (SYN-ACK analogue).
    SynAck = 0x02,
    /// Acknowledgment — `ack` names the next expected sequence number.
    Ack = 0x03,
    /// Teardown initiation.
    Disconnect = 0x04,
    /// Teardown confirmation.
    DisconnectAck = 0x05,
    /// Payload-bearing segment.
    Data = 0x06,
    /// Counter reset / protocol-violation signal.
    Reset = 0x07,
}

impl PacketKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(PacketKind::Connect),
            0x02 => Some(PacketKind::SynAck),
            0x03 => Some(PacketKind::Ack),
            0x04 => Some(PacketKind::Disconnect),
            0x05 => Some(PacketKind::DisconnectAck),
            0x06 => Some(PacketKind::Data),
            0x07 => Some(PacketKind::Reset),
            _ => None,
        }
    }

    /// True for every kind except [`PacketKind::Data`].
    pub fn is_control(self) -> bool {
        !matches!(self, PacketKind::Data)
    }
}

// ─── Decode Errors ──────────────────────────────────────────────────────────

/// Framing errors raised while parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Datagram shorter than the fixed header.
    #[error("datagram too short for a header: {len} bytes, need {HEADER_LEN}")]
    Truncated { len: usize },
    /// Unrecognized packet-kind byte.
    #[error("unknown packet kind 0x{0:02x}")]
    UnknownKind(u8),
}

// ─── Packet ─────────────────────────────────────────────────────────────────

/// A complete Lockstep datagram: header fields + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    /// Sequence number of this packet.
    pub seq: u32,
    /// Next sequence number expected from the peer.
    pub ack: u32,
    /// Final-segment flag — set on the last DATA segment of a message.
    pub last: bool,
    pub payload: Bytes,
}

impl Packet {
    /// A payload-free control packet (CONNECT, ACK, RESET, ...).
    pub fn control(kind: PacketKind, seq: u32, ack: u32) -> Self {
        Packet {
            kind,
            seq,
            ack,
            last: false,
            payload: Bytes::new(),
        }
    }

    /// A DATA segment.
    pub fn data(seq: u32, ack: u32, last: bool, payload: Bytes) -> Self {
        Packet {
            kind: PacketKind::Data,
            seq,
            ack,
            last,
            payload,
        }
    }

    /// Serialize into a freshly allocated buffer.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        buf.put_u8(if self.last { FINAL_FLAG } else { MORE_FLAG });
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a packet from a raw datagram.
    ///
    /// Everything past the fixed header is payload; any nonzero final byte
    /// counts as set, matching the permissive original decoder.
    pub fn decode(mut buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated { len: buf.len() });
        }
        let kind_byte = buf.get_u8();
        let kind = PacketKind::from_byte(kind_byte).ok_or(WireError::UnknownKind(kind_byte))?;
        let seq = buf.get_u32();
        let ack = buf.get_u32();
        let last = buf.get_u8() != MORE_FLAG;
        Ok(Packet {
            kind,
            seq,
            ack,
            last,
            payload: Bytes::copy_from_slice(buf),
        })
    }

    /// Total encoded size.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}
