//! Transport error taxonomy.
//!
//! Timeouts are not errors — waits return a tagged outcome and the engine
//! recovers by retransmitting. Handshake exhaustion is not an error either:
//! it forces the connection to [`State::Closed`](crate::conn::State::Closed)
//! and callers detect it through connection state.

use crate::conn::State;
use crate::wire::{PacketKind, WireError};

/// Errors surfaced by transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Underlying socket I/O failure.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A received datagram could not be parsed.
    #[error("malformed datagram: {0}")]
    Wire(#[from] WireError),

    /// `send`/`receive` called while the connection is not ESTABLISHED, or
    /// a closed client asked to reconnect.
    #[error("connection not established (state {0})")]
    NotConnected(State),

    /// The peer sent a packet kind inconsistent with our state during data
    /// transfer. The connection has already replied RESET and reverted.
    #[error("protocol violation: unexpected {kind:?} in state {state}")]
    ProtocolViolation { state: State, kind: PacketKind },

    /// The configured data-phase retransmission cap was exceeded.
    #[error("transfer failed: {attempts} retransmissions of segment {seq} went unacknowledged")]
    RetriesExhausted { seq: u32, attempts: u32 },
}
