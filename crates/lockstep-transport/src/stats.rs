//! # Transport Statistics
//!
//! Per-connection counters, serializable for log/JSON export. Tests lean on
//! these to verify the bounded handshake and teardown packet counts.

use serde::Serialize;

/// Aggregate counters for one connection.
///
/// `packets_sent` counts *new* transmissions only; retransmissions of the
/// cached frame are tallied separately so a loss-free exchange can be checked
/// against exact packet budgets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransportStats {
    /// New packets handed to the channel (excludes retransmissions).
    pub packets_sent: u64,
    /// Payload bytes in new DATA segments.
    pub bytes_sent: u64,
    /// New DATA segments among `packets_sent`.
    pub data_segments_sent: u64,
    /// Byte-identical resends of the cached frame.
    pub retransmissions: u64,
    /// Packets decoded off the wire.
    pub packets_received: u64,
    /// Payload bytes in accepted DATA segments.
    pub bytes_received: u64,
    /// Re-emitted ACKs for duplicate/out-of-order DATA.
    pub duplicate_acks: u64,
    /// Outbound packets discarded by the loss simulator.
    pub simulated_drops: u64,
    /// RESET packets emitted.
    pub resets_sent: u64,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retransmission overhead relative to new transmissions.
    pub fn retransmit_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.retransmissions as f64 / self.packets_sent as f64
        }
    }
}
