//! Transport configuration.

use std::time::Duration;

use crate::channel::LossProfile;

/// Tunables for a [`Connection`](crate::conn::Connection).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum DATA payload per segment (bytes). Messages larger than this
    /// are split into multiple stop-and-wait segments.
    pub max_segment_size: usize,
    /// Handshake attempts (and teardown resends) before forcing CLOSED.
    pub handshake_retries: u32,
    /// Deadline for every blocking wait; also the retransmission timeout.
    pub retransmit_timeout: Duration,
    /// Data-phase retransmission cap per segment. `None` keeps the original
    /// unbounded behavior: delivery is a liveness-only guarantee.
    pub max_transfer_retries: Option<u32>,
    /// Pin the peer address once ESTABLISHED and discard datagrams from
    /// other sources. Off by default: the original protocol trusts whoever
    /// sent the most recent datagram.
    pub pin_peer: bool,
    /// Simulated outbound loss, per packet kind.
    pub loss: LossProfile,
    /// Receive buffer size for a single datagram.
    pub recv_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            max_segment_size: 8,
            handshake_retries: 3,
            retransmit_timeout: Duration::from_millis(500),
            max_transfer_retries: None,
            pin_peer: false,
            loss: LossProfile::none(),
            recv_buffer: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.max_segment_size, 8);
        assert_eq!(cfg.handshake_retries, 3);
        assert_eq!(cfg.recv_buffer, 1024);
        assert!(cfg.max_transfer_retries.is_none());
        assert!(!cfg.pin_peer);
    }
}
