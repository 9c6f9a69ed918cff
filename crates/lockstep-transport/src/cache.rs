//! # Retransmission Cache
//!
//! A stop-and-wait sender has at most one unacknowledged frame in flight, so
//! the retransmit buffer is a single slot. The cache holds the *exact* bytes
//! that went on the wire; a resend replays them without re-encoding, so the
//! retransmitted frame reproduces the original sequence/ack/flag values even
//! after local counters have moved.

use bytes::Bytes;

use crate::wire::PacketKind;

/// Immutable snapshot of the most recently transmitted frame.
#[derive(Debug, Default)]
pub struct FrameCache {
    slot: Option<(PacketKind, Bytes)>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a newly transmitted frame.
    pub fn store(&mut self, kind: PacketKind, frame: Bytes) {
        self.slot = Some((kind, frame));
    }

    /// The cached frame, if any. The kind is carried so the loss simulator
    /// can classify resends the same way it classified the original send.
    pub fn frame(&self) -> Option<(PacketKind, &Bytes)> {
        self.slot.as_ref().map(|(kind, frame)| (*kind, frame))
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Packet;

    #[test]
    fn stores_exact_frame_bytes() {
        let frame = Packet::data(5, 2, false, Bytes::from_static(b"abcd"))
            .encode()
            .freeze();
        let mut cache = FrameCache::new();
        cache.store(PacketKind::Data, frame.clone());

        let (kind, cached) = cache.frame().unwrap();
        assert_eq!(kind, PacketKind::Data);
        assert_eq!(cached, &frame);
    }

    #[test]
    fn store_replaces_previous_frame() {
        let mut cache = FrameCache::new();
        cache.store(PacketKind::Connect, Bytes::from_static(b"first"));
        cache.store(PacketKind::Data, Bytes::from_static(b"second"));
        let (kind, frame) = cache.frame().unwrap();
        assert_eq!(kind, PacketKind::Data);
        assert_eq!(frame.as_ref(), b"second");
    }

    #[test]
    fn clear_empties_the_slot() {
        let mut cache = FrameCache::new();
        cache.store(PacketKind::Ack, Bytes::new());
        cache.clear();
        assert!(cache.frame().is_none());
    }
}
