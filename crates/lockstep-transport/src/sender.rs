//! # Reliable Transfer Engine — send path
//!
//! Pure stop-and-wait: the message is split into ordered segments of at most
//! the configured maximum segment size, and never more than one segment is
//! outstanding. A segment is retransmitted — as the byte-identical cached
//! frame — on timeout and on any response that is not the matching ACK.

use bytes::Bytes;
use tracing::debug;

use crate::conn::{Connection, State};
use crate::error::TransportError;
use crate::wire::PacketKind;

/// Split a message into `(segment, is_final)` pairs of at most `mss` bytes,
/// preserving order. An empty message still produces one empty final segment
/// so the peer's receive loop terminates.
pub(crate) fn split_segments(payload: &[u8], mss: usize) -> Vec<(&[u8], bool)> {
    if payload.is_empty() {
        return vec![(payload, true)];
    }
    let total = payload.len().div_ceil(mss);
    payload
        .chunks(mss)
        .enumerate()
        .map(|(i, chunk)| (chunk, i + 1 == total))
        .collect()
}

impl Connection {
    /// Deliver `payload` to the peer, reliably and in order.
    ///
    /// Blocks until every segment has been individually acknowledged.
    /// Retransmission is unbounded unless
    /// [`max_transfer_retries`](crate::config::TransportConfig::max_transfer_retries)
    /// caps it, in which case an unresponsive peer yields
    /// [`TransportError::RetriesExhausted`].
    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.state() != State::Established {
            return Err(TransportError::NotConnected(self.state()));
        }

        let mss = self.config().max_segment_size;
        let segments = split_segments(payload, mss);
        for (segment, last) in segments {
            self.send_new(PacketKind::Data, last, Bytes::copy_from_slice(segment))?;
            if last {
                self.set_final_reached(true);
            }
            self.await_segment_ack()?;
        }

        // Final segment acknowledged: per-message numbering starts over.
        self.reset_counters();
        Ok(())
    }

    /// Block until the outstanding segment is acknowledged, retransmitting
    /// the cached frame on timeout and on any other packet (stale ACK,
    /// unrelated kind).
    fn await_segment_ack(&mut self) -> Result<(), TransportError> {
        let mut attempts: u32 = 0;
        loop {
            match self.wait_for_frame()? {
                Some(pkt)
                    if pkt.kind == PacketKind::Ack && pkt.ack == self.local_seq() + 1 =>
                {
                    return Ok(());
                }
                outcome => {
                    if let Some(cap) = self.config().max_transfer_retries {
                        if attempts >= cap {
                            return Err(TransportError::RetriesExhausted {
                                seq: self.local_seq(),
                                attempts,
                            });
                        }
                    }
                    match outcome {
                        Some(pkt) => debug!(
                            kind = ?pkt.kind,
                            ack = pkt.ack,
                            expected = self.local_seq() + 1,
                            "segment not acknowledged; retransmitting"
                        ),
                        None => debug!(
                            seq = self.local_seq(),
                            "retransmission timeout; resending segment"
                        ),
                    }
                    self.resend_cached()?;
                    attempts += 1;
                }
            }
        }
    }
}
