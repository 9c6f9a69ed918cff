//! # Reliable Transfer Engine — receive path
//!
//! Reassembles one message: in-order DATA segments are appended and ACKed,
//! duplicates draw a re-ACK for the current expected sequence number (which
//! doubles as a resend of a possibly-lost acknowledgment), and the loop ends
//! when a final-flagged segment is accepted or the connection leaves
//! ESTABLISHED.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::conn::{Connection, Role, State};
use crate::error::TransportError;
use crate::wire::PacketKind;

impl Connection {
    /// Block until one complete message has been reassembled, and return its
    /// exact bytes.
    ///
    /// Returns an empty buffer if the peer tears the connection down
    /// mid-receive (the connection is then CLOSED — a server recovers via
    /// [`ensure_established`](Self::ensure_established), a client is done).
    /// Per-message counters are cleared on completion, so one connection can
    /// carry any number of messages serially without re-handshaking.
    pub fn receive(&mut self) -> Result<Bytes, TransportError> {
        if self.state() != State::Established {
            return Err(TransportError::NotConnected(self.state()));
        }

        let mut buffer = BytesMut::new();
        while !self.final_reached() && self.state() == State::Established {
            // A timeout leaves the receiver passive: the sender owns
            // retransmission.
            let Some(pkt) = self.wait_for_frame()? else {
                continue;
            };
            match pkt.kind {
                PacketKind::Data => {
                    if pkt.seq == self.expected_next() {
                        self.advance_expected_next();
                        buffer.extend_from_slice(&pkt.payload);
                        self.stats_mut().bytes_received += pkt.payload.len() as u64;
                        self.send_new(PacketKind::Ack, false, Bytes::new())?;
                        if pkt.last {
                            self.set_final_reached(true);
                        }
                    } else {
                        // Duplicate or out-of-order segment, typically after a
                        // lost ACK: confirm the current position, touch nothing.
                        debug!(
                            seq = pkt.seq,
                            expected = self.expected_next(),
                            "duplicate DATA; re-acknowledging current position"
                        );
                        self.stats_mut().duplicate_acks += 1;
                        self.send_repeat(PacketKind::Ack)?;
                    }
                }
                PacketKind::Disconnect => {
                    self.set_state(State::CloseWait);
                    self.send_new(PacketKind::DisconnectAck, false, Bytes::new())?;
                    self.force_closed();
                }
                PacketKind::Reset => self.reset_counters(),
                kind => {
                    self.send_new(PacketKind::Reset, false, Bytes::new())?;
                    self.reset_counters();
                    let prior = self.state();
                    match self.role() {
                        Role::Server => self.set_state(State::Listen),
                        Role::Client => self.set_state(State::Init),
                    }
                    return Err(TransportError::ProtocolViolation { state: prior, kind });
                }
            }
        }

        if self.final_reached() {
            let message = buffer.freeze();
            self.reset_counters();
            Ok(message)
        } else {
            // Torn down mid-receive; no partial data is surfaced.
            Ok(Bytes::new())
        }
    }
}
