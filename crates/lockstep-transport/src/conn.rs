//! # Connection State Machine
//!
//! One [`Connection`] models exactly one logical peer relationship: it owns
//! the state enum, the sequence counters, the peer address, the datagram
//! channel, and the retransmission cache. Every transition happens inside a
//! method on `Connection` — no field is mutable from outside.
//!
//! ```text
//!            client                      server
//!   INIT ──CONNECT──▶ SYN_REQUESTED      LISTEN ──CONNECT rcvd──▶ SYNACK_SENT
//!                          │                                          │
//!                     SYNACK rcvd                                 ACK rcvd
//!                          ▼                                          ▼
//!                     ESTABLISHED ◀─────── data transfer ──────▶ ESTABLISHED
//!                          │                                          │
//!                    DISCONNECT sent/rcvd                       (same teardown)
//!                          ▼
//!                      CLOSE_WAIT ──DISCONNECT_ACK──▶ CLOSED
//! ```
//!
//! Handshake and teardown live here; the stop-and-wait data paths are the
//! [`send`](Connection::send) and [`receive`](Connection::receive) blocks in
//! [`crate::sender`] and [`crate::receiver`].

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::cache::FrameCache;
use crate::channel::{Channel, RecvOutcome};
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::stats::TransportStats;
use crate::wire::{Packet, PacketKind};

// ─── State ──────────────────────────────────────────────────────────────────

/// All states of the connection FSM.
///
/// `SynAckReceived`, `LastAck`, and `Closing` are retained for symmetry with
/// the textbook transport diagram but are never entered by this engine:
/// the client moves straight from SYN_REQUESTED to ESTABLISHED, and teardown
/// has no half-close phase — both endpoints converge to CLOSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Fresh connection; nothing sent yet.
    Init,
    /// Server waiting for a CONNECT.
    Listen,
    /// Client sent CONNECT; waiting for SYNACK.
    SynRequested,
    /// Server sent SYNACK; waiting for the final ACK.
    SynAckSent,
    /// Reserved; never entered.
    SynAckReceived,
    /// Handshake complete; data transfer may proceed.
    Established,
    /// DISCONNECT sent; waiting for DISCONNECT_ACK.
    CloseWait,
    /// Reserved; never entered.
    LastAck,
    /// Reserved; never entered.
    Closing,
    /// Terminal: socket released. A server loops back to LISTEN from here.
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Init => "INIT",
            State::Listen => "LISTEN",
            State::SynRequested => "SYN_REQUESTED",
            State::SynAckSent => "SYNACK_SENT",
            State::SynAckReceived => "SYNACK_RECEIVED",
            State::Established => "ESTABLISHED",
            State::CloseWait => "CLOSE_WAIT",
            State::LastAck => "LAST_ACK",
            State::Closing => "CLOSING",
            State::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Which side of the handshake this connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

// ─── Connection ─────────────────────────────────────────────────────────────

/// A single logical peer relationship over an unreliable datagram substrate.
///
/// Fully synchronous: every wait blocks the calling thread until a packet
/// arrives or the retransmission deadline elapses. Not meant to be shared
/// across threads — one caller drives the whole lifecycle.
#[derive(Debug)]
pub struct Connection {
    role: Role,
    state: State,
    /// Local sequence counter; bumped by 1 before each *new* transmission.
    local_seq: u32,
    /// Next sequence number expected from the peer (sent as the ack field).
    expected_next: u32,
    /// Set once a final-flagged DATA segment has been sent or accepted.
    final_reached: bool,
    /// Endpoint currently considered connected. Updated to the source of the
    /// most recent datagram unless `pin_peer` is set.
    peer_addr: Option<SocketAddr>,
    /// Address to (re)bind; a server reuses it when looping back to LISTEN.
    bind_addr: SocketAddr,
    channel: Option<Channel>,
    cache: FrameCache,
    config: TransportConfig,
    stats: TransportStats,
}

impl Connection {
    /// A client endpoint that will dial `remote`. Binds an ephemeral local
    /// port immediately; the handshake runs in [`connect`](Self::connect).
    pub fn client(remote: SocketAddr, config: TransportConfig) -> Result<Self, TransportError> {
        let bind_addr = match remote {
            SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
        };
        let mut conn = Self::new(Role::Client, bind_addr, config);
        conn.peer_addr = Some(remote);
        conn.ensure_channel()?;
        Ok(conn)
    }

    /// A server endpoint bound to `bind`. Binding happens here so callers
    /// can read the resolved address before the first client arrives.
    pub fn server(bind: SocketAddr, config: TransportConfig) -> Result<Self, TransportError> {
        let mut conn = Self::new(Role::Server, bind, config);
        conn.ensure_channel()?;
        Ok(conn)
    }

    fn new(role: Role, bind_addr: SocketAddr, config: TransportConfig) -> Self {
        Connection {
            role,
            state: State::Init,
            local_seq: 0,
            expected_next: 0,
            final_reached: false,
            peer_addr: None,
            bind_addr,
            channel: None,
            cache: FrameCache::new(),
            config,
            stats: TransportStats::new(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == State::Established
    }

    /// Resolved local address, once a socket has been bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.channel.as_ref().map(Channel::local_addr)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn local_seq(&self) -> u32 {
        self.local_seq
    }

    pub fn expected_next(&self) -> u32 {
        self.expected_next
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    // ─── Handshake ──────────────────────────────────────────────────────────

    /// Client three-way handshake: CONNECT → SYNACK → ACK.
    ///
    /// Exhausting the retry budget forces CLOSED without an error value;
    /// check [`state`](Self::state) afterwards. Only meaningful for the
    /// client role.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.role != Role::Client {
            return Err(TransportError::NotConnected(self.state));
        }
        self.ensure_channel()?;
        self.set_state(State::Init);
        self.local_seq = 0;
        self.expected_next = 0;
        self.final_reached = false;

        let mut retries = 0;
        while self.state != State::Established && retries < self.config.handshake_retries {
            match self.state {
                State::Init => {
                    self.send_new(PacketKind::Connect, false, Bytes::new())?;
                    self.set_state(State::SynRequested);
                }
                State::SynRequested => match self.wait_for_frame()? {
                    None => {
                        self.resend_cached()?;
                        retries += 1;
                    }
                    Some(pkt) => match pkt.kind {
                        PacketKind::SynAck if pkt.ack == self.local_seq + 1 => {
                            self.expected_next = pkt.seq + 1;
                            self.send_new(PacketKind::Ack, false, Bytes::new())?;
                            self.set_state(State::Established);
                            // Data-segment numbering restarts at zero,
                            // independent of handshake numbering.
                            self.local_seq = 0;
                        }
                        PacketKind::Reset => {
                            self.reset_counters();
                            self.set_state(State::Init);
                        }
                        _ => {
                            self.send_new(PacketKind::Reset, false, Bytes::new())?;
                            self.set_state(State::Init);
                            retries += 1;
                        }
                    },
                },
                _ => break,
            }
        }

        if self.state != State::Established {
            warn!(retries, "handshake failed; forcing CLOSED");
            self.force_closed();
        }
        Ok(())
    }

    /// Server side of the handshake: wait for CONNECT, answer SYNACK, expect
    /// the final ACK. Re-binds the saved local address if the previous
    /// connection released the socket. Only meaningful for the server role.
    pub fn wait_for_connection(&mut self) -> Result<(), TransportError> {
        if self.role != Role::Server {
            return Err(TransportError::NotConnected(self.state));
        }
        self.ensure_channel()?;
        self.set_state(State::Listen);
        self.local_seq = 0;
        self.expected_next = 0;
        self.final_reached = false;

        let mut retries = 0;
        while self.state != State::Established && retries < self.config.handshake_retries {
            let Some(pkt) = self.wait_for_frame()? else {
                // A listener waits indefinitely for its first CONNECT; only a
                // stalled SYNACK exchange consumes the retry budget.
                if self.state == State::SynAckSent {
                    self.resend_cached()?;
                    retries += 1;
                }
                continue;
            };
            match self.state {
                State::Listen => match pkt.kind {
                    PacketKind::Connect => {
                        self.expected_next = pkt.seq + 1;
                        self.send_new(PacketKind::SynAck, false, Bytes::new())?;
                        self.set_state(State::SynAckSent);
                    }
                    PacketKind::Reset => self.reset_counters(),
                    _ => {
                        self.send_new(PacketKind::Reset, false, Bytes::new())?;
                        self.reset_counters();
                        self.set_state(State::Listen);
                        retries += 1;
                    }
                },
                State::SynAckSent => match pkt.kind {
                    PacketKind::Ack if pkt.ack == self.local_seq + 1 => {
                        self.set_state(State::Established);
                        // The first DATA segment must carry sequence 1.
                        self.expected_next = 1;
                    }
                    PacketKind::Reset => {
                        self.reset_counters();
                        self.set_state(State::Listen);
                    }
                    _ => {
                        self.send_new(PacketKind::Reset, false, Bytes::new())?;
                        self.reset_counters();
                        self.set_state(State::Listen);
                        retries += 1;
                    }
                },
                _ => break,
            }
        }

        if self.state != State::Established {
            warn!(retries, "no client completed the handshake; forcing CLOSED");
            self.force_closed();
        }
        Ok(())
    }

    /// Explicit "ensure connected" step for orchestration loops.
    ///
    /// Servers (re-)enter the handshake wait, including after CLOSED.
    /// Clients connect from INIT but have no reconnection path once CLOSED
    /// and report that instead.
    pub fn ensure_established(&mut self) -> Result<(), TransportError> {
        if self.state == State::Established {
            return Ok(());
        }
        match self.role {
            Role::Server => self.wait_for_connection(),
            Role::Client => {
                if self.state == State::Closed {
                    return Err(TransportError::NotConnected(State::Closed));
                }
                self.connect()
            }
        }
    }

    // ─── Teardown ───────────────────────────────────────────────────────────

    /// Graceful two-step teardown: DISCONNECT, wait for DISCONNECT_ACK,
    /// release the socket.
    ///
    /// The cached DISCONNECT is resent on timeout up to the handshake retry
    /// budget; after that the connection is forced CLOSED locally. A
    /// simultaneous DISCONNECT from the peer is confirmed and also ends in
    /// CLOSED.
    pub fn close(&mut self) -> Result<(), TransportError> {
        if self.state == State::Closed || self.channel.is_none() {
            self.force_closed();
            return Ok(());
        }
        self.set_state(State::CloseWait);
        self.send_new(PacketKind::Disconnect, false, Bytes::new())?;

        let mut retries = 0;
        while self.state != State::Closed {
            match self.wait_for_frame()? {
                Some(pkt) if pkt.kind == PacketKind::DisconnectAck => {
                    self.set_state(State::Closed);
                }
                Some(pkt) if pkt.kind == PacketKind::Disconnect => {
                    self.send_new(PacketKind::DisconnectAck, false, Bytes::new())?;
                    self.set_state(State::Closed);
                }
                _ => {
                    if retries >= self.config.handshake_retries {
                        warn!("teardown unacknowledged; forcing CLOSED locally");
                        break;
                    }
                    self.resend_cached()?;
                    retries += 1;
                }
            }
        }
        self.force_closed();
        Ok(())
    }

    // ─── Internals (shared with sender/receiver) ────────────────────────────

    pub(crate) fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TransportStats {
        &mut self.stats
    }

    pub(crate) fn set_state(&mut self, next: State) {
        if next != self.state {
            debug!(role = ?self.role, from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }

    pub(crate) fn set_final_reached(&mut self, reached: bool) {
        self.final_reached = reached;
    }

    pub(crate) fn final_reached(&self) -> bool {
        self.final_reached
    }

    pub(crate) fn advance_expected_next(&mut self) {
        self.expected_next += 1;
    }

    /// Zero `local_seq`, expect sequence 1 next, clear the final marker.
    /// Used both for RESET handling and between messages.
    pub(crate) fn reset_counters(&mut self) {
        self.local_seq = 0;
        self.expected_next = 1;
        self.final_reached = false;
    }

    /// Drop into the terminal state and release the socket. A server keeps
    /// its bind address so the next `wait_for_connection` can re-bind.
    pub(crate) fn force_closed(&mut self) {
        self.set_state(State::Closed);
        self.channel = None;
        self.cache.clear();
    }

    fn ensure_channel(&mut self) -> Result<(), TransportError> {
        if self.channel.is_none() {
            let channel = Channel::bind(
                self.bind_addr,
                self.config.retransmit_timeout,
                self.config.loss,
                self.config.recv_buffer,
            )?;
            // Remember the resolved address so re-binding after CLOSED lands
            // on the same port.
            self.bind_addr = channel.local_addr();
            self.channel = Some(channel);
        }
        Ok(())
    }

    /// Build, transmit, and cache a *new* packet, consuming one `local_seq`
    /// increment.
    pub(crate) fn send_new(
        &mut self,
        kind: PacketKind,
        last: bool,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        self.local_seq += 1;
        let packet = Packet {
            kind,
            seq: self.local_seq,
            ack: self.expected_next,
            last,
            payload,
        };
        let frame = packet.encode().freeze();
        debug!(
            ?kind,
            seq = packet.seq,
            ack = packet.ack,
            last,
            len = packet.payload.len(),
            "sending packet"
        );
        let delivered = self.transmit(kind, &frame)?;

        self.stats.packets_sent += 1;
        if kind == PacketKind::Data {
            self.stats.data_segments_sent += 1;
            self.stats.bytes_sent += packet.payload.len() as u64;
        }
        if kind == PacketKind::Reset {
            self.stats.resets_sent += 1;
        }
        if !delivered {
            self.stats.simulated_drops += 1;
        }
        self.cache.store(kind, frame);
        Ok(())
    }

    /// Re-emit a payload-free packet with the *current* counters, without
    /// consuming a sequence increment or touching the cache. Used for the
    /// duplicate-suppressing re-ACK on the receive path.
    pub(crate) fn send_repeat(&mut self, kind: PacketKind) -> Result<(), TransportError> {
        let packet = Packet::control(kind, self.local_seq, self.expected_next);
        let frame = packet.encode().freeze();
        debug!(
            ?kind,
            seq = packet.seq,
            ack = packet.ack,
            "re-emitting packet"
        );
        let delivered = self.transmit(kind, &frame)?;
        if !delivered {
            self.stats.simulated_drops += 1;
        }
        Ok(())
    }

    /// Resend the cached frame byte-for-byte, bypassing re-encoding.
    pub(crate) fn resend_cached(&mut self) -> Result<(), TransportError> {
        let Some((kind, frame)) = self.cache.frame().map(|(k, f)| (k, f.clone())) else {
            return Ok(());
        };
        trace!(?kind, len = frame.len(), "retransmitting cached frame");
        let delivered = self.transmit(kind, &frame)?;
        self.stats.retransmissions += 1;
        if !delivered {
            self.stats.simulated_drops += 1;
        }
        Ok(())
    }

    fn transmit(&mut self, kind: PacketKind, frame: &[u8]) -> Result<bool, TransportError> {
        let dest = self
            .peer_addr
            .ok_or(TransportError::NotConnected(self.state))?;
        let channel = self
            .channel
            .as_mut()
            .ok_or(TransportError::NotConnected(self.state))?;
        channel.send_frame(kind, frame, dest)
    }

    /// Bounded wait for the next packet. `None` means the deadline elapsed.
    ///
    /// The peer address follows the source of the most recent datagram; with
    /// `pin_peer` set, datagrams from other sources are discarded once the
    /// connection is ESTABLISHED.
    pub(crate) fn wait_for_frame(&mut self) -> Result<Option<Packet>, TransportError> {
        loop {
            let pinned = self.config.pin_peer && self.state == State::Established;
            let channel = self
                .channel
                .as_mut()
                .ok_or(TransportError::NotConnected(self.state))?;
            match channel.recv()? {
                RecvOutcome::TimedOut => return Ok(None),
                RecvOutcome::Packet(packet, from) => {
                    if pinned && Some(from) != self.peer_addr {
                        debug!(%from, "discarding datagram from unpinned source");
                        continue;
                    }
                    self.peer_addr = Some(from);
                    self.stats.packets_received += 1;
                    trace!(
                        kind = ?packet.kind,
                        seq = packet.seq,
                        ack = packet.ack,
                        last = packet.last,
                        len = packet.payload.len(),
                        "received packet"
                    );
                    return Ok(Some(packet));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_counters_restores_initial_values() {
        let mut conn = Connection::new(
            Role::Client,
            SocketAddr::from(([127, 0, 0, 1], 0)),
            TransportConfig::default(),
        );
        conn.local_seq = 7;
        conn.expected_next = 9;
        conn.final_reached = true;

        conn.reset_counters();
        assert_eq!(conn.local_seq(), 0);
        assert_eq!(conn.expected_next(), 1);
        assert!(!conn.final_reached());
    }

    #[test]
    fn state_display_matches_wire_protocol_names() {
        assert_eq!(State::SynRequested.to_string(), "SYN_REQUESTED");
        assert_eq!(State::SynAckSent.to_string(), "SYNACK_SENT");
        assert_eq!(State::CloseWait.to_string(), "CLOSE_WAIT");
        assert_eq!(State::Established.to_string(), "ESTABLISHED");
    }

    #[test]
    fn force_closed_releases_the_channel() {
        let mut conn =
            Connection::server(SocketAddr::from(([127, 0, 0, 1], 0)), TransportConfig::default())
                .unwrap();
        assert!(conn.local_addr().is_some());
        conn.force_closed();
        assert_eq!(conn.state(), State::Closed);
        assert!(conn.local_addr().is_none());
    }

    #[test]
    fn connect_on_server_role_is_rejected() {
        let mut conn =
            Connection::server(SocketAddr::from(([127, 0, 0, 1], 0)), TransportConfig::default())
                .unwrap();
        assert!(matches!(
            conn.connect(),
            Err(TransportError::NotConnected(_))
        ));
    }

    #[test]
    fn closed_client_cannot_reconnect() {
        let mut conn = Connection::client(
            SocketAddr::from(([127, 0, 0, 1], 9)),
            TransportConfig::default(),
        )
        .unwrap();
        conn.force_closed();
        assert!(matches!(
            conn.ensure_established(),
            Err(TransportError::NotConnected(State::Closed))
        ));
    }
}
