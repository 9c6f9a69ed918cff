//! # Datagram Channel
//!
//! Thin blocking wrapper around `std::net::UdpSocket` that speaks
//! [`Packet`](crate::wire::Packet) frames instead of raw bytes. Every receive
//! carries a deadline and returns a tagged [`RecvOutcome`] — there is no busy
//! loop and no untagged timeout path.
//!
//! The channel can also inject simulated, probabilistic packet loss on the
//! outbound side: a dropped frame is discarded *before* the socket send, so
//! the peer's timeout/retransmission machinery is exercised without its
//! cooperation.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use tracing::trace;

use crate::error::TransportError;
use crate::wire::{Packet, PacketKind};

// ─── Loss Profile ───────────────────────────────────────────────────────────

/// Independent per-packet-kind outbound drop probabilities, each in
/// `[0.0, 1.0]`. The drop draw is uniform over `[0.0, 1.0)`, so a
/// probability of exactly `1.0` drops every frame.
///
/// The reference configuration drops only DATA packets
/// ([`LossProfile::data_only`]); symmetric loss is available for tests that
/// want ACKs to disappear too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossProfile {
    /// Drop probability for DATA packets.
    pub data: f64,
    /// Drop probability for ACK packets.
    pub ack: f64,
    /// Drop probability for every other control kind.
    pub control: f64,
}

impl LossProfile {
    /// Lossless pass-through.
    pub fn none() -> Self {
        LossProfile {
            data: 0.0,
            ack: 0.0,
            control: 0.0,
        }
    }

    /// The reference one-directional default: only DATA packets drop.
    pub fn data_only(p: f64) -> Self {
        LossProfile {
            data: p,
            ack: 0.0,
            control: 0.0,
        }
    }

    /// Every packet kind drops with the same probability.
    pub fn symmetric(p: f64) -> Self {
        LossProfile {
            data: p,
            ack: p,
            control: p,
        }
    }

    /// Drop probability applying to `kind`.
    pub fn drop_probability(&self, kind: PacketKind) -> f64 {
        match kind {
            PacketKind::Data => self.data,
            PacketKind::Ack => self.ack,
            _ => self.control,
        }
    }

    pub fn is_lossless(&self) -> bool {
        self.data == 0.0 && self.ack == 0.0 && self.control == 0.0
    }
}

impl Default for LossProfile {
    fn default() -> Self {
        Self::none()
    }
}

// ─── Receive Outcome ────────────────────────────────────────────────────────

/// Result of one bounded wait on the channel.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A decoded packet and the datagram's source address.
    Packet(Packet, SocketAddr),
    /// The deadline elapsed with nothing received.
    TimedOut,
}

// ─── Channel ────────────────────────────────────────────────────────────────

/// A blocking, packet-oriented UDP channel.
pub struct Channel {
    socket: UdpSocket,
    local_addr: SocketAddr,
    loss: LossProfile,
    rng: SmallRng,
    recv_buf: Vec<u8>,
}

impl Channel {
    /// Bind to `local_addr` with the given receive deadline. `0` as the port
    /// lets the OS pick an ephemeral one.
    pub fn bind(
        local_addr: SocketAddr,
        recv_timeout: Duration,
        loss: LossProfile,
        recv_buffer: usize,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local_addr)?;
        socket.set_read_timeout(Some(recv_timeout))?;
        let local_addr = socket.local_addr()?;
        Ok(Channel {
            socket,
            local_addr,
            loss,
            rng: SmallRng::seed_from_u64(rand::rng().random()),
            recv_buf: vec![0u8; recv_buffer],
        })
    }

    /// Address this channel is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send one pre-encoded frame to `dest`.
    ///
    /// Returns `true` if the frame reached the socket, `false` if the loss
    /// simulator swallowed it. `kind` only classifies the frame for the loss
    /// profile — the bytes go out untouched either way.
    pub fn send_frame(
        &mut self,
        kind: PacketKind,
        frame: &[u8],
        dest: SocketAddr,
    ) -> Result<bool, TransportError> {
        let p = self.loss.drop_probability(kind);
        if p > 0.0 && self.rng.random::<f64>() < p {
            trace!(?kind, len = frame.len(), "simulated loss: frame dropped");
            return Ok(false);
        }
        self.socket.send_to(frame, dest)?;
        Ok(true)
    }

    /// Wait for the next datagram, up to the configured deadline.
    ///
    /// Malformed datagrams surface as [`TransportError::Wire`]; the caller
    /// decides whether that is fatal.
    pub fn recv(&mut self) -> Result<RecvOutcome, TransportError> {
        match self.socket.recv_from(&mut self.recv_buf) {
            Ok((n, from)) => {
                let packet = Packet::decode(&self.recv_buf[..n])?;
                Ok(RecvOutcome::Packet(packet, from))
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(RecvOutcome::TimedOut)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("local_addr", &self.local_addr)
            .field("loss", &self.loss)
            .finish()
    }
}
