//! # lockstep-transport
//!
//! A minimal reliable transport over an unreliable, unordered, lossy
//! datagram substrate (UDP): three-way connection establishment, in-order
//! exactly-once byte delivery via stop-and-wait retransmission, and a
//! graceful two-step teardown. At most one segment is ever outstanding —
//! this is the single-segment analogue of a stream transport, not a
//! windowed one.
//!
//! ## Crate structure
//!
//! - [`wire`] — fixed 10-byte header codec, packet kinds
//! - [`channel`] — blocking UDP wrapper with tagged timeouts and simulated loss
//! - [`cache`] — single-slot byte-identical retransmission cache
//! - [`conn`] — connection FSM: handshake, teardown, RESET semantics
//! - [`sender`] — stop-and-wait segmentation and retransmission
//! - [`receiver`] — in-order reassembly and duplicate suppression
//! - [`config`] — transport tunables
//! - [`stats`] — per-connection counters
//! - [`error`] — error taxonomy
//!
//! ## Usage
//!
//! ```no_run
//! use lockstep_transport::{Connection, TransportConfig};
//!
//! # fn main() -> Result<(), lockstep_transport::TransportError> {
//! let mut conn = Connection::client("127.0.0.1:12345".parse().unwrap(), TransportConfig::default())?;
//! conn.connect()?;
//! if conn.is_established() {
//!     conn.send(b"hello")?;
//!     let reply = conn.receive()?;
//!     conn.close()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The transport is payload-agnostic: applications layer their own
//! conventions on top of the raw byte messages.

pub mod cache;
pub mod channel;
pub mod config;
pub mod conn;
pub mod error;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod wire;

pub use channel::{LossProfile, RecvOutcome};
pub use config::TransportConfig;
pub use conn::{Connection, Role, State};
pub use error::TransportError;
pub use stats::TransportStats;
pub use wire::{Packet, PacketKind, WireError, HEADER_LEN};
