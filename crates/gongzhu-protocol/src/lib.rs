//! Wire protocol for the Gongzhu table.
//!
//! The protocol is line-oriented text, one message per line. Outbound
//! lines carry the `SERVERMESSAGE` prefix with fields joined by `==`;
//! inbound lines carry the `FROMCLIENT` prefix with fields joined by
//! `~~`. Cards travel as aliases from the `gongzhu-cards` grammar:
//! rank char + suit char + optional exposure suffix.
//!
//! [`ServerMessage`] renders to a full outbound line via `Display`;
//! [`ClientMessage::parse`] parses a full inbound line. The display
//! client on the other end of the stream is out of scope here — it
//! only consumes the lines this crate emits and produces the lines
//! this crate parses.

mod error;
mod message;
mod seat;

pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage};
pub use seat::Seat;

/// Prefix of every server-to-client line.
pub const OUTBOUND_PREFIX: &str = "SERVERMESSAGE";
/// Field separator of server-to-client lines.
pub const OUTBOUND_SEP: &str = "==";
/// Prefix of every client-to-server line.
pub const INBOUND_PREFIX: &str = "FROMCLIENT";
/// Field separator of client-to-server lines.
pub const INBOUND_SEP: &str = "~~";
