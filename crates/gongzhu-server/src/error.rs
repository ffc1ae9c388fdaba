//! Unified error type for the table server.

use gongzhu_cards::CardError;
use gongzhu_protocol::Seat;

/// Top-level error for the server crate.
///
/// Sub-crate errors convert via `#[from]`, so `?` works across layer
/// boundaries inside the server. Protocol parse failures never surface
/// here: the listener handles them inline, line by line.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A rule-model error. An exposure overflow surfacing here is a
    /// fatal rule-engine invariant violation, not a client mistake.
    #[error(transparent)]
    Card(#[from] CardError),

    /// An I/O error on the listening socket. Per-connection I/O errors
    /// never surface as this; they collapse into a disconnect
    /// notification inside the owning listener task.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("bad configuration: {0}")]
    Config(String),

    /// A sit-down request named a seat that already has an occupant.
    #[error("seat {0} is already occupied")]
    SeatOccupied(Seat),

    /// A sit-down request arrived while a round is in progress.
    #[error("cannot take a seat while a round is in progress")]
    RoundInProgress,

    /// The current round was abandoned because a seat was vacated
    /// mid-round. The driver recovers from this; it is not fatal.
    #[error("round abandoned after a seat was vacated")]
    RoundAbandoned,
}
