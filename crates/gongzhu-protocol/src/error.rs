//! Error types for the protocol layer.

use gongzhu_cards::CardError;

/// Errors that can occur while parsing an inbound line.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The line does not start with the inbound prefix.
    #[error("not a client line: {0:?}")]
    BadPrefix(String),

    /// The message verb is not one the table understands.
    #[error("unknown client message: {0:?}")]
    UnknownMessage(String),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but unparseable (seat out of range,
    /// non-numeric avatar, and so on).
    #[error("bad {field} field: {value:?}")]
    BadField {
        /// Name of the offending field.
        field: &'static str,
        /// The raw text received.
        value: String,
    },

    /// A card field did not match the alias grammar.
    #[error(transparent)]
    BadCard(#[from] CardError),

    /// A card-carrying message arrived with the wrong number of cards.
    #[error("{verb} expects {expected} card(s), got {got}")]
    WrongCardCount {
        /// The message verb.
        verb: &'static str,
        /// Human-readable expectation ("exactly 3", "1 or 2").
        expected: &'static str,
        /// Number of card fields actually present.
        got: usize,
    },
}
