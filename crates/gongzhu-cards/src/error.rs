//! Error types for the card model.

/// Errors produced by the card and rule model.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// A card alias string did not match the alias grammar
    /// (rank char + suit char + optional `x`/`z` exposure suffix).
    ///
    /// Input is assumed well-formed from the paired client, so callers
    /// fail fast on this rather than trying to recover.
    #[error("malformed card alias: {0:?}")]
    BadAlias(String),

    /// An exposure upgrade would push a card's exposure level past 2.
    ///
    /// The exposure level is capped by the rules of the game; exceeding
    /// it means the rule engine itself is broken, so this is treated as
    /// a fatal invariant violation rather than a recoverable input error.
    #[error("exposure overflow on {card}: level {level} + {add} exceeds 2")]
    ExposureOverflow {
        /// Alias of the offending card.
        card: String,
        /// Current exposure level.
        level: u8,
        /// Requested increment.
        add: u8,
    },
}
