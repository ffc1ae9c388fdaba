//! Card model and rule engine for Gongzhu, a four-seat trick-taking
//! Hearts variant with a pre-play trading phase and a bonus-card
//! exposure phase.
//!
//! This crate is purely synchronous and owns every rule that does not
//! require coordination between seats:
//!
//! - [`Card`], [`Rank`], [`Suit`] — immutable face values plus a
//!   mutable 0–2 exposure level per scoring card.
//! - [`ScoreRules`] — the tunable scoring constants (base unit,
//!   exposure and catcher multipliers).
//! - [`Shoe`] — a freshly shuffled multi-deck stack consumed one card
//!   at a time during the deal.
//! - [`resolve_trick`] — the trick-winner algorithm, including the
//!   pair rules for double-deck play.
//! - [`AssetPile`] — a seat's captured scoring cards and the
//!   compounding round-score computation.

mod card;
mod error;
mod pile;
mod shoe;
mod trick;

pub use card::{Card, Rank, ScoreRules, Suit};
pub use error::CardError;
pub use pile::AssetPile;
pub use shoe::{DECKS_PER_SHOE, Shoe};
pub use trick::resolve_trick;
