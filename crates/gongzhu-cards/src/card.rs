//! Card faces, the alias grammar, and per-card scoring values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CardError;

/// Maximum exposure level a scoring card can reach.
pub const MAX_EXPOSURE: u8 = 2;

// ---------------------------------------------------------------------------
// Rank
// ---------------------------------------------------------------------------

/// A card rank, 2 through Ace.
///
/// `ordinal()` gives the numeric strength (2–14) used by the trick
/// algorithm and the heart-value formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Every rank, in ascending order. Used when building a shoe.
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Numeric strength: 2 for Two up to 14 for Ace.
    pub fn ordinal(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Ace => 14,
        }
    }

    /// The single-character wire form (`2`–`9`, `T`, `J`, `Q`, `K`, `A`).
    pub fn as_char(self) -> char {
        match self {
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
            other => (b'0' + other.ordinal()) as char,
        }
    }

    /// Parses the single-character wire form.
    pub fn from_char(c: char) -> Option<Rank> {
        match c {
            '2' => Some(Rank::Two),
            '3' => Some(Rank::Three),
            '4' => Some(Rank::Four),
            '5' => Some(Rank::Five),
            '6' => Some(Rank::Six),
            '7' => Some(Rank::Seven),
            '8' => Some(Rank::Eight),
            '9' => Some(Rank::Nine),
            'T' => Some(Rank::Ten),
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            'A' => Some(Rank::Ace),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Suit
// ---------------------------------------------------------------------------

/// A card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Spades,
    Hearts,
}

impl Suit {
    /// Every suit. Used when building a shoe.
    pub const ALL: [Suit; 4] =
        [Suit::Clubs, Suit::Diamonds, Suit::Spades, Suit::Hearts];

    /// Fixed suit priority used only for display ordering of a hand
    /// (spades above hearts above clubs above diamonds). It has no
    /// bearing on trick resolution.
    pub fn priority(self) -> u8 {
        match self {
            Suit::Diamonds => 0,
            Suit::Clubs => 1,
            Suit::Hearts => 2,
            Suit::Spades => 3,
        }
    }

    /// The single-character wire form (`C`, `D`, `H`, `S`).
    pub fn as_char(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    /// Parses the single-character wire form.
    pub fn from_char(c: char) -> Option<Suit> {
        match c {
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoreRules
// ---------------------------------------------------------------------------

/// Tunable scoring constants.
///
/// `base` is the base score unit; `exposure_multiplier` scales a card's
/// value per exposure level; `catcher_multiplier` is applied once per
/// captured transformer when a pile is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRules {
    /// Base score unit.
    pub base: i32,
    /// Per-level multiplier applied to exposed cards.
    pub exposure_multiplier: i32,
    /// Multiplier a captured transformer applies to the rest of a pile.
    pub catcher_multiplier: i32,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            base: 10,
            exposure_multiplier: 2,
            catcher_multiplier: 2,
        }
    }
}

impl ScoreRules {
    /// The exposure scaling factor for a given exposure level.
    pub fn exposure_factor(&self, exposed: u8) -> i32 {
        self.exposure_multiplier.pow(u32::from(exposed))
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A playing card: immutable rank and suit, plus a mutable exposure
/// level (0–2) that is monotonically non-decreasing within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    rank: Rank,
    suit: Suit,
    exposed: u8,
}

impl Card {
    /// Creates an unexposed card.
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            exposed: 0,
        }
    }

    /// The card's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// The card's suit.
    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Current exposure level (0–2).
    pub fn exposed(&self) -> u8 {
        self.exposed
    }

    /// `true` if this card has the same rank and suit as `other`,
    /// regardless of exposure level.
    pub fn same_face(&self, other: &Card) -> bool {
        self.rank == other.rank && self.suit == other.suit
    }

    /// Sort key for display ordering: suit priority first, then rank.
    pub fn display_order(&self) -> (u8, u8) {
        (self.suit.priority(), self.rank.ordinal())
    }

    /// The transformer (10♣): multiplies a captured pile's score.
    pub fn is_transformer(&self) -> bool {
        self.rank == Rank::Ten && self.suit == Suit::Clubs
    }

    /// The sheep (J♦): a large positive bonus.
    pub fn is_sheep(&self) -> bool {
        self.rank == Rank::Jack && self.suit == Suit::Diamonds
    }

    /// The pig (Q♠): a large penalty.
    pub fn is_pig(&self) -> bool {
        self.rank == Rank::Queen && self.suit == Suit::Spades
    }

    /// A heart that carries a penalty (rank 5 and above).
    pub fn is_scoring_heart(&self) -> bool {
        self.suit == Suit::Hearts && self.rank.ordinal() >= 5
    }

    /// `true` for any card that belongs in an asset pile: the three
    /// named bonus cards and every heart.
    pub fn is_scoring(&self) -> bool {
        self.is_transformer()
            || self.is_sheep()
            || self.is_pig()
            || self.suit == Suit::Hearts
    }

    /// The card's score contribution under the given rules.
    ///
    /// Non-scoring cards (and hearts below rank 5) are worth 0.
    pub fn value(&self, rules: &ScoreRules) -> i32 {
        let factor = rules.exposure_factor(self.exposed);
        if self.is_transformer() {
            5 * rules.base * factor
        } else if self.is_sheep() {
            10 * rules.base * factor
        } else if self.is_pig() {
            -10 * rules.base * factor
        } else if self.is_scoring_heart() {
            let over_ten = i32::from(self.rank.ordinal().saturating_sub(10));
            (-rules.base - rules.base * over_ten) * factor
        } else {
            0
        }
    }

    /// Raises the exposure level by `n`.
    ///
    /// # Errors
    /// Returns [`CardError::ExposureOverflow`] if the result would
    /// exceed the cap of 2 — a fatal rule-engine invariant violation.
    pub fn upgrade(&mut self, n: u8) -> Result<(), CardError> {
        if self.exposed + n > MAX_EXPOSURE {
            return Err(CardError::ExposureOverflow {
                card: self.alias(),
                level: self.exposed,
                add: n,
            });
        }
        self.exposed += n;
        Ok(())
    }

    /// Clears the exposure level. Called when a fresh round begins.
    pub fn reset_exposure(&mut self) {
        self.exposed = 0;
    }

    /// The full wire alias, including the exposure suffix
    /// (`x` = exposed once, `z` = exposed twice).
    pub fn alias(&self) -> String {
        let mut s = String::with_capacity(3);
        s.push(self.rank.as_char());
        s.push(self.suit.as_char());
        match self.exposed {
            0 => {}
            1 => s.push('x'),
            _ => s.push('z'),
        }
        s
    }

    /// Parses a wire alias back into a card.
    ///
    /// # Errors
    /// Returns [`CardError::BadAlias`] for anything outside the grammar:
    /// one rank char, one suit char, optional `x`/`z` suffix.
    pub fn parse_alias(alias: &str) -> Result<Card, CardError> {
        let bad = || CardError::BadAlias(alias.to_string());
        let mut chars = alias.chars();
        let rank = chars
            .next()
            .and_then(Rank::from_char)
            .ok_or_else(bad)?;
        let suit = chars
            .next()
            .and_then(Suit::from_char)
            .ok_or_else(bad)?;
        let exposed = match chars.next() {
            None => 0,
            Some('x') => 1,
            Some('z') => 2,
            Some(_) => return Err(bad()),
        };
        if chars.next().is_some() {
            return Err(bad());
        }
        Ok(Card {
            rank,
            suit,
            exposed,
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias())
    }
}

// =========================================================================
// Tests
// =========================================================================
