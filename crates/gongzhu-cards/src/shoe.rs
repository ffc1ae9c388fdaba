//! The shoe: a shuffled multi-deck stack consumed during the deal.

use rand::seq::SliceRandom;

use crate::{Card, Rank, Suit};

/// Number of standard decks a shoe is built from.
///
/// The table always plays double-deck regardless of any configured deck
/// count; the configuration parameter exists on the surface but is not
/// consulted here.
pub const DECKS_PER_SHOE: usize = 2;

/// A freshly shuffled stack of cards, built once per round and consumed
/// strictly through [`Shoe::deal_card`] until empty.
#[derive(Debug)]
pub struct Shoe {
    cards: Vec<Card>,
}

impl Shoe {
    /// Builds and shuffles a new shoe of [`DECKS_PER_SHOE`] decks.
    pub fn build() -> Self {
        let mut cards =
            Vec::with_capacity(DECKS_PER_SHOE * 52);
        for _ in 0..DECKS_PER_SHOE {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card::new(rank, suit));
                }
            }
        }
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    /// Deals the next card, or `None` when the shoe is exhausted.
    pub fn deal_card(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Cards left in the shoe.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}
