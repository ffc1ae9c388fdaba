//! Per-seat asset pile: captured scoring cards and the round score.

use crate::{Card, ScoreRules};

/// The scoring cards one seat has captured during the current round.
///
/// The pile grows as tricks resolve and is cleared at round end. The
/// round score compounds: hearts, the sheep, and the pig contribute
/// their values; each captured transformer then multiplies a non-zero
/// sum (or stands on its own value when there is nothing to multiply).
#[derive(Debug, Default)]
pub struct AssetPile {
    cards: Vec<Card>,
}

impl AssetPile {
    /// Creates an empty pile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds captured cards to the pile.
    pub fn add(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// The captured cards, in capture order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of captured cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// `true` if nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Empties the pile for the next round.
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Computes the round score for this pile.
    ///
    /// Sum the values of every non-transformer card first. Each
    /// transformer then multiplies a non-zero sum by the catcher
    /// multiplier (scaled by its own exposure); a transformer with
    /// nothing to multiply contributes its plain value instead.
    pub fn round_score(&self, rules: &ScoreRules) -> i32 {
        let sum: i32 = self
            .cards
            .iter()
            .filter(|c| !c.is_transformer())
            .map(|c| c.value(rules))
            .sum();

        let transformers =
            self.cards.iter().filter(|c| c.is_transformer());
        if sum == 0 {
            transformers.map(|c| c.value(rules)).sum()
        } else {
            transformers.fold(sum, |acc, t| {
                acc * rules.catcher_multiplier
                    * rules.exposure_factor(t.exposed())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pile(aliases: &[&str]) -> AssetPile {
        let mut p = AssetPile::new();
        p.add(
            aliases
                .iter()
                .map(|a| Card::parse_alias(a).unwrap()),
        );
        p
    }

    #[test]
    fn test_empty_pile_scores_zero() {
        assert_eq!(AssetPile::new().round_score(&ScoreRules::default()), 0);
    }

    #[test]
    fn test_simple_sum() {
        // AH (-50) + QS (-100) + JD (+100)
        let p = pile(&["AH", "QS", "JD"]);
        assert_eq!(p.round_score(&ScoreRules::default()), -50);
    }

    #[test]
    fn test_low_hearts_count_for_nothing() {
        let p = pile(&["2H", "3H", "4H"]);
        assert_eq!(p.round_score(&ScoreRules::default()), 0);
    }

    #[test]
    fn test_lone_transformer_stands_on_its_value() {
        let p = pile(&["TC"]);
        assert_eq!(p.round_score(&ScoreRules::default()), 50);
        let exposed = pile(&["TCx"]);
        assert_eq!(exposed.round_score(&ScoreRules::default()), 100);
    }

    #[test]
    fn test_transformer_over_worthless_hearts_stands_alone() {
        // The hearts sum to zero, so the transformer has nothing to
        // multiply and contributes its own value.
        let p = pile(&["2H", "TC"]);
        assert_eq!(p.round_score(&ScoreRules::default()), 50);
    }

    #[test]
    fn test_transformer_doubles_a_penalty() {
        let p = pile(&["QS", "TC"]);
        assert_eq!(p.round_score(&ScoreRules::default()), -200);
    }

    #[test]
    fn test_transformer_doubles_a_bonus() {
        let p = pile(&["JD", "TC"]);
        assert_eq!(p.round_score(&ScoreRules::default()), 200);
    }

    #[test]
    fn test_two_transformers_compound() {
        // Double deck: both transformers captured by one seat.
        let p = pile(&["QS", "TC", "TC"]);
        assert_eq!(p.round_score(&ScoreRules::default()), -400);
    }

    #[test]
    fn test_exposed_transformer_compounds_harder() {
        // QSx (-200) x (2 * 2) for the exposed transformer.
        let p = pile(&["QSx", "TCx"]);
        assert_eq!(p.round_score(&ScoreRules::default()), -800);
    }

    #[test]
    fn test_clear_resets_the_pile() {
        let mut p = pile(&["QS", "AH"]);
        assert_eq!(p.len(), 2);
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.round_score(&ScoreRules::default()), 0);
    }
}
