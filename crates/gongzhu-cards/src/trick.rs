//! Trick resolution for single- and double-deck play.

use crate::{Card, Suit};

/// A play's standing in the current trick, if it can contend at all.
///
/// Only plays whose cards all match the lead suit contend; everything
/// else is a discard and can never win.
#[derive(Debug, Clone, Copy)]
struct Contender {
    /// Both cards share one rank (only possible for two-card plays).
    pair: bool,
    /// Highest rank ordinal in the play.
    top: u8,
}

fn contender(play: &[Card], lead: Suit) -> Option<Contender> {
    if play.is_empty() || play.iter().any(|c| c.suit() != lead) {
        return None;
    }
    let top = play
        .iter()
        .map(|c| c.rank().ordinal())
        .max()
        .unwrap_or(0);
    let pair = play.len() == 2 && play[0].rank() == play[1].rank();
    Some(Contender { pair, top })
}

/// Resolves one trick and returns the winning seat.
///
/// `plays` is ordered by play offset: `plays[0]` is the leader's play,
/// `plays[i]` the play of seat `(leader + i) % 4`. Each play holds one
/// or two cards.
///
/// Rules:
/// - Only cards matching the lead suit can win; the highest rank wins
///   and earlier plays win rank ties.
/// - A later same-suit pair beats an earlier pair only on higher rank.
/// - A later same-suit non-pair can beat an earlier pair only when the
///   lead suit is not diamonds — diamond pairs are protected. Against
///   an earlier non-pair, a higher top rank always wins.
pub fn resolve_trick(leader: usize, plays: &[Vec<Card>; 4]) -> usize {
    let lead = plays[0][0].suit();

    // The leader always opens the bidding, even with a mixed play whose
    // off-suit card is ignored.
    let leader_top = plays[0]
        .iter()
        .filter(|c| c.suit() == lead)
        .map(|c| c.rank().ordinal())
        .max()
        .unwrap_or(0);
    let mut best = Contender {
        pair: plays[0].len() == 2
            && plays[0][0].rank() == plays[0][1].rank()
            && plays[0][1].suit() == lead,
        top: leader_top,
    };
    let mut best_offset = 0;

    for (offset, play) in plays.iter().enumerate().skip(1) {
        let Some(challenger) = contender(play, lead) else {
            continue;
        };
        let pair_protected =
            best.pair && !challenger.pair && lead == Suit::Diamonds;
        if challenger.top > best.top && !pair_protected {
            best = challenger;
            best_offset = offset;
        }
    }

    (leader + best_offset) % 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Card;

    fn play(aliases: &[&str]) -> Vec<Card> {
        aliases
            .iter()
            .map(|a| Card::parse_alias(a).unwrap())
            .collect()
    }

    fn trick(leader: usize, plays: [&[&str]; 4]) -> usize {
        let plays = [
            play(plays[0]),
            play(plays[1]),
            play(plays[2]),
            play(plays[3]),
        ];
        resolve_trick(leader, &plays)
    }

    // =====================================================================
    // Single-card tricks
    // =====================================================================

    #[test]
    fn test_higher_rank_in_lead_suit_wins() {
        // Leader 9S; KS outranks it; 2H never contends.
        let winner = trick(0, [&["9S"], &["KS"], &["2H"], &["3S"]]);
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_off_suit_cannot_win() {
        let winner = trick(0, [&["2C"], &["AH"], &["AD"], &["AS"]]);
        assert_eq!(winner, 0);
    }

    #[test]
    fn test_earlier_play_wins_rank_ties() {
        // Double deck: two copies of KS. First one keeps the trick.
        let winner = trick(0, [&["KS"], &["KS"], &["2S"], &["3S"]]);
        assert_eq!(winner, 0);
    }

    #[test]
    fn test_winner_is_absolute_seat_not_offset() {
        // Leader is seat 2, third play (offset 2 → seat 0) wins.
        let winner = trick(2, [&["4D"], &["3D"], &["KD"], &["2H"]]);
        assert_eq!(winner, 0);
    }

    // =====================================================================
    // Two-card tricks
    // =====================================================================

    #[test]
    fn test_higher_pair_beats_lower_pair() {
        let winner =
            trick(0, [&["7S", "7S"], &["9S", "9S"], &["2C", "3C"], &["2H", "4D"]]);
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_lower_pair_cannot_beat_higher_pair() {
        let winner =
            trick(0, [&["9S", "9S"], &["7S", "7S"], &["2C", "3C"], &["2H", "4D"]]);
        assert_eq!(winner, 0);
    }

    #[test]
    fn test_diamond_pair_is_protected_from_non_pair() {
        // A higher same-suit non-pair does not break a diamond pair.
        let winner =
            trick(0, [&["7D", "7D"], &["AD", "KD"], &["2C", "3C"], &["2H", "4H"]]);
        assert_eq!(winner, 0);
    }

    #[test]
    fn test_diamond_pair_loses_to_higher_pair() {
        let winner =
            trick(0, [&["7D", "7D"], &["9D", "9D"], &["2C", "3C"], &["2H", "4H"]]);
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_non_diamond_pair_falls_to_higher_non_pair() {
        // Outside diamonds the protection does not apply.
        let winner =
            trick(0, [&["7S", "7S"], &["AS", "KS"], &["2C", "3C"], &["2H", "4H"]]);
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_non_pair_beats_earlier_non_pair_on_top_rank() {
        let winner =
            trick(0, [&["QD", "2D"], &["AD", "3D"], &["2C", "3C"], &["2H", "4H"]]);
        assert_eq!(winner, 1);
    }

    #[test]
    fn test_mixed_discard_never_wins() {
        // Two suits in one play is a discard even if one card is huge.
        let winner =
            trick(0, [&["7S", "7S"], &["AS", "AH"], &["2C", "3C"], &["2D", "4D"]]);
        assert_eq!(winner, 0);
    }
}
