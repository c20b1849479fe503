use std::fmt;

use strum::IntoEnumIterator;

use crate::{CardCount, Error, Rank, Rules};

/// Undealt cards plus the cut card position.
///
/// `cut_card` is the number of cards left in the shoe when the cut card comes
/// out. From then on the next draw first merges the discard pile back in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shoe {
    cards: CardCount,
    cut_card: u16,
}

impl Shoe {
    pub fn new(number_of_decks: u8, cut_card_offset: u16) -> Result<Shoe, Error> {
        if number_of_decks == 0 {
            return Err(Error::NoDecks);
        }
        Self::from_cards(CardCount::with_number_of_decks(number_of_decks), cut_card_offset)
    }

    pub fn from_rules(rules: &Rules) -> Result<Shoe, Error> {
        Self::new(rules.number_of_decks, rules.cut_card_offset)
    }

    /// A shoe holding exactly `cards`, e.g. a partially dealt one.
    pub fn from_cards(cards: CardCount, cut_card: u16) -> Result<Shoe, Error> {
        if cut_card >= cards.get_total() {
            return Err(Error::CutCardTooDeep {
                cut_card_offset: cut_card,
                shoe_size: cards.get_total(),
            });
        }
        Ok(Shoe { cards, cut_card })
    }

    pub fn count(&self, rank: Rank) -> u16 {
        self.cards[rank]
    }

    pub fn total(&self) -> u16 {
        self.cards.get_total()
    }

    pub fn cut_card(&self) -> u16 {
        self.cut_card
    }

    pub fn cards(&self) -> &CardCount {
        &self.cards
    }

    /// Chance that the next card is `rank`. Zero when none are left.
    pub fn probability(&self, rank: Rank) -> f64 {
        match self.cards[rank] {
            0 => 0.0,
            count => count as f64 / self.total() as f64,
        }
    }

    /// Every rank that can come next together with its probability.
    /// The weights sum to 1 whenever the shoe is not empty.
    pub fn draw_weights(&self) -> impl Iterator<Item = (Rank, f64)> + '_ {
        Rank::iter()
            .filter(move |&rank| self.cards[rank] > 0)
            .map(move |rank| (rank, self.probability(rank)))
    }

    pub fn remove(&mut self, rank: Rank) {
        self.cards.remove_card(rank);
    }

    pub fn add(&mut self, rank: Rank) {
        self.cards.add_card(rank);
    }

    /// The cut card has come out. A shoe already dealt below the cut card
    /// counts as exhausted too.
    pub fn exhausted(&self) -> bool {
        self.total() <= self.cut_card
    }

    /// Merges the discard pile back in and empties it. Doing it again with
    /// the emptied pile changes nothing.
    pub fn reshuffle(&mut self, discard: &mut CardCount) {
        self.cards += discard;
        *discard = CardCount::empty();
    }

    /// The shoe and discard pile a draw actually sees: reshuffled when the
    /// cut card is out and there is something to merge, otherwise unchanged.
    /// The inputs are left alone so sibling branches keep their own view.
    pub fn ready_to_draw(&self, discard: &CardCount) -> Option<(Shoe, CardCount)> {
        if self.exhausted() && !discard.is_empty() {
            let mut shoe = self.clone();
            let mut discard = discard.clone();
            shoe.reshuffle(&mut discard);
            Some((shoe, discard))
        } else {
            None
        }
    }
}

impl fmt::Display for Shoe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for rank in std::iter::once(Rank::Ace).chain(Rank::iter().rev().take(9)) {
            write!(f, "{}{}x{}", sep, rank, self.cards[rank])?;
            sep = ", ";
        }
        write!(f, " ({} left, cut at {})", self.total(), self.cut_card)
    }
}

/// Probability of dealing a particular sequence of ranks, without
/// replacement, from a starting set of cards.
#[derive(Clone, Debug)]
pub struct DrawProbability {
    cards: CardCount,
}

impl DrawProbability {
    pub fn new(cards: &CardCount) -> Self {
        Self {
            cards: cards.clone(),
        }
    }

    /// Probability of `rank` being the next card; the card is then taken out.
    pub fn update(&mut self, rank: Rank) -> f64 {
        let count = self.cards[rank];
        if count == 0 {
            return 0.0;
        }
        let p = count as f64 / self.cards.get_total() as f64;
        self.cards.remove_card(rank);
        p
    }

    pub fn remaining(&self) -> &CardCount {
        &self.cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_sum_to_one() {
        let mut shoe = Shoe::new(2, 10).unwrap();
        let ranks = [Rank::Ten, Rank::Ten, Rank::Ace, Rank::Five, Rank::Ten];
        for rank in ranks {
            let total: f64 = Rank::iter().map(|r| shoe.probability(r)).sum();
            assert!((total - 1.0).abs() < 1e-12);
            let weights: f64 = shoe.draw_weights().map(|(_, p)| p).sum();
            assert!((weights - 1.0).abs() < 1e-12);
            shoe.remove(rank);
        }
    }

    #[test]
    fn exhausted_rank_has_zero_probability() {
        let cards: CardCount = "T5".parse().unwrap();
        let mut shoe = Shoe::from_cards(cards, 0).unwrap();
        assert_eq!(shoe.probability(Rank::Five), 0.5);
        shoe.remove(Rank::Five);
        assert_eq!(shoe.probability(Rank::Five), 0.0);
        assert_eq!(shoe.probability(Rank::Ten), 1.0);
        assert_eq!(shoe.draw_weights().count(), 1);
    }

    #[test]
    fn exhausted_at_cut_card() {
        let cards: CardCount = "T55".parse().unwrap();
        let mut shoe = Shoe::from_cards(cards, 2).unwrap();
        assert!(!shoe.exhausted());
        shoe.remove(Rank::Ten);
        assert!(shoe.exhausted());
        assert_eq!(shoe.total(), shoe.cut_card());
        shoe.remove(Rank::Five);
        assert!(shoe.exhausted());
    }

    #[test]
    fn largest_shoe_from_rules() {
        let rules = Rules::new(u8::MAX, 0, true, true).unwrap();
        let shoe = Shoe::from_rules(&rules).unwrap();
        assert_eq!(shoe.total(), rules.shoe_size());
        assert!((shoe.probability(Rank::Ten) - 4.0 / 13.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_deep_cut_card() {
        assert_eq!(
            Shoe::new(1, 52),
            Err(Error::CutCardTooDeep {
                cut_card_offset: 52,
                shoe_size: 52
            })
        );
        assert_eq!(Shoe::new(0, 0), Err(Error::NoDecks));
        assert!(Shoe::new(1, 51).is_ok());
    }

    #[test]
    fn reshuffle_merges_and_clears_discard() {
        let mut shoe = Shoe::from_cards("TT".parse().unwrap(), 1).unwrap();
        shoe.remove(Rank::Ten);
        let mut discard: CardCount = "22".parse().unwrap();

        let (merged, cleared) = shoe.ready_to_draw(&discard).unwrap();
        assert_eq!(merged.total(), 3);
        assert_eq!(merged.count(Rank::Two), 2);
        assert!(cleared.is_empty());
        // the originals are untouched
        assert_eq!(shoe.total(), 1);
        assert_eq!(discard.get_total(), 2);

        shoe.reshuffle(&mut discard);
        assert_eq!(shoe, merged);
        shoe.reshuffle(&mut discard);
        assert_eq!(shoe, merged);
        assert!(shoe.ready_to_draw(&discard).is_none());
    }

    #[test]
    fn no_reshuffle_before_cut_card() {
        let shoe = Shoe::new(1, 20).unwrap();
        let discard: CardCount = "9".parse().unwrap();
        assert!(shoe.ready_to_draw(&discard).is_none());
    }

    #[test]
    fn sequential_draw_probability() {
        let mut draw = DrawProbability::new(&CardCount::with_number_of_decks(1));
        let p = draw.update(Rank::Ace) * draw.update(Rank::Ten);
        assert!((p - (4.0 / 52.0) * (16.0 / 51.0)).abs() < 1e-15);
        assert_eq!(draw.remaining().get_total(), 50);

        let mut draw = DrawProbability::new(&"A".parse().unwrap());
        assert_eq!(draw.update(Rank::Ace), 1.0);
        assert_eq!(draw.update(Rank::Ace), 0.0);
    }
}
