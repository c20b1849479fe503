use std::fmt;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::{CardCount, Error, Score};

/// Table rules. Never changes during a search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rules {
    pub number_of_decks: u8,
    /// Cards left in the shoe when the cut card comes out.
    pub cut_card_offset: u16,
    pub dealer_hit_on_soft17: bool,
    /// Only consulted for split hands, which the solver never produces.
    pub allow_das: bool,
    pub double_policy: DoublePolicy,
    /// Net win on a natural per unit staked. 1.5 means 3:2.
    pub payout_blackjack: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum DoublePolicy {
    /// Whenever a hit is allowed, including after earlier hits.
    AnyCards,
    AnyTwo,
    NineTenElevenOnly,
    TenElevenOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerAction {
    Stand,
    Hit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    PlayerWin,
    PlayerBlackjack,
    DealerWin,
    Push,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GameResult::PlayerWin => "player win",
            GameResult::PlayerBlackjack => "blackjack",
            GameResult::DealerWin => "dealer win",
            GameResult::Push => "push",
        };
        write!(f, "{}", text)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            number_of_decks: 1,
            cut_card_offset: 0,
            dealer_hit_on_soft17: true,
            allow_das: true,
            double_policy: DoublePolicy::AnyCards,
            payout_blackjack: 1.5,
        }
    }
}

impl Rules {
    pub fn new(
        number_of_decks: u8,
        cut_card_offset: u16,
        dealer_hit_on_soft17: bool,
        allow_das: bool,
    ) -> Result<Rules, Error> {
        let rules = Rules {
            number_of_decks,
            cut_card_offset,
            dealer_hit_on_soft17,
            allow_das,
            ..Default::default()
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn shoe_size(&self) -> u16 {
        self.number_of_decks as u16 * 52
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.number_of_decks == 0 {
            return Err(Error::NoDecks);
        }
        if self.cut_card_offset >= self.shoe_size() {
            return Err(Error::CutCardTooDeep {
                cut_card_offset: self.cut_card_offset,
                shoe_size: self.shoe_size(),
            });
        }
        if !self.payout_blackjack.is_finite() || self.payout_blackjack <= 0.0 {
            return Err(Error::InvalidPayout(self.payout_blackjack));
        }
        Ok(())
    }

    pub fn may_stand(&self, _hand: &CardCount) -> bool {
        true
    }

    pub fn may_hit(&self, hand: &CardCount) -> bool {
        let score = Score::of(hand);
        !score.blackjack() && !score.bust()
    }

    /// `after_split` marks a hand produced by splitting. Splits are not
    /// evaluated, so the solver always passes `false`.
    pub fn may_double(&self, hand: &CardCount, after_split: bool) -> bool {
        if !self.may_hit(hand) || (after_split && !self.allow_das) {
            return false;
        }
        let score = Score::of(hand);
        match self.double_policy {
            DoublePolicy::AnyCards => true,
            DoublePolicy::AnyTwo => hand.get_total() == 2,
            DoublePolicy::NineTenElevenOnly => {
                hand.get_total() == 2 && !score.soft() && (9..=11).contains(&score.value())
            }
            DoublePolicy::TenElevenOnly => {
                hand.get_total() == 2 && !score.soft() && (10..=11).contains(&score.value())
            }
        }
    }

    pub fn may_split(&self, hand: &CardCount) -> bool {
        hand.is_pair().is_some()
    }

    pub fn dealer_action(&self, dealer_score: Score) -> DealerAction {
        match dealer_score.value() {
            0..=16 => DealerAction::Hit,
            17 if dealer_score.soft() && self.dealer_hit_on_soft17 => DealerAction::Hit,
            _ => DealerAction::Stand,
        }
    }

    pub fn result_of(&self, player_score: Score, dealer_score: Score) -> GameResult {
        if dealer_score.blackjack() {
            return if player_score.blackjack() {
                GameResult::Push
            } else {
                GameResult::DealerWin
            };
        }
        if player_score.blackjack() {
            return GameResult::PlayerBlackjack;
        }
        if player_score.bust() {
            return GameResult::DealerWin;
        }
        if dealer_score.bust() {
            return GameResult::PlayerWin;
        }
        match player_score.value().cmp(&dealer_score.value()) {
            std::cmp::Ordering::Greater => GameResult::PlayerWin,
            std::cmp::Ordering::Less => GameResult::DealerWin,
            std::cmp::Ordering::Equal => GameResult::Push,
        }
    }

    /// Amount returned per unit staked, stake included.
    pub fn payoff(&self, result: GameResult) -> f64 {
        match result {
            GameResult::PlayerBlackjack => 1.0 + self.payout_blackjack,
            GameResult::PlayerWin => 2.0,
            GameResult::Push => 1.0,
            GameResult::DealerWin => 0.0,
        }
    }
}
