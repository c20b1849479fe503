use std::fmt;

use crate::{CardCount, Rank};

/// Value of a hand as far as the rules care. Two hands with equal scores are
/// interchangeable once the player stops drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Score {
    value: u32,
    soft: bool,
    blackjack: bool,
}

impl Score {
    pub fn of(hand: &CardCount) -> Score {
        // Checked first: a natural is never soft and never re-evaluated.
        if hand.get_total() == 2 && hand[Rank::Ace] == 1 && hand[Rank::Ten] == 1 {
            return Score {
                value: 21,
                soft: false,
                blackjack: true,
            };
        }

        let hard = hand.get_sum();
        if hand.has_ace() && hard + 10 <= 21 {
            Score {
                value: hard + 10,
                soft: true,
                blackjack: false,
            }
        } else {
            Score {
                value: hard,
                soft: false,
                blackjack: false,
            }
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// An ace is still counted as 11.
    pub fn soft(&self) -> bool {
        self.soft
    }

    pub fn blackjack(&self) -> bool {
        self.blackjack
    }

    pub fn bust(&self) -> bool {
        self.value > 21
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blackjack {
            write!(f, "blackjack")
        } else if self.bust() {
            write!(f, "bust ({})", self.value)
        } else if self.soft {
            write!(f, "soft {}", self.value)
        } else {
            write!(f, "hard {}", self.value)
        }
    }
}
