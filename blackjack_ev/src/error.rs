use thiserror::Error;

use crate::{simulation::GamePhase, PlayerAction};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("number of decks must be at least 1")]
    NoDecks,

    #[error("cut card offset {cut_card_offset} must be smaller than the shoe size {shoe_size}")]
    CutCardTooDeep {
        cut_card_offset: u16,
        shoe_size: u16,
    },

    #[error("blackjack payout must be a positive finite number, got {0}")]
    InvalidPayout(f64),

    #[error("invalid card '{0}', expected one of A 2-9 T J Q K")]
    InvalidCard(char),

    #[error("the shoe has no cards left to deal")]
    EmptyShoe,

    #[error("{action} is only allowed in {expected:?} phase, current phase is {actual:?}")]
    WrongPhase {
        action: &'static str,
        expected: GamePhase,
        actual: GamePhase,
    },

    #[error("{action} is not allowed for hand {hand}")]
    IllegalAction { action: PlayerAction, hand: String },
}
