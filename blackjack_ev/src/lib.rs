//! Exact expected values for blackjack decisions.
//!
//! Every future card sequence is enumerated and weighted by its exact draw
//! probability from a finite, depleting shoe. The entry point is
//! [`Solver::decide`].

pub mod calculation;
mod error;
mod outcome;
mod rules;
mod score;
mod shoe;
pub mod simulation;
mod statearray;
pub mod strategy;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

pub use calculation::{
    aggregate::{evaluate_initial_hands, evaluate_initial_hands_parallel, InitialHandsReport},
    trace::{TraceSink, TracingSink},
    Solver,
};
pub use error::Error;
pub use outcome::{Accumulator, Outcome, ScenarioResult};
pub use rules::{DealerAction, DoublePolicy, GameResult, Rules};
pub use score::Score;
pub use shoe::{DrawProbability, Shoe};
pub use statearray::{CardCount, Rank, StateArray};

/// Player decisions, declared in tie-break order: when two actions pay the
/// same, the earlier one wins.
///
/// Split is deliberately absent. Pairs are detected (`CardCount::is_pair`)
/// but never evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Stand,
    Hit,
    Double,
}

impl PlayerAction {
    pub fn to_char(self) -> char {
        match self {
            PlayerAction::Stand => 'S',
            PlayerAction::Hit => 'H',
            PlayerAction::Double => 'D',
        }
    }
}
