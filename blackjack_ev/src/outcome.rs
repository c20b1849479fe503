use std::fmt;
use std::ops::{AddAssign, Mul, MulAssign};

use serde::Serialize;

use crate::PlayerAction;

/// Expected cash flow of a line of play, weighted by the chance of reaching
/// it. `invested` and `returned` are per unit of original stake.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Outcome {
    pub invested: f64,
    pub returned: f64,
    pub probability: f64,
}

impl Outcome {
    pub fn new(invested: f64, returned: f64) -> Self {
        Self {
            invested,
            returned,
            probability: 1.0,
        }
    }

    /// Return per unit invested: `(returned - invested) / invested`.
    pub fn payoff(&self) -> f64 {
        if self.invested == 0.0 {
            return 0.0;
        }
        (self.returned - self.invested) / self.invested
    }

    /// Net gain per unit of original stake. This is what actions compete on.
    pub fn net(&self) -> f64 {
        self.returned - self.invested
    }

    /// Scales the probability of reaching this outcome, never the amounts.
    pub fn scaled(self, probability: f64) -> Self {
        self * probability
    }

    pub fn double_down(&mut self) {
        self.invested *= 2.0;
        self.returned *= 2.0;
    }
}

impl MulAssign<f64> for Outcome {
    fn mul_assign(&mut self, probability: f64) {
        self.probability *= probability;
    }
}

impl Mul<f64> for Outcome {
    type Output = Outcome;
    fn mul(mut self, probability: f64) -> Self::Output {
        self *= probability;
        self
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invested {:.6} returned {:.6} payoff {:+.4}%",
            self.invested,
            self.returned,
            self.payoff() * 100.0
        )
    }
}

/// Sums mutually exclusive branches: each contributes `invested` and
/// `returned` weighted by its probability.
#[derive(Clone, Copy, Debug, Default)]
pub struct Accumulator {
    invested: f64,
    returned: f64,
    mass: f64,
}

impl Accumulator {
    /// Total probability of the branches added so far.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// The combined outcome. Its probability is 1: the amounts already carry
    /// the branch weights.
    pub fn into_outcome(self) -> Outcome {
        Outcome::new(self.invested, self.returned)
    }
}

impl AddAssign<Outcome> for Accumulator {
    fn add_assign(&mut self, rhs: Outcome) {
        self.invested += rhs.invested * rhs.probability;
        self.returned += rhs.returned * rhs.probability;
        self.mass += rhs.probability;
    }
}

/// Best action at a decision point together with what it is worth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub action: PlayerAction,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ScenarioResult {
    pub fn new(action: PlayerAction, outcome: Outcome) -> Self {
        Self { action, outcome }
    }

    pub fn payoff(&self) -> f64 {
        self.outcome.payoff()
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : pays {:+.6}", self.action, self.outcome.net())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payoff_ratio() {
        assert_eq!(Outcome::new(1.0, 2.5).payoff(), 1.5);
        assert_eq!(Outcome::new(1.0, 0.0).payoff(), -1.0);
        assert_eq!(Outcome::new(2.0, 4.0).payoff(), 1.0);
        assert_eq!(Outcome::new(2.0, 4.0).net(), 2.0);
    }

    #[test]
    fn scaling_touches_probability_only() {
        let o = Outcome::new(1.0, 2.0).scaled(0.25).scaled(0.5);
        assert_eq!(o.invested, 1.0);
        assert_eq!(o.returned, 2.0);
        assert_eq!(o.probability, 0.125);
    }

    #[test]
    fn double_down_doubles_amounts() {
        let mut o = Outcome::new(1.0, 1.5);
        o.double_down();
        assert_eq!(o, Outcome::new(2.0, 3.0));
        assert_eq!(o.payoff(), 0.5);
    }

    #[test]
    fn accumulates_weighted_branches() {
        let mut acc = Accumulator::default();
        acc += Outcome::new(1.0, 2.0).scaled(0.25);
        acc += Outcome::new(1.0, 0.0).scaled(0.5);
        acc += Outcome::new(2.0, 4.0).scaled(0.25);
        assert_eq!(acc.mass(), 1.0);

        let o = acc.into_outcome();
        assert_eq!(o.invested, 0.25 + 0.5 + 0.5);
        assert_eq!(o.returned, 0.5 + 1.0);
        assert_eq!(o.probability, 1.0);
    }
}
