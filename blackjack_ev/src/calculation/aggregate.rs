use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    Accumulator, CardCount, DrawProbability, Error, Outcome, Rank, Rules, ScenarioResult, Shoe,
    Solver,
};

/// One starting situation: the player's two cards and the dealer's up card,
/// in dealing order, with the chance of seeing them off a fresh shoe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InitialHand {
    pub player: (Rank, Rank),
    pub dealer_up_card: Rank,
    pub probability: f64,
    pub result: ScenarioResult,
}

#[derive(Clone, Debug, Serialize)]
pub struct InitialHandsReport {
    pub hands: Vec<InitialHand>,
    /// Expected cash flow of a whole round played optimally.
    pub total: Outcome,
    /// Sum of all hand probabilities. 1 up to rounding.
    pub mass: f64,
}

impl InitialHandsReport {
    fn from_hands(hands: Vec<InitialHand>) -> Self {
        let mut acc = Accumulator::default();
        for hand in &hands {
            acc += hand.result.outcome.scaled(hand.probability);
        }
        InitialHandsReport {
            hands,
            total: acc.into_outcome(),
            mass: acc.mass(),
        }
    }

    /// Expected return per unit bet. Negative is the house edge.
    pub fn expected_return(&self) -> f64 {
        self.total.net()
    }
}

/// All 1000 ordered (player, player, dealer) rank triples.
fn initial_triples() -> impl Iterator<Item = (Rank, Rank, Rank)> {
    Rank::iter().flat_map(|first| {
        Rank::iter().flat_map(move |second| Rank::iter().map(move |up| (first, second, up)))
    })
}

/// `None` when the fresh shoe cannot produce the triple.
fn evaluate_initial_hand(
    solver: &mut Solver,
    fresh: &Shoe,
    (first, second, up): (Rank, Rank, Rank),
) -> Option<InitialHand> {
    let mut draw = DrawProbability::new(fresh.cards());
    let probability = draw.update(first) * draw.update(second) * draw.update(up);
    if probability == 0.0 {
        return None;
    }

    let mut shoe = fresh.clone();
    for rank in [first, second, up] {
        shoe.remove(rank);
    }
    let player = CardCount::from_ranks(&[first, second]);
    let dealer = CardCount::from_ranks(&[up]);
    let result = solver.decide(&shoe, &player, &dealer, &CardCount::empty());

    tracing::info!(
        player = %player,
        dealer = %up,
        probability,
        action = %result.action,
        payoff = result.payoff(),
        "initial hand"
    );
    Some(InitialHand {
        player: (first, second),
        dealer_up_card: up,
        probability,
        result,
    })
}

/// Decides every initial hand dealt from a fresh shoe under the solver's
/// rules, reusing its memo tables across hands.
pub fn evaluate_initial_hands(solver: &mut Solver) -> Result<InitialHandsReport, Error> {
    let fresh = Shoe::from_rules(solver.rules())?;
    let hands = initial_triples()
        .filter_map(|triple| evaluate_initial_hand(solver, &fresh, triple))
        .collect();
    Ok(InitialHandsReport::from_hands(hands))
}

/// Same as `evaluate_initial_hands`, split over `number_of_threads` workers,
/// each with a solver of its own. 0 means one per available core. Rows come
/// back in the same order either way.
pub fn evaluate_initial_hands_parallel(
    rules: &Rules,
    number_of_threads: usize,
) -> Result<InitialHandsReport, Error> {
    let fresh = Shoe::from_rules(rules)?;
    let number_of_threads = {
        if number_of_threads == 0 {
            let parallelism = std::thread::available_parallelism();
            match parallelism {
                Ok(n) => n.get(),
                Err(_) => 1,
            }
        } else {
            number_of_threads
        }
    };

    let triples: Vec<_> = initial_triples().collect();
    // Consecutive triples share the player's first card, which keeps each
    // worker's memo tables warm.
    let chunk = (triples.len() + number_of_threads - 1) / number_of_threads;
    tracing::info!(number_of_threads, chunk, "evaluating initial hands");

    let mut hands = Vec::with_capacity(triples.len());
    std::thread::scope(|scope| -> Result<(), Error> {
        let fresh = &fresh;
        let handles: Vec<_> = triples
            .chunks(chunk)
            .map(|triples| {
                scope.spawn(move || -> Result<Vec<InitialHand>, Error> {
                    let mut solver = Solver::new(*rules)?;
                    let hands = triples
                        .iter()
                        .filter_map(|&triple| evaluate_initial_hand(&mut solver, fresh, triple))
                        .collect();
                    let (player_states, dealer_states) = solver.cache_sizes();
                    tracing::debug!(player_states, dealer_states, "worker finished");
                    Ok(hands)
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(part) => hands.extend(part?),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        Ok(())
    })?;

    Ok(InitialHandsReport::from_hands(hands))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triples_cover_every_rank_combination() {
        let triples: Vec<_> = initial_triples().collect();
        assert_eq!(triples.len(), 1000);
        assert_eq!(triples[0], (Rank::Ace, Rank::Ace, Rank::Ace));
        assert_eq!(triples[999], (Rank::Ten, Rank::Ten, Rank::Ten));
    }

    #[test]
    fn initial_probabilities_sum_to_one() {
        let fresh = Shoe::new(1, 0).unwrap();
        let total: f64 = initial_triples()
            .map(|(first, second, up)| {
                let mut draw = DrawProbability::new(fresh.cards());
                draw.update(first) * draw.update(second) * draw.update(up)
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn report_weights_rows_by_probability() {
        let stand = |returned| {
            ScenarioResult::new(crate::PlayerAction::Stand, Outcome::new(1.0, returned))
        };
        let hands = vec![
            InitialHand {
                player: (Rank::Ace, Rank::Ten),
                dealer_up_card: Rank::Five,
                probability: 0.25,
                result: stand(2.5),
            },
            InitialHand {
                player: (Rank::Ten, Rank::Six),
                dealer_up_card: Rank::Ten,
                probability: 0.75,
                result: stand(0.5),
            },
        ];
        let report = InitialHandsReport::from_hands(hands);
        assert_eq!(report.mass, 1.0);
        assert_eq!(report.total.invested, 1.0);
        assert!((report.expected_return() - (0.25 * 1.5 - 0.75 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn single_deck_house_edge() {
        let rules = Rules::default();
        let report = evaluate_initial_hands_parallel(&rules, 0).unwrap();
        assert_eq!(report.hands.len(), 1000);
        assert!((report.mass - 1.0).abs() < 1e-9);
        // Single deck, H17, double any cards, 3:2, no splits.
        assert!((report.expected_return() - (-0.003779)).abs() < 1e-5);
    }

    #[test]
    fn parallel_matches_sequential() {
        let rules = Rules::default();
        let mut solver = Solver::new(rules).unwrap();
        let sequential = evaluate_initial_hands(&mut solver).unwrap();
        let parallel = evaluate_initial_hands_parallel(&rules, 3).unwrap();
        assert_eq!(sequential.hands.len(), parallel.hands.len());
        for (a, b) in sequential.hands.iter().zip(&parallel.hands) {
            assert_eq!(a.player, b.player);
            assert_eq!(a.result.action, b.result.action);
            assert!((a.result.outcome.net() - b.result.outcome.net()).abs() < 1e-12);
        }
        assert!((sequential.expected_return() - parallel.expected_return()).abs() < 1e-12);
    }
}
