use std::fmt;

use blackjack_ev_macros::allowed_phase;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    CardCount, DealerAction, Error, GameResult, PlayerAction, Rank, Rules, ScenarioResult, Score,
    Shoe, Solver, TraceSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    WaitForDeal,
    PlayerTurn,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GamePhase::WaitForDeal => "waiting for a deal",
            GamePhase::PlayerTurn => "player's turn",
        };
        write!(f, "{}", text)
    }
}

/// How a finished round went, in units of the original stake.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub player: CardCount,
    pub dealer: CardCount,
    pub result: GameResult,
    pub bet: f64,
    pub returned: f64,
}

impl RoundSummary {
    pub fn net(&self) -> f64 {
        self.returned - self.bet
    }
}

impl fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "player {} ({}) vs dealer {} ({}): {}, net {:+}",
            self.player,
            Score::of(&self.player),
            self.dealer,
            Score::of(&self.dealer),
            self.result,
            self.net()
        )
    }
}

/// A single-seat table dealing real rounds from a depleting shoe.
///
/// The dealer takes one up card and no hole card, drawing the rest only when
/// the player stands or doubles. Finished hands go to the discard pile, which
/// is shuffled back in once the cut card comes out. The solver behind
/// `advise` and `explain` sees the same shoe and discard pile, so its advice
/// is exact for the situation on the table.
pub struct Table {
    rules: Rules,
    solver: Solver,
    rng: StdRng,

    // Game state
    current_game_phase: GamePhase,
    shoe: Shoe,
    discard: CardCount,
    player_hand: CardCount,
    dealer_hand: CardCount,
    bet: f64,

    bankroll: f64,
    rounds_played: u32,
}

impl Table {
    /// A table with a fresh shoe. `seed` makes the card order reproducible.
    pub fn new(rules: Rules, seed: Option<u64>) -> Result<Self, Error> {
        let shoe = Shoe::from_rules(&rules)?;
        Self::with_shoe(rules, shoe, seed)
    }

    /// A table continuing from an arbitrary shoe, e.g. a partially dealt one.
    pub fn with_shoe(rules: Rules, shoe: Shoe, seed: Option<u64>) -> Result<Self, Error> {
        let solver = Solver::new(rules)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rules,
            solver,
            rng,
            current_game_phase: GamePhase::WaitForDeal,
            shoe,
            discard: CardCount::empty(),
            player_hand: CardCount::empty(),
            dealer_hand: CardCount::empty(),
            bet: 0.0,
            bankroll: 0.0,
            rounds_played: 0,
        })
    }

    /// Deals two cards to the player and the up card to the dealer. A player
    /// blackjack is settled at once.
    #[allowed_phase(WaitForDeal)]
    pub fn deal(&mut self) -> Result<Option<RoundSummary>, Error> {
        // Rounds rarely revisit earlier shoe states.
        self.solver.clear();

        let mut dealt = Vec::with_capacity(3);
        for _ in 0..3 {
            match self.draw_card() {
                Some(rank) => dealt.push(rank),
                None => {
                    for rank in dealt {
                        self.shoe.add(rank);
                    }
                    return Err(Error::EmptyShoe);
                }
            }
        }
        self.player_hand = CardCount::from_ranks(&dealt[..2]);
        self.dealer_hand = CardCount::from_ranks(&dealt[2..]);
        self.bet = 1.0;
        self.current_game_phase = GamePhase::PlayerTurn;
        tracing::debug!(player = %self.player_hand, dealer = %self.dealer_hand, "dealt");

        if Score::of(&self.player_hand).blackjack() {
            return Ok(Some(self.dealer_plays_and_settle()));
        }
        Ok(None)
    }

    #[allowed_phase(PlayerTurn)]
    pub fn hit(&mut self) -> Result<Option<RoundSummary>, Error> {
        self.check_legal(PlayerAction::Hit)?;
        let rank = self.draw_card().ok_or(Error::EmptyShoe)?;
        self.player_hand.add_card(rank);

        if Score::of(&self.player_hand).bust() {
            return Ok(Some(self.settle()));
        }
        Ok(None)
    }

    #[allowed_phase(PlayerTurn)]
    pub fn stand(&mut self) -> Result<RoundSummary, Error> {
        Ok(self.dealer_plays_and_settle())
    }

    /// Doubles the bet, takes exactly one card and ends the player's turn.
    #[allowed_phase(PlayerTurn)]
    pub fn double(&mut self) -> Result<RoundSummary, Error> {
        self.check_legal(PlayerAction::Double)?;
        let rank = self.draw_card().ok_or(Error::EmptyShoe)?;
        self.player_hand.add_card(rank);
        self.bet *= 2.0;

        if Score::of(&self.player_hand).bust() {
            return Ok(self.settle());
        }
        Ok(self.dealer_plays_and_settle())
    }

    /// The exact best action for the hand on the table.
    #[allowed_phase(PlayerTurn)]
    pub fn advise(&mut self) -> Result<ScenarioResult, Error> {
        Ok(self
            .solver
            .decide(&self.shoe, &self.player_hand, &self.dealer_hand, &self.discard))
    }

    /// Like `advise`, narrating the whole search into `sink`.
    #[allowed_phase(PlayerTurn)]
    pub fn explain(&mut self, sink: &mut dyn TraceSink) -> Result<ScenarioResult, Error> {
        Ok(self.solver.decide_traced(
            &self.shoe,
            &self.player_hand,
            &self.dealer_hand,
            &self.discard,
            sink,
        ))
    }

    pub fn phase(&self) -> GamePhase {
        self.current_game_phase
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn discard(&self) -> &CardCount {
        &self.discard
    }

    pub fn player_hand(&self) -> &CardCount {
        &self.player_hand
    }

    pub fn dealer_hand(&self) -> &CardCount {
        &self.dealer_hand
    }

    /// Net result of every round so far, in units of the original stake.
    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    fn check_legal(&self, action: PlayerAction) -> Result<(), Error> {
        let legal = match action {
            PlayerAction::Stand => self.rules.may_stand(&self.player_hand),
            PlayerAction::Hit => self.rules.may_hit(&self.player_hand),
            PlayerAction::Double => self.rules.may_double(&self.player_hand, false),
        };
        if legal {
            Ok(())
        } else {
            Err(Error::IllegalAction {
                action,
                hand: self.player_hand.to_string(),
            })
        }
    }

    /// Takes a random card, weighted by the counts left in the shoe. The
    /// discard pile is merged back first when the cut card is out. `None`
    /// when no card is left anywhere.
    fn draw_card(&mut self) -> Option<Rank> {
        if self.shoe.exhausted() && !self.discard.is_empty() {
            tracing::info!(
                discards = self.discard.get_total(),
                "cut card reached, reshuffling"
            );
            self.shoe.reshuffle(&mut self.discard);
        }
        let total = self.shoe.total();
        if total == 0 {
            return None;
        }

        let mut index = self.rng.gen_range(0..total);
        let mut drawn = None;
        for (rank, count) in self.shoe.cards().iter() {
            if index < count {
                drawn = Some(rank);
                break;
            }
            index -= count;
        }
        let rank = drawn?;
        self.shoe.remove(rank);
        Some(rank)
    }

    fn dealer_plays_and_settle(&mut self) -> RoundSummary {
        loop {
            let dealer_score = Score::of(&self.dealer_hand);
            if self.rules.dealer_action(dealer_score) == DealerAction::Stand {
                break;
            }
            match self.draw_card() {
                Some(rank) => self.dealer_hand.add_card(rank),
                // Nothing left to draw anywhere.
                None => break,
            }
        }
        self.settle()
    }

    fn settle(&mut self) -> RoundSummary {
        let result = self
            .rules
            .result_of(Score::of(&self.player_hand), Score::of(&self.dealer_hand));
        let summary = RoundSummary {
            player: std::mem::take(&mut self.player_hand),
            dealer: std::mem::take(&mut self.dealer_hand),
            result,
            bet: self.bet,
            returned: self.rules.payoff(result) * self.bet,
        };

        self.discard += &summary.player;
        self.discard += &summary.dealer;
        self.bankroll += summary.net();
        self.rounds_played += 1;
        self.bet = 0.0;
        self.current_game_phase = GamePhase::WaitForDeal;

        tracing::info!(
            round = self.rounds_played,
            %summary,
            bankroll = self.bankroll,
            "round finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards_on_table(table: &Table) -> u16 {
        table.shoe().total()
            + table.discard().get_total()
            + table.player_hand().get_total()
            + table.dealer_hand().get_total()
    }

    #[test]
    fn test_allowed_phase() {
        let mut table = Table::new(Rules::default(), Some(7)).unwrap();
        assert_eq!(table.phase(), GamePhase::WaitForDeal);
        assert_eq!(
            table.hit(),
            Err(Error::WrongPhase {
                action: "hit",
                expected: GamePhase::PlayerTurn,
                actual: GamePhase::WaitForDeal,
            })
        );
        assert!(table.advise().is_err());

        if table.deal().unwrap().is_none() {
            assert_eq!(table.phase(), GamePhase::PlayerTurn);
            assert!(matches!(
                table.deal(),
                Err(Error::WrongPhase {
                    action: "deal",
                    ..
                })
            ));
            table.stand().unwrap();
        }
        assert_eq!(table.phase(), GamePhase::WaitForDeal);
    }

    #[test]
    fn same_seed_same_rounds() {
        let play = |seed| {
            let mut table = Table::new(Rules::default(), Some(seed)).unwrap();
            let mut summaries = Vec::new();
            for _ in 0..20 {
                if let Some(summary) = table.deal().unwrap() {
                    summaries.push(summary);
                    continue;
                }
                while table.phase() == GamePhase::PlayerTurn {
                    if Score::of(table.player_hand()).value() < 15 {
                        if let Some(summary) = table.hit().unwrap() {
                            summaries.push(summary);
                        }
                    } else {
                        summaries.push(table.stand().unwrap());
                    }
                }
            }
            summaries
        };
        assert_eq!(play(42), play(42));
    }

    #[test]
    fn cards_are_conserved_across_reshuffles() {
        let rules = Rules {
            cut_card_offset: 20,
            ..Default::default()
        };
        let mut table = Table::new(rules, Some(3)).unwrap();
        let mut bankroll = 0.0;
        for _ in 0..50 {
            let summary = match table.deal().unwrap() {
                Some(summary) => summary,
                None => {
                    assert_eq!(cards_on_table(&table), 52);
                    table.stand().unwrap()
                }
            };
            bankroll += summary.net();
            assert_eq!(cards_on_table(&table), 52);
        }
        assert_eq!(table.rounds_played(), 50);
        assert!((table.bankroll() - bankroll).abs() < 1e-12);
    }

    #[test]
    fn double_doubles_the_bet() {
        let mut table = Table::new(Rules::default(), Some(11)).unwrap();
        loop {
            if table.deal().unwrap().is_some() {
                continue;
            }
            let summary = table.double().unwrap();
            assert_eq!(summary.bet, 2.0);
            assert_eq!(summary.player.get_total(), 3);
            assert!(summary.returned == 0.0 || summary.returned == 2.0 || summary.returned == 4.0);
            break;
        }
    }

    #[test]
    fn double_respects_policy() {
        let rules = Rules {
            double_policy: crate::DoublePolicy::AnyTwo,
            ..Default::default()
        };
        let mut table = Table::new(rules, Some(5)).unwrap();
        loop {
            if table.deal().unwrap().is_some() {
                continue;
            }
            if table.hit().unwrap().is_some() {
                continue;
            }
            let hand = table.player_hand().to_string();
            assert_eq!(
                table.double(),
                Err(Error::IllegalAction {
                    action: PlayerAction::Double,
                    hand,
                })
            );
            assert_eq!(table.phase(), GamePhase::PlayerTurn);
            break;
        }
    }

    #[test]
    fn advice_matches_solver() {
        let rules = Rules::default();
        // Tracing skips the memo tables, so keep the shoe tiny.
        let shoe = Shoe::from_cards("TTT9875A".parse().unwrap(), 0).unwrap();
        let mut table = Table::with_shoe(rules, shoe, Some(9)).unwrap();
        while table.deal().unwrap().is_some() {}
        assert_eq!(cards_on_table(&table), 8);

        let advice = table.advise().unwrap();
        let mut solver = Solver::new(rules).unwrap();
        let expected = solver.decide(
            table.shoe(),
            table.player_hand(),
            table.dealer_hand(),
            table.discard(),
        );
        assert_eq!(advice, expected);

        let mut lines: Vec<String> = Vec::new();
        let explained = table.explain(&mut lines).unwrap();
        assert_eq!(explained, expected);
        assert!(!lines.is_empty());
    }
}
