use std::borrow::Cow;

use crate::{
    calculation::trace::{Trace, TraceSink},
    Accumulator, CardCount, DealerAction, Error, Outcome, PlayerAction, Rules, ScenarioResult,
    Score, Shoe, StateArray,
};

pub mod aggregate;
pub mod trace;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PlayerKey {
    player: CardCount,
    dealer: CardCount,
    shoe: Shoe,
    discard: CardCount,
}

/// The dealer only needs the player's score, not the exact cards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DealerKey {
    player_score: Score,
    dealer: CardCount,
    shoe: Shoe,
    discard: CardCount,
}

/// Exhaustive, memoized search over player decisions and dealer play-outs.
///
/// Both memo tables live as long as the solver and are never evicted. One
/// solver must not be shared between threads; run independent solvers
/// instead (see `aggregate::evaluate_initial_hands_parallel`).
#[derive(Debug)]
pub struct Solver {
    rules: Rules,
    player_memo: StateArray<PlayerKey, ScenarioResult>,
    dealer_memo: StateArray<DealerKey, Outcome>,
}

impl Solver {
    pub fn new(rules: Rules) -> Result<Self, Error> {
        rules.validate()?;
        Ok(Self {
            rules,
            player_memo: StateArray::new(),
            dealer_memo: StateArray::new(),
        })
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Number of memoized (player decision, dealer play-out) states.
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.player_memo.len(), self.dealer_memo.len())
    }

    pub fn clear(&mut self) {
        self.player_memo.clear();
        self.dealer_memo.clear();
    }

    /// Best action for the player holding `player` against `dealer`, with the
    /// remaining `shoe` and the `discard` pile that is shuffled back in once
    /// the cut card comes out.
    pub fn decide(
        &mut self,
        shoe: &Shoe,
        player: &CardCount,
        dealer: &CardCount,
        discard: &CardCount,
    ) -> ScenarioResult {
        let result =
            self.memoization_decide(shoe, player, dealer, discard, &mut Trace::disabled(), 0);
        tracing::debug!(
            %player,
            %dealer,
            action = %result.action,
            net = result.outcome.net(),
            player_states = self.player_memo.len(),
            dealer_states = self.dealer_memo.len(),
            "decided"
        );
        result
    }

    /// Same as `decide`, narrating every branch into `sink`. The memo tables
    /// are neither read nor written, so every branch is examined afresh.
    pub fn decide_traced(
        &mut self,
        shoe: &Shoe,
        player: &CardCount,
        dealer: &CardCount,
        discard: &CardCount,
        sink: &mut dyn TraceSink,
    ) -> ScenarioResult {
        let mut trace = Trace::new(sink);
        self.memoization_decide(shoe, player, dealer, discard, &mut trace, 0)
    }

    /// Expected result of standing with `player_score` while the dealer plays
    /// out `dealer`.
    pub fn dealer_playout(
        &mut self,
        shoe: &Shoe,
        player_score: Score,
        dealer: &CardCount,
        discard: &CardCount,
    ) -> Outcome {
        self.memoization_dealer_playout(
            shoe,
            player_score,
            dealer,
            discard,
            &mut Trace::disabled(),
            0,
        )
    }

    fn memoization_decide(
        &mut self,
        shoe: &Shoe,
        player: &CardCount,
        dealer: &CardCount,
        discard: &CardCount,
        trace: &mut Trace<'_>,
        depth: usize,
    ) -> ScenarioResult {
        let key = PlayerKey {
            player: player.clone(),
            dealer: dealer.clone(),
            shoe: shoe.clone(),
            discard: discard.clone(),
        };
        if !trace.enabled() {
            if let Some(result) = self.player_memo.get(&key) {
                return *result;
            }
        }

        let player_score = Score::of(player);
        trace.line(
            depth,
            format_args!("player {} ({}) vs dealer {}", player, player_score, dealer),
        );

        // Indexed in `PlayerAction` declaration order, which is the tie-break.
        let mut results: [Option<ScenarioResult>; 3] = [None; 3];

        if self.rules.may_stand(player) {
            let outcome = self.memoization_dealer_playout(
                shoe,
                player_score,
                dealer,
                discard,
                trace,
                depth + 1,
            );
            trace.line(depth, format_args!("stand: {}", outcome));
            results[0] = Some(ScenarioResult::new(PlayerAction::Stand, outcome));
        }

        if self.rules.may_hit(player) {
            if let Some(outcome) = self.hit_player(shoe, player, dealer, discard, trace, depth + 1)
            {
                trace.line(depth, format_args!("hit: {}", outcome));
                results[1] = Some(ScenarioResult::new(PlayerAction::Hit, outcome));
            }
        }

        if self.rules.may_double(player, false) {
            if let Some(mut outcome) =
                self.hit_player_once(shoe, player, dealer, discard, trace, depth + 1)
            {
                outcome.double_down();
                trace.line(depth, format_args!("double: {}", outcome));
                results[2] = Some(ScenarioResult::new(PlayerAction::Double, outcome));
            }
        }

        let best = best_of(&results);
        trace.line(depth, format_args!("player {} should {}", player, best));

        if !trace.enabled() {
            self.player_memo.insert(key, best);
        }
        best
    }

    /// Draw one card and keep deciding. `None` when no card can be drawn.
    fn hit_player(
        &mut self,
        shoe: &Shoe,
        player: &CardCount,
        dealer: &CardCount,
        discard: &CardCount,
        trace: &mut Trace<'_>,
        depth: usize,
    ) -> Option<Outcome> {
        let (shoe, discard) = drawing_view(shoe, discard, trace, depth);
        if shoe.total() == 0 {
            return None;
        }

        let mut acc = Accumulator::default();
        for (rank, p) in shoe.draw_weights() {
            let mut next_shoe = Shoe::clone(&shoe);
            next_shoe.remove(rank);
            let mut next_player = player.clone();
            next_player.add_card(rank);

            trace.line(depth, format_args!("player draws {} (p={:.6})", rank, p));
            let outcome = if Score::of(&next_player).bust() {
                trace.line(depth + 1, format_args!("player {} busts", next_player));
                Outcome::new(1.0, 0.0)
            } else {
                let result = self.memoization_decide(
                    &next_shoe,
                    &next_player,
                    dealer,
                    &discard,
                    trace,
                    depth + 1,
                );
                result.outcome
            };
            acc += outcome.scaled(p);
        }
        debug_assert!((acc.mass() - 1.0).abs() < 1e-9);

        Some(acc.into_outcome())
    }

    /// Draw exactly one card, then stand. The caller doubles the amounts.
    fn hit_player_once(
        &mut self,
        shoe: &Shoe,
        player: &CardCount,
        dealer: &CardCount,
        discard: &CardCount,
        trace: &mut Trace<'_>,
        depth: usize,
    ) -> Option<Outcome> {
        let (shoe, discard) = drawing_view(shoe, discard, trace, depth);
        if shoe.total() == 0 {
            return None;
        }

        let mut acc = Accumulator::default();
        for (rank, p) in shoe.draw_weights() {
            let mut next_shoe = Shoe::clone(&shoe);
            next_shoe.remove(rank);
            let mut next_player = player.clone();
            next_player.add_card(rank);

            trace.line(depth, format_args!("player doubles, draws {} (p={:.6})", rank, p));
            let next_score = Score::of(&next_player);
            let outcome = if next_score.bust() {
                trace.line(depth + 1, format_args!("player {} busts", next_player));
                Outcome::new(1.0, 0.0)
            } else {
                self.memoization_dealer_playout(
                    &next_shoe,
                    next_score,
                    dealer,
                    &discard,
                    trace,
                    depth + 1,
                )
            };
            acc += outcome.scaled(p);
        }
        debug_assert!((acc.mass() - 1.0).abs() < 1e-9);

        Some(acc.into_outcome())
    }

    fn memoization_dealer_playout(
        &mut self,
        shoe: &Shoe,
        player_score: Score,
        dealer: &CardCount,
        discard: &CardCount,
        trace: &mut Trace<'_>,
        depth: usize,
    ) -> Outcome {
        let key = DealerKey {
            player_score,
            dealer: dealer.clone(),
            shoe: shoe.clone(),
            discard: discard.clone(),
        };
        if !trace.enabled() {
            if let Some(outcome) = self.dealer_memo.get(&key) {
                return *outcome;
            }
        }

        let dealer_score = Score::of(dealer);
        if self.rules.dealer_action(dealer_score) == DealerAction::Stand {
            return self.settle(player_score, dealer, dealer_score, trace, depth);
        }

        let (shoe, discard) = drawing_view(shoe, discard, trace, depth);
        if shoe.total() == 0 {
            // Nothing left anywhere; the dealer has to stand on what is there.
            return self.settle(player_score, dealer, dealer_score, trace, depth);
        }

        let mut acc = Accumulator::default();
        for (rank, p) in shoe.draw_weights() {
            let mut next_shoe = Shoe::clone(&shoe);
            next_shoe.remove(rank);
            let mut next_dealer = dealer.clone();
            next_dealer.add_card(rank);

            trace.line(
                depth,
                format_args!("dealer {} draws {} (p={:.6})", dealer, rank, p),
            );
            let outcome = self.memoization_dealer_playout(
                &next_shoe,
                player_score,
                &next_dealer,
                &discard,
                trace,
                depth + 1,
            );
            acc += outcome.scaled(p);
        }
        debug_assert!((acc.mass() - 1.0).abs() < 1e-9);

        let outcome = acc.into_outcome();
        if !trace.enabled() {
            self.dealer_memo.insert(key, outcome);
        }
        outcome
    }

    fn settle(
        &self,
        player_score: Score,
        dealer: &CardCount,
        dealer_score: Score,
        trace: &mut Trace<'_>,
        depth: usize,
    ) -> Outcome {
        let result = self.rules.result_of(player_score, dealer_score);
        trace.line(
            depth,
            format_args!(
                "dealer {} ({}) stands against {}: {}",
                dealer, dealer_score, player_score, result
            ),
        );
        Outcome::new(1.0, self.rules.payoff(result))
    }
}

/// The shoe and discard a draw sees: reshuffled locally when the cut card is
/// out, otherwise the caller's own, borrowed.
fn drawing_view<'s>(
    shoe: &'s Shoe,
    discard: &'s CardCount,
    trace: &mut Trace<'_>,
    depth: usize,
) -> (Cow<'s, Shoe>, Cow<'s, CardCount>) {
    match shoe.ready_to_draw(discard) {
        Some((shoe, emptied)) => {
            trace.line(
                depth,
                format_args!("cut card reached, {} discards shuffled back", discard.get_total()),
            );
            (Cow::Owned(shoe), Cow::Owned(emptied))
        }
        None => (Cow::Borrowed(shoe), Cow::Borrowed(discard)),
    }
}

/// Highest expected net gain. Only a strictly better result displaces an
/// earlier one, so ties go to Stand, then Hit, then Double.
fn best_of(results: &[Option<ScenarioResult>]) -> ScenarioResult {
    let mut best: Option<ScenarioResult> = None;
    for result in results.iter().flatten() {
        match best {
            Some(current) if result.outcome.net() <= current.outcome.net() => {}
            _ => best = Some(*result),
        }
    }
    match best {
        Some(best) => best,
        None => panic!("no legal action at a decision point; standing is always allowed"),
    }
}
