use std::fmt;

use serde::Serialize;

use crate::{CardCount, Error, PlayerAction, Rank, Rules, ScenarioResult, Shoe, Solver};

/// Dealer up cards in chart column order.
pub const UP_CARDS: [Rank; 10] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Ace,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub label: String,
    pub actions: [PlayerAction; 10],
}

/// Best first action for each starting hand against each up card, solved
/// exactly off a fresh shoe with the hand and up card removed.
///
/// Pairs show their best non-split action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyChart {
    pub hard: Vec<ChartRow>,
    pub soft: Vec<ChartRow>,
    pub pairs: Vec<ChartRow>,
}

impl StrategyChart {
    pub fn compute(rules: &Rules) -> Result<StrategyChart, Error> {
        let mut solver = Solver::new(*rules)?;
        let fresh = Shoe::from_rules(rules)?;

        // Hard totals as two distinct cards: 2 + x up to 12, then T + x.
        let hard = (5..=17u8)
            .map(|total| {
                let cards = if total <= 12 {
                    [Rank::Two, rank_of(total - 2)]
                } else {
                    [Rank::Ten, rank_of(total - 10)]
                };
                row(&mut solver, &fresh, total.to_string(), cards)
            })
            .collect();
        let soft = (2..=9u8)
            .map(|other| {
                let other = rank_of(other);
                row(&mut solver, &fresh, format!("A{}", other), [Rank::Ace, other])
            })
            .collect();
        let pairs = UP_CARDS
            .iter()
            .map(|&rank| row(&mut solver, &fresh, format!("{}{}", rank, rank), [rank, rank]))
            .collect();

        let (player_states, dealer_states) = solver.cache_sizes();
        tracing::debug!(player_states, dealer_states, "strategy chart computed");
        Ok(StrategyChart { hard, soft, pairs })
    }

    /// Decides a single chart cell.
    pub fn cell(solver: &mut Solver, fresh: &Shoe, hand: [Rank; 2], up: Rank) -> ScenarioResult {
        let mut shoe = fresh.clone();
        for rank in [hand[0], hand[1], up] {
            shoe.remove(rank);
        }
        solver.decide(
            &shoe,
            &CardCount::from_ranks(&hand),
            &CardCount::from_ranks(&[up]),
            &CardCount::empty(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = &ChartRow> {
        self.hard.iter().chain(&self.soft).chain(&self.pairs)
    }
}

fn rank_of(value: u8) -> Rank {
    match value {
        1 => Rank::Ace,
        2 => Rank::Two,
        3 => Rank::Three,
        4 => Rank::Four,
        5 => Rank::Five,
        6 => Rank::Six,
        7 => Rank::Seven,
        8 => Rank::Eight,
        9 => Rank::Nine,
        10 => Rank::Ten,
        _ => panic!("no rank is worth {}", value),
    }
}

fn row(solver: &mut Solver, fresh: &Shoe, label: String, hand: [Rank; 2]) -> ChartRow {
    let mut actions = [PlayerAction::Stand; 10];
    for (action, &up) in actions.iter_mut().zip(UP_CARDS.iter()) {
        *action = StrategyChart::cell(solver, fresh, hand, up).action;
    }
    ChartRow { label, actions }
}

impl fmt::Display for StrategyChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: String = UP_CARDS.iter().map(|rank| format!(" {}", rank)).collect();
        for (title, rows) in [("Hard", &self.hard), ("Soft", &self.soft), ("Pairs", &self.pairs)] {
            writeln!(f, "{:<6}{}", title, header)?;
            for row in rows {
                write!(f, "{:<6}", row.label)?;
                for action in row.actions {
                    write!(f, " {}", action.to_char())?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_for_obvious_hands() {
        let rules = Rules::default();
        let mut solver = Solver::new(rules).unwrap();
        let fresh = Shoe::from_rules(&rules).unwrap();

        let tens = StrategyChart::cell(&mut solver, &fresh, [Rank::Ten, Rank::Ten], Rank::Six);
        assert_eq!(tens.action, PlayerAction::Stand);

        let seventeen =
            StrategyChart::cell(&mut solver, &fresh, [Rank::Ten, Rank::Seven], Rank::Ten);
        assert_eq!(seventeen.action, PlayerAction::Stand);
    }

    #[test]
    fn rank_values() {
        assert_eq!(rank_of(1), Rank::Ace);
        assert_eq!(rank_of(10), Rank::Ten);
        assert_eq!(rank_of(7).value(), 7);
    }

    #[test]
    fn renders_letters() {
        let chart = StrategyChart {
            hard: vec![ChartRow {
                label: "12".to_string(),
                actions: [PlayerAction::Hit; 10],
            }],
            soft: vec![],
            pairs: vec![ChartRow {
                label: "TT".to_string(),
                actions: [PlayerAction::Stand; 10],
            }],
        };
        let text = chart.to_string();
        assert!(text.starts_with("Hard   2 3 4 5 6 7 8 9 T A\n"));
        assert!(text.contains("12     H H H H H H H H H H\n"));
        assert!(text.contains("TT     S S S S S S S S S S\n"));
        assert_eq!(chart.rows().count(), 2);
    }

    #[test]
    #[ignore]
    fn print_strategy_chart() {
        let chart = StrategyChart::compute(&Rules::default()).unwrap();
        print!("{}", chart);

        let hard_eleven = &chart.hard[6];
        assert_eq!(hard_eleven.label, "11");
        assert_eq!(hard_eleven.actions[4], PlayerAction::Double);
        let hard_seventeen = chart.hard.last().unwrap();
        assert!(hard_seventeen.actions.iter().all(|&a| a == PlayerAction::Stand));
    }
}
