use std::path::PathBuf;

use anyhow::{bail, Context};
use blackjack_ev::{
    evaluate_initial_hands_parallel, strategy::StrategyChart, CardCount, Rules, Shoe, Solver,
    TracingSink,
};
use blackjack_ev_drivers::{init_logging, load_config, DEFAULT_CONFIG_FILE_NAME};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file. Defaults to ~/.blackjack_ev.yml, or the
    /// standard single-deck game when that does not exist.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    report: Report,
}

#[derive(Debug, Subcommand)]
enum Report {
    /// Expected return of a round, summed over every initial hand
    Aggregate {
        /// Worker threads, overrides the config. 0 means one per core
        #[arg(short, long)]
        threads: Option<usize>,
        /// Print every initial hand as YAML instead of a summary
        #[arg(long)]
        yaml: bool,
    },
    /// Best first action for every starting hand against every up card
    Chart,
    /// Best action for a single situation
    Scenario {
        /// Player cards, e.g. T6
        player: String,
        /// Dealer cards, e.g. T
        dealer: String,
        /// Cards left in the shoe. Defaults to a fresh shoe minus the cards
        /// on the table
        #[arg(long)]
        shoe: Option<String>,
        /// Cards in the discard pile
        #[arg(long, default_value_t = String::new())]
        discard: String,
        /// Print every branch the search considers
        #[arg(long)]
        trace: bool,
        /// Send every considered branch to the log instead
        #[arg(long, conflicts_with = "trace")]
        trace_log: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let config = load_config(args.config.as_deref()).with_context(|| {
        format!(
            "loading {}",
            args.config
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| format!("~/{}", DEFAULT_CONFIG_FILE_NAME))
        )
    })?;
    init_logging(&config.logging);
    let rules: Rules = config.rule.clone().try_into()?;
    tracing::info!(?rules, "rules loaded");

    match args.report {
        Report::Aggregate { threads, yaml } => {
            let threads = threads.unwrap_or(config.report.number_of_threads);
            let report = evaluate_initial_hands_parallel(&rules, threads)?;
            if yaml {
                print!("{}", serde_yaml::to_string(&report)?);
            } else {
                println!("initial hands: {}", report.hands.len());
                println!("probability mass: {:.12}", report.mass);
                println!("{}", report.total);
                println!("expected return: {:+.4}%", report.expected_return() * 100.0);
            }
        }
        Report::Chart => {
            let chart = StrategyChart::compute(&rules)?;
            print!("{}", chart);
        }
        Report::Scenario {
            player,
            dealer,
            shoe,
            discard,
            trace,
            trace_log,
        } => {
            let player: CardCount = player.parse()?;
            let dealer: CardCount = dealer.parse()?;
            let discard: CardCount = discard.parse()?;
            let shoe = match shoe {
                Some(cards) => Shoe::from_cards(cards.parse()?, rules.cut_card_offset)?,
                None => fresh_shoe_without(&rules, &[&player, &dealer, &discard])?,
            };
            println!("shoe: {}", shoe);

            let mut solver = Solver::new(rules)?;
            let result = if trace {
                let mut lines: Vec<String> = Vec::new();
                let result = solver.decide_traced(&shoe, &player, &dealer, &discard, &mut lines);
                for line in lines {
                    println!("{}", line);
                }
                result
            } else if trace_log {
                solver.decide_traced(&shoe, &player, &dealer, &discard, &mut TracingSink)
            } else {
                solver.decide(&shoe, &player, &dealer, &discard)
            };
            println!("{}", result);
            println!("{}", result.outcome);
        }
    }

    Ok(())
}

fn fresh_shoe_without(rules: &Rules, taken: &[&CardCount]) -> anyhow::Result<Shoe> {
    let mut shoe = Shoe::from_rules(rules)?;
    for cards in taken {
        for (rank, count) in cards.iter() {
            if shoe.count(rank) < count {
                bail!("a {}-deck shoe does not hold that many {}", rules.number_of_decks, rank);
            }
            for _ in 0..count {
                shoe.remove(rank);
            }
        }
    }
    Ok(shoe)
}
