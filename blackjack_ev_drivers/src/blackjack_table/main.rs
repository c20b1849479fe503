mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use blackjack_ev::{simulation::Table, Rules};
use blackjack_ev_drivers::{init_logging, load_config};
use clap::Parser;

use self::session::Session;

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file. Defaults to ~/.blackjack_ev.yml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the card order, for reproducible sessions
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let config = load_config(args.config.as_deref())?;
    init_logging(&config.logging);
    let rules: Rules = config.rule.try_into()?;

    let table = Table::new(rules, args.seed)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "type 'help' for commands")?;
    let mut session = Session::new(table, stdout);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !session.handle_line(&line?)? {
            break;
        }
    }

    Ok(())
}
