use std::io::Write;
use std::str::FromStr;

use blackjack_ev::simulation::{GamePhase, RoundSummary, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Deal,
    Hit,
    Stand,
    Double,
    Advise,
    Explain,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.trim().to_ascii_lowercase().as_str() {
            "deal" | "n" => Command::Deal,
            "hit" | "h" => Command::Hit,
            "stand" | "s" => Command::Stand,
            "double" | "d" => Command::Double,
            "advise" | "a" => Command::Advise,
            "explain" | "e" => Command::Explain,
            "status" | "?" => Command::Status,
            "help" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(command)
    }
}

const HELP: &str = "\
commands:
  deal    (n)  deal a new round
  hit     (h)  take a card
  stand   (s)  stand, the dealer plays
  double  (d)  double the bet and take one card
  advise  (a)  best action for the current hand
  explain (e)  best action, with every branch considered
  status  (?)  hands, shoe and bankroll
  quit    (q)";

/// Drives a `Table` from text commands. Errors are written to the output and
/// the session carries on.
pub struct Session<W: Write> {
    table: Table,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(table: Table, out: W) -> Self {
        Self { table, out }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Runs one input line. Returns false once the session should end.
    pub fn handle_line(&mut self, line: &str) -> std::io::Result<bool> {
        if line.trim().is_empty() {
            return Ok(true);
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(self.out, "{}", message)?;
                return Ok(true);
            }
        };
        if command == Command::Quit {
            writeln!(
                self.out,
                "bankroll {:+} after {} rounds",
                self.table.bankroll(),
                self.table.rounds_played()
            )?;
            return Ok(false);
        }
        self.execute(command)?;
        Ok(true)
    }

    fn execute(&mut self, command: Command) -> std::io::Result<()> {
        let result = match command {
            Command::Deal => self.table.deal(),
            Command::Hit => self.table.hit(),
            Command::Stand => self.table.stand().map(Some),
            Command::Double => self.table.double().map(Some),
            Command::Advise => match self.table.advise() {
                Ok(advice) => {
                    writeln!(self.out, "advice: {}", advice)?;
                    writeln!(self.out, "  {}", advice.outcome)?;
                    return Ok(());
                }
                Err(e) => Err(e),
            },
            Command::Explain => {
                let mut lines: Vec<String> = Vec::new();
                match self.table.explain(&mut lines) {
                    Ok(advice) => {
                        for line in lines {
                            writeln!(self.out, "{}", line)?;
                        }
                        writeln!(self.out, "advice: {}", advice)?;
                        return Ok(());
                    }
                    Err(e) => Err(e),
                }
            }
            Command::Status => {
                self.print_status()?;
                return Ok(());
            }
            Command::Help | Command::Quit => {
                writeln!(self.out, "{}", HELP)?;
                return Ok(());
            }
        };

        match result {
            Ok(Some(summary)) => self.print_summary(&summary),
            Ok(None) => self.print_hands(),
            Err(e) => writeln!(self.out, "error: {}", e),
        }
    }

    fn print_hands(&mut self) -> std::io::Result<()> {
        writeln!(
            self.out,
            "player {}  dealer {}",
            self.table.player_hand(),
            self.table.dealer_hand()
        )
    }

    fn print_summary(&mut self, summary: &RoundSummary) -> std::io::Result<()> {
        writeln!(self.out, "{}", summary)?;
        writeln!(self.out, "bankroll {:+}", self.table.bankroll())
    }

    fn print_status(&mut self) -> std::io::Result<()> {
        if self.table.phase() == GamePhase::PlayerTurn {
            self.print_hands()?;
        }
        writeln!(self.out, "shoe {}", self.table.shoe())?;
        writeln!(self.out, "discard {}", self.table.discard())?;
        writeln!(
            self.out,
            "{}, bankroll {:+} after {} rounds",
            self.table.phase(),
            self.table.bankroll(),
            self.table.rounds_played()
        )
    }
}
