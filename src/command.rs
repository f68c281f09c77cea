//! Text commands addressed to the bot (`%nyt …`, `%pip …`).

use crate::puzzle::PipsKey;
use chrono::NaiveDate;

pub const MINI_PREFIX: &str = "%nyt ";
pub const PIPS_PREFIX: &str = "%pip ";

/// Which puzzle a command is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Puzzle {
    Mini,
    Pips,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `None` means today's puzzle
    MiniLeaderboard { date: Option<NaiveDate> },
    PipsLeaderboard { key: PipsKey },
    Dump(Puzzle),
    Help(Puzzle),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid puzzle number `{0}`")]
    InvalidVersion(String),

    #[error("Usage: `%pip l <number> <difficulty>`")]
    MissingPipsArguments,
}

/// Parse a command message.
///
/// Returns `None` for messages that aren't commands, including a bare prefix
/// with nothing after it.
pub fn parse(content: &str) -> Option<Result<Command, CommandError>> {
    let (puzzle, rest) = if let Some(rest) = content.strip_prefix(MINI_PREFIX) {
        (Puzzle::Mini, rest)
    } else if let Some(rest) = content.strip_prefix(PIPS_PREFIX) {
        (Puzzle::Pips, rest)
    } else {
        return None;
    };

    let parts: Vec<&str> = rest.split_whitespace().collect();
    let (name, args) = parts.split_first()?;

    let command = match (*name, puzzle) {
        ("l" | "leaderboard", Puzzle::Mini) => parse_mini_leaderboard(args),
        ("l" | "leaderboard", Puzzle::Pips) => parse_pips_leaderboard(args),
        ("d" | "dump", _) => Ok(Command::Dump(puzzle)),
        _ => Ok(Command::Help(puzzle)),
    };
    Some(command)
}

/// Usage text for a puzzle's commands
pub fn help(puzzle: Puzzle) -> &'static str {
    match puzzle {
        Puzzle::Mini => "Commands are `l/leaderboard [YYYY-MM-DD]` and `d/dump`",
        Puzzle::Pips => "Commands are `l/leaderboard <number> <difficulty>` and `d/dump`",
    }
}

fn parse_mini_leaderboard(args: &[&str]) -> Result<Command, CommandError> {
    let date = match args.first() {
        Some(arg) => Some(
            NaiveDate::parse_from_str(arg, "%Y-%m-%d")
                .map_err(|_| CommandError::InvalidDate(arg.to_string()))?,
        ),
        None => None,
    };
    Ok(Command::MiniLeaderboard { date })
}

fn parse_pips_leaderboard(args: &[&str]) -> Result<Command, CommandError> {
    let [version, difficulty, ..] = args else {
        return Err(CommandError::MissingPipsArguments);
    };

    let version = version
        .trim_start_matches('#')
        .parse()
        .map_err(|_| CommandError::InvalidVersion(version.to_string()))?;

    Ok(Command::PipsLeaderboard {
        key: PipsKey::new(version, difficulty),
    })
}
