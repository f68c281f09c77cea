//! Solve extraction from free-text announcements.
//!
//! Each recognized shape is a (pattern, parser) pair. Patterns are tried in
//! priority order and are anchored at the start of the message; the first
//! pattern that matches decides the outcome, even if its parser then rejects
//! the captured values.

use crate::puzzle::{Candidate, MiniKey, PipsKey};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// A solve candidate for one of the supported puzzles
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Mini(Candidate<MiniKey>),
    Pips(Candidate<PipsKey>),
}

type Parser = fn(&Captures) -> Option<Extracted>;

// https://www.nytimes.com/badges/games/mini.html?d=2024-04-20&t=78&c=514e32e822ac4633fccf33efc3da2698
const BADGE_PATTERN: &str = concat!(
    r"^https://www\.nytimes\.com/badges/games/mini\.html",
    r"\?d=(\d{4}-\d{2}-\d{2})",
    r"&t=(\d+)",
    r"&c=([a-fA-F0-9]+)",
);

// I solved the 4/21/2024 New York Times Mini Crossword in 0:52! https://www.nytimes.com/crosswords/game/mini
const NARRATIVE_PATTERN: &str = concat!(
    r"^I solved the (\d{1,2}/\d{1,2}/\d{4}) New York Times Mini Crossword in ((?:\d+:)?\d{1,2}:\d{2})!",
    r" https://www\.nytimes\.com/crosswords/game/mini",
);

// Pips #38 Hard 🔴
// 3:46
const PIPS_PATTERN: &str = r"^Pips #(\d+) (\w+) .+\n((?:\d+:)?\d{1,2}:\d{2})";

static PATTERNS: LazyLock<Vec<(Regex, Parser)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(BADGE_PATTERN).expect("badge pattern compiles"),
            parse_badge as Parser,
        ),
        (
            Regex::new(NARRATIVE_PATTERN).expect("narrative pattern compiles"),
            parse_narrative as Parser,
        ),
        (
            Regex::new(PIPS_PATTERN).expect("pips pattern compiles"),
            parse_pips as Parser,
        ),
    ]
});

/// Extract a solve from a message body, or `None` if it isn't an announcement
pub fn extract(text: &str) -> Option<Extracted> {
    PATTERNS
        .iter()
        .find_map(|(pattern, parse)| pattern.captures(text).map(|caps| parse(&caps)))
        .flatten()
}

/// Convert `m:ss` or `h:mm:ss` into seconds.
///
/// Components are weighted by powers of 60 from the right. A bare number is
/// not a duration.
pub fn parse_duration(text: &str) -> Option<u32> {
    let parts: Vec<&str> = text.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    parts
        .iter()
        .rev()
        .enumerate()
        .try_fold(0u32, |total, (i, part)| {
            let value: u32 = part.parse().ok()?;
            let weight = 60u32.checked_pow(i as u32)?;
            total.checked_add(value.checked_mul(weight)?)
        })
}

fn parse_badge(caps: &Captures) -> Option<Extracted> {
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let seconds = caps[2].parse().ok()?;
    Some(Extracted::Mini(Candidate {
        key: MiniKey::new(date),
        seconds,
        credential: Some(caps[3].to_string()),
    }))
}

fn parse_narrative(caps: &Captures) -> Option<Extracted> {
    let date = NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y").ok()?;
    let seconds = parse_duration(&caps[2])?;
    Some(Extracted::Mini(Candidate {
        key: MiniKey::new(date),
        seconds,
        credential: None,
    }))
}

fn parse_pips(caps: &Captures) -> Option<Extracted> {
    let version = caps[1].parse().ok()?;
    let seconds = parse_duration(&caps[3])?;
    Some(Extracted::Pips(Candidate {
        key: PipsKey::new(version, &caps[2]),
        seconds,
        credential: None,
    }))
}
