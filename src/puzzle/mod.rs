//! Puzzle key types.
//!
//! Every supported puzzle shares one storage/ranking/export pipeline; the only
//! things that differ per puzzle are the fields identifying "which puzzle
//! instance" a solve belongs to and whether the announcement carries a
//! credential. [`PuzzleKey`] captures exactly those differences.

mod mini;
mod pips;

pub use mini::MiniKey;
pub use pips::PipsKey;

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::Sqlite;
use std::fmt;

/// A query under construction against the solve tables
pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Identifies a puzzle instance and describes how its solves are stored
pub trait PuzzleKey:
    Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + Unpin + 'static
{
    /// Table holding solves of this puzzle
    const TABLE: &'static str;

    /// Columns that, together with `user_id` and `group_id`, form the unique key.
    /// Also used as the key headers of the CSV export.
    const KEY_COLUMNS: &'static [&'static str];

    /// Idempotent schema for [`Self::TABLE`]
    const SCHEMA: &'static str;

    /// Whether announcements for this puzzle carry a proof credential
    const CARRIES_CREDENTIAL: bool;

    /// Bind the key values in [`Self::KEY_COLUMNS`] order
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Read the key columns back out of a row
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;

    /// Key values as CSV fields, in [`Self::KEY_COLUMNS`] order
    fn export_fields(&self) -> Vec<String>;

    /// Phrase used in solve card titles ("solved the <title> in 0:52")
    fn title(&self) -> String;
}

/// A solve extracted from a message, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<K: PuzzleKey> {
    pub key: K,
    pub seconds: u32,
    pub credential: Option<String>,
}

/// `WHERE` fragment matching the key columns, e.g. `version = ? AND difficulty = ?`
pub(crate) fn key_filter<K: PuzzleKey>() -> String {
    K::KEY_COLUMNS
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}
