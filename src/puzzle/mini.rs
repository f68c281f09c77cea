use super::{PuzzleKey, SqliteQuery};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;

/// The daily mini crossword, identified by its calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiniKey {
    pub date: NaiveDate,
}

impl MiniKey {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl fmt::Display for MiniKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

impl PuzzleKey for MiniKey {
    const TABLE: &'static str = "mini_solves";
    const KEY_COLUMNS: &'static [&'static str] = &["date"];
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS mini_solves (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT    NOT NULL,
            group_id    TEXT    NOT NULL,
            recorded_at INTEGER NOT NULL,
            date        TEXT    NOT NULL,
            seconds     INTEGER NOT NULL CHECK (seconds >= 0),
            credential  TEXT,
            UNIQUE (user_id, group_id, date)
        );
        CREATE INDEX IF NOT EXISTS idx_mini_solves_scope
            ON mini_solves (group_id, date, seconds);
    "#;
    const CARRIES_CREDENTIAL: bool = true;

    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.date)
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            date: row.try_get("date")?,
        })
    }

    fn export_fields(&self) -> Vec<String> {
        vec![self.to_string()]
    }

    fn title(&self) -> String {
        format!("{self} mini")
    }
}
