use super::{PuzzleKey, SqliteQuery};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;

/// A numbered Pips puzzle at one difficulty tier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipsKey {
    pub version: u32,
    pub difficulty: String,
}

impl PipsKey {
    /// Difficulty is title-cased ("hard" and "HARD" both become "Hard")
    pub fn new(version: u32, difficulty: impl AsRef<str>) -> Self {
        Self {
            version,
            difficulty: title_case(difficulty.as_ref()),
        }
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl fmt::Display for PipsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.version, self.difficulty)
    }
}

impl PuzzleKey for PipsKey {
    const TABLE: &'static str = "pips_solves";
    const KEY_COLUMNS: &'static [&'static str] = &["version", "difficulty"];
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS pips_solves (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT    NOT NULL,
            group_id    TEXT    NOT NULL,
            recorded_at INTEGER NOT NULL,
            version     INTEGER NOT NULL,
            difficulty  TEXT    NOT NULL,
            seconds     INTEGER NOT NULL CHECK (seconds >= 0),
            UNIQUE (user_id, group_id, version, difficulty)
        );
        CREATE INDEX IF NOT EXISTS idx_pips_solves_scope
            ON pips_solves (group_id, version, difficulty, seconds);
    "#;
    const CARRIES_CREDENTIAL: bool = false;

    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.version).bind(self.difficulty.clone())
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            version: row.try_get("version")?,
            difficulty: row.try_get("difficulty")?,
        })
    }

    fn export_fields(&self) -> Vec<String> {
        vec![self.version.to_string(), self.difficulty.clone()]
    }

    fn title(&self) -> String {
        self.to_string()
    }
}
