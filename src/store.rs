//! SQLite-backed solve storage.
//!
//! One table per puzzle type, each with a UNIQUE constraint over
//! (user, group, puzzle key). Writes follow fetch-or-create-or-correct
//! semantics: a repeated solve is a no-op, a different time for an already
//! stored solve overwrites it in place.

use crate::puzzle::{key_filter, MiniKey, PipsKey, PuzzleKey};
use crate::types::{GroupId, UserId};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored timestamp {0} is out of range")]
    Timestamp(i64),
}

/// One player's stored solve of one puzzle instance in one group
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRecord<K: PuzzleKey> {
    pub id: i64,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub key: K,
    pub seconds: u32,
    pub recorded_at: DateTime<Utc>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Corrected { previous_seconds: u32 },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<K: PuzzleKey> {
    pub record: SolveRecord<K>,
    pub outcome: UpsertOutcome,
}

impl<K: PuzzleKey> Upserted<K> {
    pub fn is_new(&self) -> bool {
        self.outcome == UpsertOutcome::Created
    }
}

/// Handle to the solve database. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct SolveStore {
    pool: SqlitePool,
}

impl SolveStore {
    /// Open (creating if needed) the database at `url` and apply the schema
    pub async fn open(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("Opened solve store at {}", url);
        Ok(store)
    }

    /// Private in-memory database, mostly for tests
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is a separate database, so pin exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        for schema in [MiniKey::SCHEMA, PipsKey::SCHEMA] {
            sqlx::raw_sql(schema).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Record a solve, stamping new records with the current time
    pub async fn upsert<K: PuzzleKey>(
        &self,
        user_id: &str,
        group_id: &str,
        key: &K,
        seconds: u32,
        credential: Option<&str>,
    ) -> StoreResult<Upserted<K>> {
        self.upsert_at(user_id, group_id, key, seconds, credential, Utc::now())
            .await
    }

    /// Record a solve; `now` becomes `recorded_at` if the record is created.
    ///
    /// Existing records keep their `recorded_at`. The read and the write are
    /// separate statements, so two racing corrections end last-write-wins.
    pub async fn upsert_at<K: PuzzleKey>(
        &self,
        user_id: &str,
        group_id: &str,
        key: &K,
        seconds: u32,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Upserted<K>> {
        let credential = credential
            .filter(|_| K::CARRIES_CREDENTIAL)
            .map(str::to_string);

        let existing = match self.find(user_id, group_id, key).await? {
            Some(record) => record,
            None => {
                if let Some(id) = self
                    .insert(user_id, group_id, key, seconds, credential.as_deref(), now)
                    .await?
                {
                    let record = SolveRecord {
                        id,
                        user_id: user_id.to_string(),
                        group_id: group_id.to_string(),
                        key: key.clone(),
                        seconds,
                        recorded_at: from_millis(now.timestamp_millis())?,
                        credential,
                    };
                    return Ok(Upserted {
                        record,
                        outcome: UpsertOutcome::Created,
                    });
                }

                // Someone else inserted the same key between our read and write
                self.find(user_id, group_id, key)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?
            }
        };

        if existing.seconds == seconds {
            return Ok(Upserted {
                record: existing,
                outcome: UpsertOutcome::Unchanged,
            });
        }

        let sql = if K::CARRIES_CREDENTIAL {
            format!(
                "UPDATE {} SET seconds = ?, credential = ? WHERE id = ?",
                K::TABLE
            )
        } else {
            format!("UPDATE {} SET seconds = ? WHERE id = ?", K::TABLE)
        };

        let mut query = sqlx::query(&sql).bind(seconds);
        if K::CARRIES_CREDENTIAL {
            query = query.bind(credential.clone());
        }
        query.bind(existing.id).execute(&self.pool).await?;

        let previous_seconds = existing.seconds;
        Ok(Upserted {
            record: SolveRecord {
                seconds,
                credential,
                ..existing
            },
            outcome: UpsertOutcome::Corrected { previous_seconds },
        })
    }

    /// All solves for one leaderboard, fastest first, earliest first among ties
    pub async fn scope<K: PuzzleKey>(
        &self,
        group_id: &str,
        key: &K,
    ) -> StoreResult<Vec<SolveRecord<K>>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE group_id = ? AND {} ORDER BY seconds ASC, recorded_at ASC, id ASC",
            select_columns::<K>(),
            K::TABLE,
            key_filter::<K>()
        );

        let rows = key
            .bind(sqlx::query(&sql).bind(group_id))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row::<K>).collect()
    }

    /// Every solve stored for a group, in insertion order
    pub async fn group<K: PuzzleKey>(&self, group_id: &str) -> StoreResult<Vec<SolveRecord<K>>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE group_id = ? ORDER BY id ASC",
            select_columns::<K>(),
            K::TABLE
        );

        let rows = sqlx::query(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row::<K>).collect()
    }

    /// Number of stored solves for a puzzle type across all groups
    pub async fn count<K: PuzzleKey>(&self) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", K::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn find<K: PuzzleKey>(
        &self,
        user_id: &str,
        group_id: &str,
        key: &K,
    ) -> StoreResult<Option<SolveRecord<K>>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ? AND group_id = ? AND {}",
            select_columns::<K>(),
            K::TABLE,
            key_filter::<K>()
        );

        let row = key
            .bind(sqlx::query(&sql).bind(user_id).bind(group_id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row::<K>).transpose()
    }

    /// Returns the new row id, or `None` if the key already exists
    async fn insert<K: PuzzleKey>(
        &self,
        user_id: &str,
        group_id: &str,
        key: &K,
        seconds: u32,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<i64>> {
        let mut columns = vec!["user_id", "group_id", "recorded_at", "seconds"];
        if K::CARRIES_CREDENTIAL {
            columns.push("credential");
        }
        columns.extend_from_slice(K::KEY_COLUMNS);
        let placeholders = vec!["?"; columns.len()].join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            K::TABLE,
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(user_id)
            .bind(group_id)
            .bind(now.timestamp_millis())
            .bind(seconds);
        if K::CARRIES_CREDENTIAL {
            query = query.bind(credential);
        }

        let result = key.bind(query).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }
}

fn select_columns<K: PuzzleKey>() -> String {
    let mut columns = vec!["id", "user_id", "group_id", "recorded_at", "seconds"];
    if K::CARRIES_CREDENTIAL {
        columns.push("credential");
    }
    columns.extend_from_slice(K::KEY_COLUMNS);
    columns.join(", ")
}

fn record_from_row<K: PuzzleKey>(row: &SqliteRow) -> StoreResult<SolveRecord<K>> {
    let credential = if K::CARRIES_CREDENTIAL {
        row.try_get("credential")?
    } else {
        None
    };

    Ok(SolveRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        group_id: row.try_get("group_id")?,
        key: K::from_row(row)?,
        seconds: row.try_get("seconds")?,
        recorded_at: from_millis(row.try_get("recorded_at")?)?,
        credential,
    })
}

fn from_millis(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(StoreError::Timestamp(millis))
}
