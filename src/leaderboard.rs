use crate::identity::{IdentityError, IdentityResolver};
use crate::puzzle::PuzzleKey;
use crate::store::{SolveStore, StoreError};
use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// A user on the leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub display_name: String,
    pub seconds: u32,
}

/// Ranked solves of one puzzle instance within one group
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard<K: PuzzleKey> {
    pub group_id: GroupId,
    pub key: K,
    pub entries: Vec<LeaderboardEntry>,
}

/// Construct the leaderboard for a group and puzzle.
///
/// Every player on the board is resolved in one batch before ranking; if any
/// of them cannot be resolved the whole build fails.
pub async fn build<K: PuzzleKey>(
    store: &SolveStore,
    identities: &dyn IdentityResolver,
    group_id: &str,
    key: &K,
) -> Result<Leaderboard<K>, BuildError> {
    let solves = store.scope(group_id, key).await?;

    let mut leaderboard = Leaderboard {
        group_id: group_id.to_string(),
        key: key.clone(),
        entries: Vec::with_capacity(solves.len()),
    };
    if solves.is_empty() {
        return Ok(leaderboard);
    }

    let mut user_ids: Vec<UserId> = solves.iter().map(|s| s.user_id.clone()).collect();
    user_ids.sort();
    user_ids.dedup();

    let names = identities
        .resolve(&leaderboard.group_id, &user_ids)
        .await?;

    let seconds: Vec<u32> = solves.iter().map(|s| s.seconds).collect();
    for (solve, rank) in solves.into_iter().zip(dense_ranks(&seconds)) {
        let display_name = names
            .get(&solve.user_id)
            .cloned()
            .ok_or_else(|| IdentityError::Unresolved(vec![solve.user_id.clone()]))?;
        leaderboard.entries.push(LeaderboardEntry {
            rank,
            user_id: solve.user_id,
            display_name,
            seconds: solve.seconds,
        });
    }
    Ok(leaderboard)
}

/// Dense ranks for times sorted ascending: ties share a rank and the next
/// slower time takes the following rank, so [30, 30, 45] ranks [1, 1, 2].
pub fn dense_ranks(sorted_seconds: &[u32]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted_seconds.len());
    let mut position = 1;
    let mut last_seconds = None;

    for &seconds in sorted_seconds {
        if matches!(last_seconds, Some(last) if seconds > last) {
            position += 1;
        }
        ranks.push(position);
        last_seconds = Some(seconds);
    }

    ranks
}

/// Render seconds as `m:ss`. Minutes are unbounded: 3723 is `62:03`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

impl<K: PuzzleKey> Leaderboard<K> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the leaderboard as message text
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return format!("No leaderboard for {}", self.key);
        }

        self.entries
            .iter()
            .map(|entry| {
                let line = format!(
                    "{}. {} ({})",
                    entry.rank,
                    entry.display_name,
                    format_time(entry.seconds)
                );
                if entry.rank == 1 {
                    format!("{} {}", line, CROWN)
                } else {
                    line
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Gold if `user_id` holds first place, shared or not
    pub fn highlight_color(&self, user_id: &str) -> Option<Color> {
        self.entries
            .iter()
            .any(|entry| entry.rank == 1 && entry.user_id == user_id)
            .then_some(Color::GOLD)
    }
}
