//! Message handling: one inbound message in, a list of actions out.

use crate::command::{self, Command, Puzzle};
use crate::export::{self, ExportError, EXPORT_FILENAME};
use crate::extract::{extract, Extracted};
use crate::identity::{IdentityError, IdentityResolver};
use crate::leaderboard::{self, format_time, BuildError, Leaderboard};
use crate::proof::{self, ProofError, ProofImageSource, ProofParams};
use crate::protocol::{Action, InboundMessage};
use crate::puzzle::{Candidate, MiniKey, PipsKey, PuzzleKey};
use crate::store::{SolveStore, StoreError, UpsertOutcome};
use crate::types::REJECTED_REACTION;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub type BotResult<T> = Result<T, BotError>;

/// Failures that abort handling of a message
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error("Export failed: {0}")]
    Export(csv::Error),
}

impl From<BuildError> for BotError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Store(e) => BotError::Store(e),
            BuildError::Identity(e) => BotError::Identity(e),
        }
    }
}

impl From<ExportError> for BotError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Store(e) => BotError::Store(e),
            ExportError::Identity(e) => BotError::Identity(e),
            ExportError::Csv(e) => BotError::Export(e),
        }
    }
}

pub struct Bot {
    store: SolveStore,
    identities: Arc<dyn IdentityResolver>,
    proofs: Arc<dyn ProofImageSource>,
    timezone: Tz,
}

impl Bot {
    pub fn new(
        store: SolveStore,
        identities: Arc<dyn IdentityResolver>,
        proofs: Arc<dyn ProofImageSource>,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            identities,
            proofs,
            timezone,
        }
    }

    pub fn store(&self) -> &SolveStore {
        &self.store
    }

    /// Today's date where the daily puzzle is published
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Handle one inbound message and return what the bridge should do
    pub async fn handle(&self, message: &InboundMessage) -> BotResult<Vec<Action>> {
        if message.author_is_bot {
            tracing::debug!("Ignoring bot message {}", message.message_id);
            return Ok(Vec::new());
        }

        if let Some(extracted) = extract(&message.content) {
            return match extracted {
                Extracted::Mini(candidate) => self.on_mini_solve(message, candidate).await,
                Extracted::Pips(candidate) => self.on_solve(message, candidate, None).await,
            };
        }

        match command::parse(&message.content) {
            Some(Ok(command)) => self.on_command(message, command).await,
            Some(Err(e)) => {
                tracing::debug!("Rejected command {:?}: {}", message.content, e);
                Ok(vec![Action::Reply {
                    text: e.to_string(),
                }])
            }
            None => Ok(Vec::new()),
        }
    }

    /// Check the proof image of badge-link solves before recording them
    async fn on_mini_solve(
        &self,
        message: &InboundMessage,
        candidate: Candidate<MiniKey>,
    ) -> BotResult<Vec<Action>> {
        let Some(credential) = candidate.credential.clone() else {
            return self.on_solve(message, candidate, None).await;
        };

        let params = ProofParams {
            credential,
            date: candidate.key.date,
            seconds: candidate.seconds,
        };

        if !proof::verify(self.proofs.as_ref(), &params).await? {
            tracing::warn!(
                "Rejected {} solve from {} in {}: proof image is blank",
                candidate.key,
                message.author_id,
                message.group_id
            );
            return Ok(vec![Action::React {
                emoji: REJECTED_REACTION.to_string(),
            }]);
        }

        let thumbnail_url = self.proofs.image_url(&params);
        self.on_solve(message, candidate, Some(thumbnail_url)).await
    }

    /// Save the solve and post the updated leaderboard in place of the announcement
    async fn on_solve<K: PuzzleKey>(
        &self,
        message: &InboundMessage,
        candidate: Candidate<K>,
        thumbnail_url: Option<String>,
    ) -> BotResult<Vec<Action>> {
        let upserted = self
            .store
            .upsert(
                &message.author_id,
                &message.group_id,
                &candidate.key,
                candidate.seconds,
                candidate.credential.as_deref(),
            )
            .await?;

        match upserted.outcome {
            UpsertOutcome::Created => tracing::info!(
                "{} solved {} in {}s ({})",
                message.author_id,
                candidate.key,
                candidate.seconds,
                message.group_id
            ),
            UpsertOutcome::Corrected { previous_seconds } => tracing::info!(
                "{} corrected {} from {}s to {}s ({})",
                message.author_id,
                candidate.key,
                previous_seconds,
                candidate.seconds,
                message.group_id
            ),
            UpsertOutcome::Unchanged => tracing::debug!(
                "{} re-posted {} ({})",
                message.author_id,
                candidate.key,
                message.group_id
            ),
        }

        let leaderboard = self.leaderboard(&message.group_id, &candidate.key).await?;

        Ok(vec![
            Action::Card {
                title: format!(
                    "{} solved the {} in {}",
                    message.author_name,
                    candidate.key.title(),
                    format_time(candidate.seconds)
                ),
                description: leaderboard.render(),
                color: leaderboard.highlight_color(&message.author_id),
                thumbnail_url,
            },
            Action::Delete,
        ])
    }

    async fn on_command(
        &self,
        message: &InboundMessage,
        command: Command,
    ) -> BotResult<Vec<Action>> {
        let action = match command {
            Command::MiniLeaderboard { date } => {
                let key = MiniKey::new(date.unwrap_or_else(|| self.today()));
                let leaderboard = self.leaderboard(&message.group_id, &key).await?;
                Action::Reply {
                    text: leaderboard.render(),
                }
            }
            Command::PipsLeaderboard { key } => {
                let leaderboard = self.leaderboard(&message.group_id, &key).await?;
                Action::Reply {
                    text: leaderboard.render(),
                }
            }
            Command::Dump(puzzle) => {
                let csv = match puzzle {
                    Puzzle::Mini => self.export::<MiniKey>(&message.group_id).await?,
                    Puzzle::Pips => self.export::<PipsKey>(&message.group_id).await?,
                };
                Action::Attachment {
                    filename: EXPORT_FILENAME.to_string(),
                    content: String::from_utf8_lossy(&csv).into_owned(),
                }
            }
            Command::Help(puzzle) => Action::Reply {
                text: command::help(puzzle).to_string(),
            },
        };

        Ok(vec![action])
    }

    pub async fn leaderboard<K: PuzzleKey>(
        &self,
        group_id: &str,
        key: &K,
    ) -> BotResult<Leaderboard<K>> {
        Ok(leaderboard::build(&self.store, self.identities.as_ref(), group_id, key).await?)
    }

    pub async fn export<K: PuzzleKey>(&self, group_id: &str) -> BotResult<Vec<u8>> {
        Ok(export::export::<K>(&self.store, self.identities.as_ref(), group_id).await?)
    }
}
