//! CSV dump of every solve stored for a group.
//!
//! Display names are looked up through the identity resolver once per
//! distinct user for the duration of one export.

use crate::identity::{IdentityError, IdentityResolver};
use crate::puzzle::PuzzleKey;
use crate::store::{SolveStore, StoreError};
use crate::types::UserId;
use std::collections::HashMap;

/// Name of the attachment produced by the dump command
pub const EXPORT_FILENAME: &str = "solves.csv";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Export all solves of `K` for a group as CSV bytes
pub async fn export<K: PuzzleKey>(
    store: &SolveStore,
    identities: &dyn IdentityResolver,
    group_id: &str,
) -> Result<Vec<u8>, ExportError> {
    let solves = store.group::<K>(group_id).await?;

    let mut header = vec!["display_name", "timestamp"];
    header.extend_from_slice(K::KEY_COLUMNS);
    header.push("seconds");

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(&header)?;

    let mut display_names: HashMap<UserId, String> = HashMap::new();
    for solve in &solves {
        let display_name = match display_names.get(&solve.user_id) {
            Some(name) => name.clone(),
            None => {
                let name = identities.display_name(&solve.user_id).await?;
                display_names.insert(solve.user_id.clone(), name.clone());
                name
            }
        };

        let mut row = vec![
            display_name,
            solve.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ];
        row.extend(solve.key.export_fields());
        row.push(solve.seconds.to_string());
        writer.write_record(&row)?;
    }

    tracing::debug!(
        "Exported {} {} rows for group {} ({} distinct users)",
        solves.len(),
        K::TABLE,
        group_id,
        display_names.len()
    );

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}
