//! Display-name lookup through the chat platform bridge.

use crate::types::{GroupId, UserId};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Could not resolve users: {}", .0.join(", "))]
    Unresolved(Vec<UserId>),

    #[error("Identity request failed: {0}")]
    Request(String),

    #[error("Identity response parsing failed: {0}")]
    Parse(String),
}

/// Resolves platform user ids to display names
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a batch of group members. Either every id resolves or the
    /// whole call fails with [`IdentityError::Unresolved`].
    async fn resolve(
        &self,
        group_id: &GroupId,
        user_ids: &[UserId],
    ) -> IdentityResult<HashMap<UserId, String>>;

    /// Global display name of a single user
    async fn display_name(&self, user_id: &UserId) -> IdentityResult<String>;
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    members: HashMap<UserId, String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    display_name: String,
}

/// Resolver backed by the bridge's HTTP API
pub struct HttpIdentityResolver {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpIdentityResolver {
    pub fn new(base_url: String, timeout: Duration) -> IdentityResult<Self> {
        let base_url = Url::parse(&base_url)
            .map_err(|e| IdentityError::Request(format!("Invalid bridge URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Request(format!(
                "Bridge URL {} cannot carry a path",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Bridge URL with each segment appended percent-encoded, so ids stay opaque
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(
        &self,
        group_id: &GroupId,
        user_ids: &[UserId],
    ) -> IdentityResult<HashMap<UserId, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = self.endpoint(&["groups", group_id.as_str(), "members"]);
        let ids: Vec<(&str, &str)> = user_ids.iter().map(|id| ("ids", id.as_str())).collect();
        let response = self
            .client
            .get(url.clone())
            .query(&ids)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Request(format!(
                "Bridge returned status {} for {}",
                response.status(),
                url
            )));
        }

        let body: MembersResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        let missing: Vec<UserId> = user_ids
            .iter()
            .filter(|id| !body.members.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(IdentityError::Unresolved(missing));
        }

        Ok(body.members)
    }

    async fn display_name(&self, user_id: &UserId) -> IdentityResult<String> {
        let url = self.endpoint(&["users", user_id.as_str()]);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::Unresolved(vec![user_id.clone()]));
        }
        if !response.status().is_success() {
            return Err(IdentityError::Request(format!(
                "Bridge returned status {} for {}",
                response.status(),
                url
            )));
        }

        let body: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(body.display_name)
    }
}
