//! Anti-spoof check for credentialed solve announcements.
//!
//! The badge endpoint renders a proof image for a genuine
//! (credential, date, time) triple and a blank placeholder for anything else.
//! A credential is accepted iff its image differs from the placeholder.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

pub type ProofResult<T> = Result<T, ProofError>;

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Proof image request failed: {0}")]
    Request(String),

    #[error("Proof image endpoint returned status {0}")]
    Status(u16),
}

/// Parameters identifying one proof image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofParams {
    pub credential: String,
    pub date: NaiveDate,
    pub seconds: u32,
}

impl ProofParams {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("c", self.credential.clone()),
            ("d", self.date.format("%Y-%m-%d").to_string()),
            ("t", self.seconds.to_string()),
        ]
    }
}

/// Byte-exact retrieval of proof images
#[async_trait]
pub trait ProofImageSource: Send + Sync {
    /// Fetch the image for `params`, or the blank baseline image for `None`
    async fn fetch(&self, params: Option<&ProofParams>) -> ProofResult<Vec<u8>>;

    /// Public URL of the image for `params`, used as a card thumbnail
    fn image_url(&self, params: &ProofParams) -> String;
}

/// Returns `false` when the credential renders the same bytes as the blank image
pub async fn verify(source: &dyn ProofImageSource, params: &ProofParams) -> ProofResult<bool> {
    let proof = source.fetch(Some(params)).await?;
    let baseline = source.fetch(None).await?;
    Ok(proof != baseline)
}

/// Proof images served over HTTP
pub struct HttpProofImageSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProofImageSource {
    pub fn new(base_url: String, timeout: Duration) -> ProofResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProofError::Request(e.to_string()))?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl ProofImageSource for HttpProofImageSource {
    async fn fetch(&self, params: Option<&ProofParams>) -> ProofResult<Vec<u8>> {
        let mut request = self.client.get(&self.base_url);
        if let Some(params) = params {
            request = request.query(&params.query());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProofError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProofError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProofError::Request(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn image_url(&self, params: &ProofParams) -> String {
        format!(
            "{}?c={}&d={}&t={}",
            self.base_url,
            params.credential,
            params.date.format("%Y-%m-%d"),
            params.seconds
        )
    }
}
