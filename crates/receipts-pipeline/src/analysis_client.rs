//! Document-analysis service client.
//!
//! Submission is fire-and-forget: the service accepts the file and later
//! writes a JSON artifact at the requested output path. Nothing in the
//! pipeline ever blocks on the task - the artifact sweep picks the result
//! up on a later tick.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

/// Document type requested for every receipt submission.
pub const RECEIPT_DOCUMENT_TYPE: &str = "RECEIPT";

/// An analysis submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Document classification hint, always `RECEIPT` here.
    pub document_type: String,
    /// File contents, base64-encoded.
    pub input_file: String,
    /// Where the service must write the result artifact.
    pub output_path: String,
}

impl AnalysisRequest {
    /// Build a receipt submission from raw file bytes.
    #[must_use = "builds the analysis request"]
    pub fn for_receipt(file_bytes: &[u8], output_path: impl Into<String>) -> Self {
        Self {
            document_type: RECEIPT_DOCUMENT_TYPE.to_string(),
            input_file: base64::engine::general_purpose::STANDARD.encode(file_bytes),
            output_path: output_path.into(),
        }
    }
}

/// Acknowledgement returned by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisAck {
    task_id: String,
}

/// Async client submitting analysis tasks.
#[async_trait]
pub trait DocumentAnalysisClient: Send + Sync {
    /// Submit one analysis task, returning the service's task ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission cannot be sent or is rejected.
    async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<String>;
}

/// HTTP implementation of [`DocumentAnalysisClient`].
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpAnalysisClient {
    /// Create a client for the given endpoint and API key.
    #[must_use = "creates the analysis HTTP client"]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from `RECEIPTS_ANALYSIS_ENDPOINT` and
    /// `RECEIPTS_ANALYSIS_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is unset.
    pub fn from_env() -> Result<Self> {
        let endpoint = env::var("RECEIPTS_ANALYSIS_ENDPOINT")
            .context("RECEIPTS_ANALYSIS_ENDPOINT not set")?;
        let api_key = env::var("RECEIPTS_ANALYSIS_API_KEY")
            .context("RECEIPTS_ANALYSIS_API_KEY not set")?;
        Ok(Self::new(endpoint, api_key))
    }
}

#[async_trait]
impl DocumentAnalysisClient for HttpAnalysisClient {
    async fn submit_analysis(&self, request: &AnalysisRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send analysis submission")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("analysis service error ({status}): {error_text}");
        }

        let ack: AnalysisAck = response
            .json()
            .await
            .context("Failed to parse analysis acknowledgement")?;
        Ok(ack.task_id)
    }
}
