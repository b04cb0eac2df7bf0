//! LLM generation transport.
//!
//! The wire contract is a plain generate-text endpoint: a task prompt plus
//! prior messages in, generated text out. [`LlmTransport`] keeps the
//! pipeline testable against an in-memory fake; [`HttpLlmClient`] is the
//! production implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

/// One prior message in a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (`USER` / `ASSISTANT` / `SYSTEM`).
    pub role: String,
    /// Message text.
    pub text: String,
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Frequency penalty.
    pub frequency_penalty: f64,
    /// Presence penalty.
    pub presence_penalty: f64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.1,
            top_k: 0,
            top_p: 0.75,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// A generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Task instructions.
    pub prompt: String,
    /// Prior conversation messages; the data payload travels here so the
    /// instruction prompt stays stable across receipts.
    pub prior_messages: Vec<ChatMessage>,
    /// Model identifier.
    pub model: String,
    /// Sampling parameters.
    pub parameters: GenerationParameters,
}

/// A generation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Generated text, expected to be JSON for extraction prompts.
    pub text: String,
    /// Model that produced the text.
    #[serde(default)]
    pub model: String,
    /// Source citations, when the backend provides them. Opaque here.
    #[serde(default)]
    pub citations: Vec<serde_json::Value>,
}

/// Object-safe async transport to an LLM generation endpoint.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Run one generation request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the response cannot
    /// be decoded.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

/// HTTP client for the LLM generation endpoint.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpLlmClient {
    /// Create a client for the given endpoint and API key.
    #[must_use = "creates the LLM HTTP client"]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from `RECEIPTS_LLM_ENDPOINT` and
    /// `RECEIPTS_LLM_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is unset.
    pub fn from_env() -> Result<Self> {
        let endpoint =
            env::var("RECEIPTS_LLM_ENDPOINT").context("RECEIPTS_LLM_ENDPOINT not set")?;
        let api_key = env::var("RECEIPTS_LLM_API_KEY").context("RECEIPTS_LLM_API_KEY not set")?;
        Ok(Self::new(endpoint, api_key))
    }
}

#[async_trait]
impl LlmTransport for HttpLlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send request to LLM endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM endpoint error ({status}): {error_text}");
        }

        response
            .json()
            .await
            .context("Failed to parse LLM response")
    }
}
