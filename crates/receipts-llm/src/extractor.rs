//! Expense extraction orchestration.
//!
//! [`ExpenseExtractor::extract`] is the single entry point: build the
//! prompt, call the transport, parse and validate, apply the review
//! threshold. It never returns `Err` - every failure mode degrades to an
//! [`ExtractionOutcome`] with `success: false` and conservative fallback
//! data, so the caller always has something to persist.

use crate::parse::{default_category_id, parse_expense_fields};
use crate::prompt::{data_message, instruction_prompt};
use crate::transport::{GenerateRequest, GenerationParameters, LlmTransport};
use receipts_core::{Category, ExtractedExpense, TrackingId};
use receipts_ocr::NormalizedOcr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-call extraction options.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Model identifier.
    pub model: String,
    /// Confidence threshold below which the expense is flagged for review.
    pub confidence_threshold: f64,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            model: "cohere.command-r-plus".to_string(),
            confidence_threshold: 0.7,
            max_tokens: 2000,
            temperature: 0.1,
        }
    }
}

/// What one extraction attempt produced.
///
/// `expense` is always populated - with validated data on success, with the
/// conservative fallback otherwise. Raw request and response are carried for
/// the audit trail on the persisted record.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Whether usable data was extracted.
    pub success: bool,
    /// Validated or fallback expense data.
    pub expense: ExtractedExpense,
    /// The request as sent, for audit.
    pub raw_request: serde_json::Value,
    /// The raw response text, when one arrived.
    pub raw_response: Option<String>,
    /// Correlation key of the receipt this ran for.
    pub tracking_id: TrackingId,
    /// What went wrong, when `success` is false.
    pub error: Option<String>,
}

/// Drives expense extraction through an [`LlmTransport`].
#[derive(Clone)]
pub struct ExpenseExtractor {
    transport: Arc<dyn LlmTransport>,
}

impl ExpenseExtractor {
    /// Create an extractor over the given transport.
    #[must_use = "creates the expense extractor"]
    pub fn new(transport: Arc<dyn LlmTransport>) -> Self {
        Self { transport }
    }

    /// Extract a structured expense from normalized OCR data.
    ///
    /// Infallible by contract: transport and parse failures produce an
    /// outcome with `success: false` and fallback expense data.
    pub async fn extract(
        &self,
        normalized: &NormalizedOcr,
        categories: &[Category],
        options: &ExtractOptions,
        tracking_id: &TrackingId,
    ) -> ExtractionOutcome {
        let request = GenerateRequest {
            prompt: instruction_prompt(categories, normalized.confidence_guidance.as_ref()),
            prior_messages: vec![data_message(normalized)],
            model: options.model.clone(),
            parameters: GenerationParameters {
                max_tokens: options.max_tokens,
                temperature: options.temperature,
                ..Default::default()
            },
        };
        let raw_request = serde_json::to_value(&request).unwrap_or_default();

        debug!(tracking_id = %tracking_id, model = %options.model, "running expense extraction");

        let response = match self.transport.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(tracking_id = %tracking_id, error = %e, "LLM call failed");
                return self.failed_outcome(
                    categories,
                    raw_request,
                    None,
                    tracking_id,
                    format!("LLM call failed: {e}"),
                );
            }
        };

        let fields = match parse_expense_fields(&response.text, categories) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(tracking_id = %tracking_id, error = %e, "unusable LLM response");
                return self.failed_outcome(
                    categories,
                    raw_request,
                    Some(response.text),
                    tracking_id,
                    e,
                );
            }
        };

        let requires_review = fields.confidence < options.confidence_threshold;
        let review_reason = requires_review.then(|| {
            format!(
                "Extraction confidence {:.2} is below the review threshold {:.2}",
                fields.confidence, options.confidence_threshold
            )
        });

        ExtractionOutcome {
            success: true,
            expense: ExtractedExpense {
                vendor: fields.vendor,
                amount: fields.amount,
                date: fields.date,
                category_id: fields.category_id,
                description: fields.description,
                confidence: fields.confidence,
                requires_review,
                review_reason,
            },
            raw_request,
            raw_response: Some(response.text),
            tracking_id: tracking_id.clone(),
            error: None,
        }
    }

    fn failed_outcome(
        &self,
        categories: &[Category],
        raw_request: serde_json::Value,
        raw_response: Option<String>,
        tracking_id: &TrackingId,
        error: String,
    ) -> ExtractionOutcome {
        ExtractionOutcome {
            success: false,
            expense: ExtractedExpense::extraction_fallback(&default_category_id(categories)),
            raw_request,
            raw_response,
            tracking_id: tracking_id.clone(),
            error: Some(error),
        }
    }
}
