//! Extraction prompt construction.
//!
//! Instructions and data are kept apart: the OCR payload travels as a prior
//! message while the task prompt carries only instructions, the category
//! list and the confidence guidance. Given the same categories and guidance
//! the prompt text is byte-identical, which keeps it cacheable across
//! receipts.

use crate::transport::ChatMessage;
use receipts_core::Category;
use receipts_ocr::{ConfidenceGuidance, NormalizedOcr};
use std::fmt::Write;

/// Task instructions for expense extraction.
const EXTRACTION_INSTRUCTIONS: &str = r#"You are an expense extraction system. The previous message contains OCR output from a receipt. Extract the expense into JSON.

OUTPUT JSON SCHEMA:
{
  "vendor": "<merchant name>",
  "amount": <total amount as a number>,
  "date": "<transaction date, YYYY-MM-DD>",
  "categoryId": "<id from the category list below>",
  "description": "<one-line summary of the purchase>",
  "confidence": <0.0-1.0, your confidence in this extraction>
}

EXTRACTION RULES:
1. Use the grand total including tax, not a subtotal or line-item price
2. Prefer the transaction date over the print date
3. Pick the categoryId whose category best fits the purchase
4. Keep the description under one sentence
5. Confidence: 1.0 = every field read cleanly, 0.5 = significant guesswork
6. Where the OCR guidance marks text unreliable, lower your confidence accordingly

Return ONLY valid JSON. No markdown, no explanation."#;

/// Build the prior-message payload carrying the OCR data.
#[must_use = "returns the data payload message"]
pub fn data_message(normalized: &NormalizedOcr) -> ChatMessage {
    // NormalizedOcr uses ordered maps, so this serialization is stable.
    let payload =
        serde_json::to_string(normalized).unwrap_or_else(|_| String::from("{}"));
    ChatMessage {
        role: "USER".to_string(),
        text: payload,
    }
}

/// Build the instruction prompt for a category list and optional guidance.
#[must_use = "returns the instruction prompt"]
pub fn instruction_prompt(
    categories: &[Category],
    guidance: Option<&ConfidenceGuidance>,
) -> String {
    let mut prompt = String::from(EXTRACTION_INSTRUCTIONS);

    prompt.push_str("\n\nAVAILABLE CATEGORIES:\n");
    if categories.is_empty() {
        prompt.push_str("(none provided; use categoryId \"1\")\n");
    }
    for category in categories {
        let _ = writeln!(prompt, "- id {}: {}", category.id, category.name);
    }

    if let Some(guidance) = guidance {
        prompt.push_str("\nOCR CONFIDENCE GUIDANCE:\n");
        if !guidance.high_confidence_fields.is_empty() {
            let _ = writeln!(
                prompt,
                "- Read reliably: {}",
                guidance.high_confidence_fields.join(", ")
            );
        }
        if !guidance.low_confidence_fields.is_empty() {
            let _ = writeln!(
                prompt,
                "- Read poorly, treat as suspect: {}",
                guidance.low_confidence_fields.join(", ")
            );
        }
    }

    prompt
}
