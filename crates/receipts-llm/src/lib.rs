//! # receipts-llm
//!
//! LLM-based expense extraction for the receipt pipeline.
//!
//! Given normalized OCR output and the live category directory, this crate
//! builds a deterministic extraction prompt, calls the generation endpoint,
//! and parses the response into a fully-validated [`ExtractedExpense`] -
//! substituting conservative fallbacks wherever the model's answer is
//! unusable.
//!
//! ## Design points
//!
//! - **Instructions/data split**: the OCR payload travels as a prior
//!   message; the instruction prompt depends only on the category list and
//!   confidence guidance, so it stays cacheable across receipts.
//! - **Infallible boundary**: [`ExpenseExtractor::extract`] never returns
//!   `Err`. Transport and parse failures yield an outcome with
//!   `success: false` and fallback expense data the record builder can
//!   persist.
//! - **Independent validators**: each field is sanitized on its own (amount,
//!   date, category, confidence, text lengths); one bad field never poisons
//!   the rest.
//!
//! [`ExtractedExpense`]: receipts_core::ExtractedExpense

pub mod extractor;
pub mod parse;
pub mod prompt;
pub mod transport;

pub use extractor::{ExpenseExtractor, ExtractOptions, ExtractionOutcome};
pub use parse::{default_category_id, extract_json, parse_expense_fields, ParsedExpenseFields};
pub use transport::{
    ChatMessage, GenerateRequest, GenerateResponse, GenerationParameters, HttpLlmClient,
    LlmTransport,
};
