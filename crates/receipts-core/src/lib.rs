//! # receipts-core
//!
//! Core types for the receipt capture and extraction pipeline: the data
//! model, frozen configuration, error taxonomy, tracking IDs and the
//! composite confidence scorer.
//!
//! The pipeline turns a submitted receipt file into exactly one persisted
//! expense record:
//!
//! ```text
//! file -> analysis task submitted -> (async) artifact arrives -> normalized
//!      -> LLM extraction -> validated -> composite confidence -> record
//! ```
//!
//! This crate holds the vocabulary shared by every stage; it performs no
//! I/O. See `receipts-ocr`, `receipts-llm` and `receipts-pipeline` for the
//! stages themselves.

pub mod config;
pub mod confidence;
pub mod error;
pub mod model;
pub mod tracking;

pub use config::{PipelineConfig, ALLOWED_FILE_TYPES};
pub use confidence::{clamp_confidence, composite_score, ConfidenceLabel};
pub use error::{ReceiptError, Result};
pub use model::{Category, ExpenseRecord, ExpenseStatus, ExtractedExpense, ReceiptJob};
pub use tracking::TrackingId;
