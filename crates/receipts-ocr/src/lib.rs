//! # receipts-ocr
//!
//! Document-analysis (OCR) artifact handling for the receipt pipeline.
//!
//! The analysis service runs out-of-process and asynchronously writes a JSON
//! artifact per receipt. This crate decodes that artifact into a fixed
//! schema ([`OcrAnalysis`]), derives confidence metrics from it
//! ([`OcrConfidenceMetrics`]), and flattens it into the LLM-ready form
//! ([`normalize`]).
//!
//! Everything here is pure - no I/O, no failure modes beyond JSON decode.
//! Defensive by construction: an artifact with zero pages or missing element
//! collections normalizes to an empty-but-valid structure.

pub mod analysis;
pub mod metrics;
pub mod normalize;

pub use analysis::{OcrAnalysis, OcrField, OcrLine, OcrPage, OcrTable, OcrWord};
pub use metrics::{OcrConfidenceMetrics, HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD};
pub use normalize::{
    normalize, ConfidenceGuidance, FieldElement, FieldReliability, NormalizedOcr, OcrData,
    TextElement,
};
