//! Data model for receipts moving through the pipeline.
//!
//! Three layers of state:
//!
//! - [`ReceiptJob`] - the in-flight unit of work created at submission.
//! - [`ExtractedExpense`] - the validated LLM output. Every field always has
//!   a concrete value; validators substitute fallbacks rather than leaving
//!   holes.
//! - [`ExpenseRecord`] - the persisted entity, one per file, moving through
//!   `PENDING -> PROCESSING -> COMPLETE | ERROR`.

use crate::tracking::TrackingId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an [`ExpenseRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Submitted, analysis task not yet dispatched.
    Pending,
    /// Analysis task dispatched; waiting for the artifact sweep.
    Processing,
    /// Extraction finished; fields are final. Terminal.
    Complete,
    /// Extraction or analysis failed. Terminal.
    Error,
}

impl ExpenseStatus {
    /// Whether the record can still change state.
    #[inline]
    #[must_use = "returns whether the status is terminal"]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An expense category from the read-only directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Opaque category ID.
    pub id: String,
    /// Display name, matched case-insensitively during validation.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// One receipt's trip through the pipeline.
///
/// Created at submission; the tracking ID is immutable from then on and the
/// output path is derived from it, so the job can always be re-located from
/// persisted state alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptJob {
    /// Opaque file-store ID of the submitted receipt.
    pub file_id: String,
    /// Original file name, used for type validation and display.
    pub file_name: String,
    /// Submitting user.
    pub user_id: String,
    /// Correlation key across all stages.
    pub tracking_id: TrackingId,
    /// Task ID returned by the document-analysis service, once submitted.
    pub task_id: Option<String>,
    /// Deterministic artifact path derived from the tracking ID.
    pub output_file_path: String,
    /// Submitted file size in bytes.
    pub file_size: u64,
    /// Lowercased file extension.
    pub file_type: String,
}

/// Validated expense data extracted by the LLM.
///
/// Invariant: no field is ever missing. On any validation failure the
/// field-level validators substitute conservative defaults instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedExpense {
    /// Vendor name, at most 100 characters.
    pub vendor: String,
    /// Amount in the receipt currency, positive, rounded to cents.
    pub amount: f64,
    /// Transaction date.
    pub date: NaiveDate,
    /// Resolved category ID; always resolves to a known category or the
    /// default.
    pub category_id: String,
    /// Free-form description, at most 500 characters.
    pub description: String,
    /// LLM-reported confidence, clamped to [0, 1].
    pub confidence: f64,
    /// Whether a human must verify this extraction before it is trusted.
    pub requires_review: bool,
    /// Why review is required, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
}

impl ExtractedExpense {
    /// Placeholder values shown while the analysis artifact is awaited.
    #[must_use = "returns the processing placeholder expense"]
    pub fn processing_placeholder(category_id: &str) -> Self {
        Self {
            vendor: "Processing...".to_string(),
            amount: 0.0,
            date: Utc::now().date_naive(),
            category_id: category_id.to_string(),
            description: "Receipt is being processed".to_string(),
            confidence: 0.0,
            requires_review: false,
            review_reason: None,
        }
    }

    /// Conservative fallback used when extraction fails part-way (e.g. the
    /// LLM responded but with unparseable JSON).
    #[must_use = "returns the extraction fallback expense"]
    pub fn extraction_fallback(category_id: &str) -> Self {
        Self {
            vendor: "Unknown Vendor".to_string(),
            amount: 0.0,
            date: Utc::now().date_naive(),
            category_id: category_id.to_string(),
            description: "Automatic extraction failed; manual entry required".to_string(),
            confidence: 0.1,
            requires_review: true,
            review_reason: Some("Extraction produced no usable data".to_string()),
        }
    }
}

/// The persisted expense entity. Exactly one exists per `file_id`; duplicate
/// submissions and re-processing transition this record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// File-store ID this record was created for. Upsert key.
    pub file_id: String,
    /// Original file name.
    pub file_name: String,
    /// Submitting user.
    pub user_id: String,
    /// Correlation key.
    pub tracking_id: TrackingId,
    /// Lifecycle state.
    pub status: ExpenseStatus,
    /// Extracted (or placeholder/fallback) expense fields.
    pub expense: ExtractedExpense,
    /// Blended analysis + LLM confidence, set when COMPLETE.
    pub composite_confidence: f64,
    /// Raw analysis payload, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_ocr: Option<serde_json::Value>,
    /// Raw LLM request, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_llm_request: Option<serde_json::Value>,
    /// Raw LLM response text, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_llm_response: Option<String>,
    /// Set true only by the downstream report import step.
    pub imported: bool,
    /// Human-readable failure description, ERROR state only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of sweeps that have looked for this job's artifact.
    pub sweep_attempts: u32,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}
