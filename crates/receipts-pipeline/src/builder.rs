//! Expense record lifecycle transitions.
//!
//! All writes to the record store flow through [`RecordBuilder`], which
//! enforces the two invariants the rest of the pipeline leans on:
//!
//! - **One record per file**: every transition looks up the existing record
//!   for the file ID and updates it in place. Duplicate submissions and
//!   re-processing never create siblings.
//! - **Terminal means terminal**: COMPLETE and ERROR records only change
//!   when the same file is explicitly resubmitted, which restarts the
//!   lifecycle.

use crate::stores::RecordStore;
use chrono::Utc;
use receipts_core::{
    ExpenseRecord, ExpenseStatus, ExtractedExpense, ReceiptJob, Result,
};
use std::sync::Arc;
use tracing::info;

/// Builds and transitions [`ExpenseRecord`]s idempotently.
#[derive(Clone)]
pub struct RecordBuilder {
    records: Arc<dyn RecordStore>,
}

impl RecordBuilder {
    /// Create a builder over the given store.
    #[must_use = "creates the record builder"]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Write the initial PENDING record for a freshly validated submission.
    ///
    /// Resubmitting a file that already has a record (including a terminal
    /// one) restarts its lifecycle in place: the sweep counter resets and
    /// the tracking ID is replaced with the new submission's.
    ///
    /// # Errors
    ///
    /// Returns [`receipts_core::ReceiptError::Persistence`] if the store
    /// write fails.
    pub fn mark_pending(&self, job: &ReceiptJob, default_category_id: &str) -> Result<ExpenseRecord> {
        let now = Utc::now();
        let existing = self.records.get(&job.file_id)?;
        let created_at = existing.as_ref().map_or(now, |r| r.created_at);
        if existing.is_some() {
            info!(file_id = %job.file_id, "resubmission, restarting existing record");
        }

        let record = ExpenseRecord {
            file_id: job.file_id.clone(),
            file_name: job.file_name.clone(),
            user_id: job.user_id.clone(),
            tracking_id: job.tracking_id.clone(),
            status: ExpenseStatus::Pending,
            expense: ExtractedExpense::processing_placeholder(default_category_id),
            composite_confidence: 0.0,
            raw_ocr: None,
            raw_llm_request: None,
            raw_llm_response: None,
            imported: false,
            error_message: None,
            sweep_attempts: 0,
            created_at,
            updated_at: now,
        };
        self.records.upsert(&record)?;
        Ok(record)
    }

    /// Transition to PROCESSING once the analysis task is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`receipts_core::ReceiptError::Persistence`] if the store
    /// write fails.
    pub fn mark_processing(&self, record: &ExpenseRecord) -> Result<ExpenseRecord> {
        let mut record = record.clone();
        record.status = ExpenseStatus::Processing;
        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        Ok(record)
    }

    /// Count one sweep that found no artifact for this record.
    ///
    /// # Errors
    ///
    /// Returns [`receipts_core::ReceiptError::Persistence`] if the store
    /// write fails.
    pub fn record_sweep_miss(&self, record: &ExpenseRecord) -> Result<ExpenseRecord> {
        let mut record = record.clone();
        record.sweep_attempts += 1;
        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        Ok(record)
    }

    /// Terminal ERROR transition.
    ///
    /// Carries the fallback expense when extraction produced one, so the
    /// user still sees a reviewable stub instead of an empty row.
    ///
    /// # Errors
    ///
    /// Returns [`receipts_core::ReceiptError::Persistence`] if the store
    /// write fails.
    pub fn mark_error(
        &self,
        record: &ExpenseRecord,
        message: &str,
        fallback: Option<ExtractedExpense>,
        raw_llm_request: Option<serde_json::Value>,
        raw_llm_response: Option<String>,
    ) -> Result<ExpenseRecord> {
        let mut record = record.clone();
        record.status = ExpenseStatus::Error;
        record.error_message = Some(message.to_string());
        if let Some(expense) = fallback {
            record.expense = expense;
        }
        if raw_llm_request.is_some() {
            record.raw_llm_request = raw_llm_request;
        }
        if raw_llm_response.is_some() {
            record.raw_llm_response = raw_llm_response;
        }
        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        Ok(record)
    }

    /// Terminal COMPLETE transition with the extracted fields and audit
    /// payloads.
    ///
    /// # Errors
    ///
    /// Returns [`receipts_core::ReceiptError::Persistence`] if the store
    /// write fails.
    #[allow(clippy::too_many_arguments)]
    pub fn mark_complete(
        &self,
        record: &ExpenseRecord,
        expense: ExtractedExpense,
        composite_confidence: f64,
        raw_ocr: serde_json::Value,
        raw_llm_request: serde_json::Value,
        raw_llm_response: Option<String>,
    ) -> Result<ExpenseRecord> {
        let mut record = record.clone();
        record.status = ExpenseStatus::Complete;
        record.expense = expense;
        record.composite_confidence = composite_confidence;
        record.raw_ocr = Some(raw_ocr);
        record.raw_llm_request = Some(raw_llm_request);
        record.raw_llm_response = raw_llm_response;
        record.error_message = None;
        record.imported = false;
        record.updated_at = Utc::now();
        self.records.upsert(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryRecordStore;
    use receipts_core::TrackingId;

    fn job(file_id: &str) -> ReceiptJob {
        ReceiptJob {
            file_id: file_id.to_string(),
            file_name: "receipt.pdf".to_string(),
            user_id: "u1".to_string(),
            tracking_id: TrackingId::generate(),
            task_id: Some("task-1".to_string()),
            output_file_path: "ocr-output/x.json".to_string(),
            file_size: 1024,
            file_type: "pdf".to_string(),
        }
    }

    fn setup() -> (Arc<MemoryRecordStore>, RecordBuilder) {
        let store = Arc::new(MemoryRecordStore::new());
        let builder = RecordBuilder::new(store.clone());
        (store, builder)
    }

    #[test]
    fn test_pending_record_has_placeholder() {
        let (_, builder) = setup();
        let record = builder.mark_pending(&job("f1"), "1").unwrap();
        assert_eq!(record.status, ExpenseStatus::Pending);
        assert_eq!(record.expense.vendor, "Processing...");
        assert_eq!(record.sweep_attempts, 0);
        assert!(!record.imported);
    }

    #[test]
    fn test_upsert_is_idempotent_per_file() {
        let (store, builder) = setup();
        builder.mark_pending(&job("f1"), "1").unwrap();
        builder.mark_pending(&job("f1"), "1").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resubmission_preserves_created_at_and_resets_attempts() {
        let (store, builder) = setup();
        let first = builder.mark_pending(&job("f1"), "1").unwrap();
        let mut swept = builder.record_sweep_miss(&first).unwrap();
        swept = builder.record_sweep_miss(&swept).unwrap();
        assert_eq!(swept.sweep_attempts, 2);

        let second = builder.mark_pending(&job("f1"), "1").unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.sweep_attempts, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_error_transition_updates_in_place() {
        let (store, builder) = setup();
        let record = builder.mark_pending(&job("f1"), "1").unwrap();
        let record = builder.mark_processing(&record).unwrap();
        let errored = builder
            .mark_error(&record, "analysis never produced output", None, None, None)
            .unwrap();

        assert_eq!(errored.status, ExpenseStatus::Error);
        assert_eq!(
            errored.error_message.as_deref(),
            Some("analysis never produced output")
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_complete_transition_carries_audit_payloads() {
        let (_, builder) = setup();
        let record = builder.mark_pending(&job("f1"), "1").unwrap();
        let record = builder.mark_processing(&record).unwrap();

        let expense = ExtractedExpense {
            vendor: "Acme".into(),
            amount: 42.5,
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category_id: "5".into(),
            description: "lunch".into(),
            confidence: 0.85,
            requires_review: false,
            review_reason: None,
        };
        let complete = builder
            .mark_complete(
                &record,
                expense,
                0.89,
                serde_json::json!({"pages": []}),
                serde_json::json!({"prompt": "..."}),
                Some("{\"vendor\": \"Acme\"}".to_string()),
            )
            .unwrap();

        assert_eq!(complete.status, ExpenseStatus::Complete);
        assert_eq!(complete.composite_confidence, 0.89);
        assert!(complete.raw_ocr.is_some());
        assert!(complete.raw_llm_request.is_some());
        assert!(complete.raw_llm_response.is_some());
        assert!(!complete.imported);
        assert!(complete.error_message.is_none());
    }
}
