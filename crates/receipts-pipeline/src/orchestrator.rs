//! Document task orchestration: submission and the artifact sweep.
//!
//! Submission validates the file, writes the PENDING record, dispatches the
//! analysis task and transitions to PROCESSING. From then on the job is
//! driven entirely by [`TaskOrchestrator::sweep`], which an external
//! scheduler invokes periodically:
//!
//! ```text
//! SUBMITTED --sweep--> NOT_READY   (no artifact yet; attempt counted)
//!                  \-> READY       (artifact found; extract, complete, archive)
//!                  \-> FAILED      (malformed artifact or attempt budget spent)
//! ```
//!
//! The sweep holds no state of its own: everything it needs is on the
//! persisted record, so any number of scheduler ticks - including
//! overlapping ones on different hosts - converge. Processed artifacts are
//! moved out of the scanned folder, which is what makes re-discovery a
//! no-op.

use crate::analysis_client::{AnalysisRequest, DocumentAnalysisClient};
use crate::builder::RecordBuilder;
use crate::stores::{CategoryDirectory, FileStore, RecordStore};
use receipts_core::{
    composite_score, Category, ExpenseRecord, PipelineConfig, ReceiptError, ReceiptJob, Result,
    TrackingId,
};
use receipts_llm::{default_category_id, ExpenseExtractor, ExtractOptions};
use receipts_ocr::{normalize, OcrAnalysis, OcrConfidenceMetrics};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What one sweep pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// In-flight records examined.
    pub swept: usize,
    /// Artifacts found and fully processed.
    pub ready: usize,
    /// Jobs still waiting on their artifact.
    pub not_ready: usize,
    /// Jobs that reached the ERROR state this pass.
    pub failed: usize,
}

enum SweepState {
    Ready,
    NotReady,
    Failed,
}

/// Drives receipts from submission to a terminal record.
#[derive(Clone)]
pub struct TaskOrchestrator {
    config: PipelineConfig,
    files: Arc<dyn FileStore>,
    categories: Arc<dyn CategoryDirectory>,
    analysis: Arc<dyn DocumentAnalysisClient>,
    extractor: ExpenseExtractor,
    builder: RecordBuilder,
    records: Arc<dyn RecordStore>,
}

impl TaskOrchestrator {
    /// Wire an orchestrator over its collaborators.
    #[must_use = "creates the task orchestrator"]
    pub fn new(
        config: PipelineConfig,
        files: Arc<dyn FileStore>,
        records: Arc<dyn RecordStore>,
        categories: Arc<dyn CategoryDirectory>,
        analysis: Arc<dyn DocumentAnalysisClient>,
        extractor: ExpenseExtractor,
    ) -> Self {
        let builder = RecordBuilder::new(records.clone());
        Self {
            config,
            files,
            categories,
            analysis,
            extractor,
            builder,
            records,
        }
    }

    /// Validate and submit one receipt for analysis.
    ///
    /// On success the file's record is PROCESSING and the returned job
    /// carries the service task ID plus the deterministic artifact path.
    ///
    /// # Errors
    ///
    /// - [`ReceiptError::Validation`] when the size or type check fails;
    ///   nothing is submitted and no record is written.
    /// - [`ReceiptError::Submission`] when the analysis service rejects the
    ///   task; the record is left in ERROR state.
    pub async fn submit(&self, file_id: &str, file_name: &str, user_id: &str) -> Result<ReceiptJob> {
        let bytes = self.files.load(file_id)?;

        if bytes.len() as u64 > self.config.max_file_size {
            return Err(ReceiptError::Validation(format!(
                "file size {} exceeds the {} byte limit",
                bytes.len(),
                self.config.max_file_size
            )));
        }

        let file_type = file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if !self.config.is_allowed_type(&file_type) {
            return Err(ReceiptError::Validation(format!(
                "file type '{file_type}' is not an accepted receipt format"
            )));
        }

        let tracking_id = TrackingId::generate();
        let output_file_path = format!(
            "{}/{}",
            self.config.output_prefix,
            tracking_id.artifact_file_name()
        );

        let mut job = ReceiptJob {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            user_id: user_id.to_string(),
            tracking_id: tracking_id.clone(),
            task_id: None,
            output_file_path: output_file_path.clone(),
            file_size: bytes.len() as u64,
            file_type,
        };

        let default_category = default_category_id(&self.fetch_categories());
        let record = self.builder.mark_pending(&job, &default_category)?;

        let request = AnalysisRequest::for_receipt(&bytes, &output_file_path);
        match self.analysis.submit_analysis(&request).await {
            Ok(task_id) => {
                info!(tracking_id = %tracking_id, task_id = %task_id, "analysis task submitted");
                job.task_id = Some(task_id);
                self.builder.mark_processing(&record)?;
                Ok(job)
            }
            Err(e) => {
                let message = format!("analysis submission failed: {e}");
                warn!(tracking_id = %tracking_id, error = %e, "analysis submission failed");
                self.builder.mark_error(&record, &message, None, None, None)?;
                Err(ReceiptError::Submission(message))
            }
        }
    }

    /// One scheduler tick: examine every in-flight record and advance the
    /// ones whose artifact has arrived (or whose budget has run out).
    ///
    /// # Errors
    ///
    /// Returns an error only when the record store itself cannot be read;
    /// per-job failures are absorbed into the summary.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let in_flight = self.records.list_in_flight()?;
        let mut summary = SweepSummary {
            swept: in_flight.len(),
            ..Default::default()
        };

        for record in in_flight {
            match self.sweep_one(&record).await {
                Ok(SweepState::Ready) => summary.ready += 1,
                Ok(SweepState::NotReady) => summary.not_ready += 1,
                Ok(SweepState::Failed) => summary.failed += 1,
                Err(e) => {
                    error!(tracking_id = %record.tracking_id, error = %e, "sweep pass failed for job");
                    summary.failed += 1;
                }
            }
        }

        info!(
            swept = summary.swept,
            ready = summary.ready,
            not_ready = summary.not_ready,
            failed = summary.failed,
            "artifact sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_one(&self, record: &ExpenseRecord) -> Result<SweepState> {
        let listing = self.files.list(&self.config.output_prefix)?;

        // Candidates can share a name prefix (timestamps nest), so the match
        // is on the exact embedded tracking ID, never on the first prefix hit.
        let artifact = listing
            .iter()
            .filter(|name| name.starts_with(record.tracking_id.as_str()))
            .find(|name| record.tracking_id.matches_artifact(name));

        let Some(artifact_name) = artifact else {
            let updated = self.builder.record_sweep_miss(record)?;
            if updated.sweep_attempts >= self.config.max_sweep_attempts {
                let message = format!(
                    "analysis output never arrived after {} sweeps",
                    updated.sweep_attempts
                );
                warn!(tracking_id = %record.tracking_id, "{message}");
                self.builder.mark_error(&updated, &message, None, None, None)?;
                return Ok(SweepState::Failed);
            }
            return Ok(SweepState::NotReady);
        };

        let artifact_path = format!("{}/{}", self.config.output_prefix, artifact_name);
        let bytes = self.files.load(&artifact_path)?;

        let state = match OcrAnalysis::from_json_bytes(&bytes) {
            Ok(analysis) => {
                self.process_ready(record, &analysis).await?;
                SweepState::Ready
            }
            Err(e) => {
                let message = format!("analysis artifact is malformed: {e}");
                warn!(tracking_id = %record.tracking_id, error = %e, "malformed analysis artifact");
                self.builder.mark_error(record, &message, None, None, None)?;
                SweepState::Failed
            }
        };

        // Either way the job is terminal; move the artifact out of scan scope.
        self.archive_artifact(&artifact_path, artifact_name);
        Ok(state)
    }

    async fn process_ready(&self, record: &ExpenseRecord, analysis: &OcrAnalysis) -> Result<()> {
        let normalized = normalize(analysis);
        let metrics = OcrConfidenceMetrics::from_analysis(analysis);
        let categories = self.fetch_categories();

        let options = ExtractOptions {
            model: self.config.model.clone(),
            confidence_threshold: self.config.confidence_threshold,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let outcome = self
            .extractor
            .extract(&normalized, &categories, &options, &record.tracking_id)
            .await;

        let raw_ocr = serde_json::to_value(analysis)?;

        if outcome.success {
            let composite = composite_score(metrics.overall_oci_score, outcome.expense.confidence);
            info!(
                tracking_id = %record.tracking_id,
                composite,
                requires_review = outcome.expense.requires_review,
                "extraction complete"
            );
            self.builder.mark_complete(
                record,
                outcome.expense,
                composite,
                raw_ocr,
                outcome.raw_request,
                outcome.raw_response,
            )?;
        } else {
            let message = outcome
                .error
                .unwrap_or_else(|| "extraction failed".to_string());
            self.builder.mark_error(
                record,
                &message,
                Some(outcome.expense),
                Some(outcome.raw_request),
                outcome.raw_response,
            )?;
        }
        Ok(())
    }

    /// Move a processed artifact to the archive folder, falling back to
    /// deletion so a stuck artifact can never be re-processed forever.
    fn archive_artifact(&self, artifact_path: &str, artifact_name: &str) {
        let archive_path = format!("{}/{}", self.config.archive_folder, artifact_name);

        let archived = self
            .files
            .create_folder(&self.config.archive_folder)
            .and_then(|()| self.files.rename(artifact_path, &archive_path));

        if let Err(e) = archived {
            // Audit copy is lost from here on.
            error!(artifact = %artifact_path, error = %e, "archival failed, deleting artifact");
            if let Err(e) = self.files.delete(artifact_path) {
                error!(artifact = %artifact_path, error = %e, "artifact deletion also failed");
            }
        }
    }

    fn fetch_categories(&self) -> Vec<Category> {
        match self.categories.list() {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "category directory unavailable, using defaults");
                Vec::new()
            }
        }
    }
}
