//! # receipts-pipeline
//!
//! End-to-end orchestration for the receipt capture pipeline.
//!
//! ```text
//! submit ──> PENDING ──> PROCESSING ──sweep──> COMPLETE
//!                                      │
//!                                      └─────> ERROR
//! ```
//!
//! Each receipt is an independent, stateless unit of work keyed by its
//! tracking ID; the only cross-job operation is the artifact sweep, which is
//! idempotent because processed artifacts are moved out of its scan scope.
//! All failures are converted into an ERROR-state record at the job
//! boundary - nothing escapes the sweep.
//!
//! The host system's storage, persistence and category services are
//! consumed through the traits in [`stores`] and [`analysis_client`];
//! filesystem-backed and in-memory implementations ship with the crate.

pub mod analysis_client;
pub mod builder;
pub mod orchestrator;
pub mod stores;

pub use analysis_client::{
    AnalysisRequest, DocumentAnalysisClient, HttpAnalysisClient, RECEIPT_DOCUMENT_TYPE,
};
pub use builder::RecordBuilder;
pub use orchestrator::{SweepSummary, TaskOrchestrator};
pub use stores::{
    CategoryDirectory, FileStore, FsFileStore, JsonCategoryDirectory, JsonRecordStore, RecordStore,
};
