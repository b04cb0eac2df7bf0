//! Error types for receipt pipeline operations.
//!
//! The taxonomy mirrors how failures are handled, not where they occur:
//!
//! - [`ReceiptError::Validation`] - bad input (file size/type, missing
//!   fields). Surfaced to the caller, never retried.
//! - [`ReceiptError::NotReady`] - the analysis artifact has not been written
//!   yet. Transient; the next sweep retries it.
//! - [`ReceiptError::Extraction`] - LLM call or response parse failure.
//!   Recorded with fallback data and an ERROR-state record, not auto-retried.
//! - [`ReceiptError::Persistence`] - record store write failure. Logged and
//!   aborted; no partial state is assumed committed.
//! - [`ReceiptError::Archival`] - artifact archival failure. Non-fatal: the
//!   caller falls back to deletion, losing the audit copy.
//!
//! # Examples
//!
//! ```
//! use receipts_core::{ReceiptError, Result};
//!
//! fn check_size(size: u64, limit: u64) -> Result<()> {
//!     if size > limit {
//!         return Err(ReceiptError::Validation(format!(
//!             "file size {size} exceeds limit {limit}"
//!         )));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_size(11, 10).is_err());
//! ```

use thiserror::Error;

/// Error types that can occur while driving a receipt through the pipeline.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// Input rejected before any work was submitted (size, type, missing
    /// fields). Not retryable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The document-analysis artifact has not arrived yet. The sweep treats
    /// this as a normal state, not a failure.
    #[error("analysis output not ready: {0}")]
    NotReady(String),

    /// LLM extraction failed (transport, malformed response, missing keys).
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The record store rejected a read or write.
    #[error("record store failure: {0}")]
    Persistence(String),

    /// Archiving a processed artifact failed; the caller deletes instead.
    #[error("archival failed: {0}")]
    Archival(String),

    /// The document-analysis service rejected a submission.
    #[error("analysis submission failed: {0}")]
    Submission(String),

    /// Underlying filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error from a store or artifact.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReceiptError {
    /// Whether the next sweep should retry the job that hit this error.
    #[must_use = "returns whether the error is transient"]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

/// Convenient result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ReceiptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_is_transient() {
        assert!(ReceiptError::NotReady("EXP_1_a".into()).is_transient());
        assert!(!ReceiptError::Validation("too big".into()).is_transient());
        assert!(!ReceiptError::Extraction("bad json".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ReceiptError::Validation("file type exe not allowed".into());
        assert_eq!(
            err.to_string(),
            "validation failed: file type exe not allowed"
        );
    }

    #[test]
    fn test_io_error_wrapped() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ReceiptError = io.into();
        assert!(matches!(err, ReceiptError::Io(_)));
    }
}
