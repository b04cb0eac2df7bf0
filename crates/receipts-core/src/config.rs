//! Configuration for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::env;

/// Default maximum accepted receipt file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default composite-confidence threshold below which extractions are
/// flagged for human review.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Default number of sweeps after which a job with no artifact is failed.
pub const DEFAULT_MAX_SWEEP_ATTEMPTS: u32 = 12;

/// File extensions accepted for submission.
pub const ALLOWED_FILE_TYPES: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif", "tiff", "tif"];

/// Frozen pipeline configuration, built once at startup and passed by
/// reference. There is no global mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum accepted file size in bytes.
    pub max_file_size: u64,

    /// LLM model identifier sent with every generation request.
    pub model: String,

    /// Composite confidence threshold (0.0-1.0); extractions below it are
    /// marked as requiring review.
    pub confidence_threshold: f64,

    /// Folder prefix under which analysis artifacts are written. The full
    /// artifact path is derived from the tracking ID.
    pub output_prefix: String,

    /// Folder that processed artifacts are moved into. Created lazily on
    /// first archival.
    pub archive_folder: String,

    /// Sweep budget: a job whose artifact never appears is forcibly failed
    /// after this many sweeps.
    pub max_sweep_attempts: u32,

    /// Maximum tokens requested from the LLM.
    pub max_tokens: u32,

    /// Sampling temperature for the LLM.
    pub temperature: f64,
}

impl PipelineConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RECEIPTS_MAX_FILE_SIZE`: byte limit (default: 10 MiB)
    /// - `RECEIPTS_LLM_MODEL`: model name (default: "cohere.command-r-plus")
    /// - `RECEIPTS_CONFIDENCE_THRESHOLD`: threshold 0.0-1.0 (default: 0.7)
    /// - `RECEIPTS_OUTPUT_PREFIX`: artifact folder (default: "ocr-output")
    /// - `RECEIPTS_ARCHIVE_FOLDER`: archive folder (default: "ocr-archive")
    /// - `RECEIPTS_MAX_SWEEP_ATTEMPTS`: sweep budget (default: 12)
    /// - `RECEIPTS_LLM_MAX_TOKENS`: max tokens (default: 2000)
    /// - `RECEIPTS_LLM_TEMPERATURE`: temperature (default: 0.1)
    #[must_use = "creates config from environment variables"]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_file_size = env::var("RECEIPTS_MAX_FILE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_file_size);

        let model = env::var("RECEIPTS_LLM_MODEL").unwrap_or(defaults.model);

        let confidence_threshold = env::var("RECEIPTS_CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.confidence_threshold);

        let output_prefix = env::var("RECEIPTS_OUTPUT_PREFIX").unwrap_or(defaults.output_prefix);

        let archive_folder = env::var("RECEIPTS_ARCHIVE_FOLDER").unwrap_or(defaults.archive_folder);

        let max_sweep_attempts = env::var("RECEIPTS_MAX_SWEEP_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_sweep_attempts);

        let max_tokens = env::var("RECEIPTS_LLM_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_tokens);

        let temperature = env::var("RECEIPTS_LLM_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.temperature);

        Self {
            max_file_size,
            model,
            confidence_threshold,
            output_prefix,
            archive_folder,
            max_sweep_attempts,
            max_tokens,
            temperature,
        }
    }

    /// Whether a file extension is accepted for submission. Matching is
    /// case-insensitive.
    #[must_use = "returns whether the file type is accepted"]
    pub fn is_allowed_type(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        ALLOWED_FILE_TYPES.contains(&ext.as_str())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            model: "cohere.command-r-plus".to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            output_prefix: "ocr-output".to_string(),
            archive_folder: "ocr-archive".to_string(),
            max_sweep_attempts: DEFAULT_MAX_SWEEP_ATTEMPTS,
            max_tokens: 2000,
            temperature: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.max_sweep_attempts, 12);
        assert_eq!(config.output_prefix, "ocr-output");
    }

    #[test]
    fn test_allowed_types() {
        let config = PipelineConfig::default();
        assert!(config.is_allowed_type("pdf"));
        assert!(config.is_allowed_type("JPG"));
        assert!(config.is_allowed_type(".jpeg"));
        assert!(config.is_allowed_type("tiff"));
        assert!(!config.is_allowed_type("exe"));
        assert!(!config.is_allowed_type("docx"));
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("RECEIPTS_MAX_FILE_SIZE", "1024");
        env::set_var("RECEIPTS_CONFIDENCE_THRESHOLD", "0.9");
        env::set_var("RECEIPTS_MAX_SWEEP_ATTEMPTS", "3");

        let config = PipelineConfig::from_env();
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(config.max_sweep_attempts, 3);

        // Clean up
        env::remove_var("RECEIPTS_MAX_FILE_SIZE");
        env::remove_var("RECEIPTS_CONFIDENCE_THRESHOLD");
        env::remove_var("RECEIPTS_MAX_SWEEP_ATTEMPTS");
    }
}
