//! Confidence metrics derived from a document-analysis artifact.

use crate::analysis::OcrAnalysis;
use receipts_core::clamp_confidence;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Elements at or above this confidence are treated as reliable.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Elements below this confidence are treated as unreliable.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Derived confidence view over one artifact.
///
/// Recomputed from the raw analysis whenever needed; never persisted on its
/// own. Field sets use ordered collections so serialized output and prompt
/// text are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrConfidenceMetrics {
    /// Per-named-field confidence.
    pub field_confidences: BTreeMap<String, f64>,
    /// Mean confidence across named fields, 0.0 when there are none.
    pub average_field_confidence: f64,
    /// Named fields at or above [`HIGH_CONFIDENCE_THRESHOLD`].
    pub high_confidence_fields: BTreeSet<String>,
    /// Named fields below [`LOW_CONFIDENCE_THRESHOLD`].
    pub low_confidence_fields: BTreeSet<String>,
    /// Mean confidence across every recognized element (words, lines,
    /// tables and fields). The pipeline's OCR-side signal.
    pub overall_oci_score: f64,
}

impl OcrConfidenceMetrics {
    /// Compute metrics from a raw artifact. Empty artifacts yield all-zero
    /// metrics rather than an error.
    #[must_use = "computes confidence metrics from the analysis"]
    pub fn from_analysis(analysis: &OcrAnalysis) -> Self {
        let mut field_confidences = BTreeMap::new();
        let mut high_confidence_fields = BTreeSet::new();
        let mut low_confidence_fields = BTreeSet::new();

        let mut element_sum = 0.0;
        let mut element_count = 0usize;

        for page in &analysis.pages {
            for word in &page.words {
                element_sum += clamp_confidence(word.confidence);
                element_count += 1;
            }
            for line in &page.lines {
                element_sum += clamp_confidence(line.confidence);
                element_count += 1;
            }
            for table in &page.tables {
                element_sum += clamp_confidence(table.confidence);
                element_count += 1;
            }
            for field in &page.fields {
                let confidence = clamp_confidence(field.confidence);
                element_sum += confidence;
                element_count += 1;

                field_confidences.insert(field.name.clone(), confidence);
                if confidence >= HIGH_CONFIDENCE_THRESHOLD {
                    high_confidence_fields.insert(field.name.clone());
                } else if confidence < LOW_CONFIDENCE_THRESHOLD {
                    low_confidence_fields.insert(field.name.clone());
                }
            }
        }

        let average_field_confidence = if field_confidences.is_empty() {
            0.0
        } else {
            field_confidences.values().sum::<f64>() / field_confidences.len() as f64
        };

        let overall_oci_score = if element_count == 0 {
            0.0
        } else {
            element_sum / element_count as f64
        };

        Self {
            field_confidences,
            average_field_confidence,
            high_confidence_fields,
            low_confidence_fields,
            overall_oci_score,
        }
    }
}
