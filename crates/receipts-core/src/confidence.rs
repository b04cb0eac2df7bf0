//! Composite confidence scoring.
//!
//! Two independent signals rate every extraction: the document-analysis
//! service's element confidence (how well the text was read) and the LLM's
//! self-reported confidence (how well the text was interpreted). This module
//! blends them into a single score in [0, 1].
//!
//! ## Algorithm
//!
//! 1. Clamp both inputs to [0, 1].
//! 2. If either signal is below [`WEAK_SIGNAL_FLOOR`], return the minimum of
//!    the two - one weak link caps the whole score.
//! 3. Otherwise average the weighted mean (OCR 0.6, LLM 0.4) with the
//!    harmonic mean of the two, rounded to 2 decimals. The weighted mean
//!    rewards either source being strong; the harmonic mean punishes
//!    imbalance.
//!
//! Downstream review thresholds were tuned against this exact formula, so it
//! is preserved as-is.

use serde::{Deserialize, Serialize};

/// Below this value a single signal caps the composite score.
pub const WEAK_SIGNAL_FLOOR: f64 = 0.3;

/// Weight of the document-analysis confidence in the weighted mean.
const OCR_WEIGHT: f64 = 0.6;

/// Weight of the LLM confidence in the weighted mean.
const LLM_WEIGHT: f64 = 0.4;

/// Clamp a confidence value to [0, 1]. Non-finite input maps to 0.
///
/// Idempotent: `clamp_confidence(clamp_confidence(f)) == clamp_confidence(f)`.
#[inline]
#[must_use = "returns the clamped confidence"]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Blend document-analysis and LLM confidence into one composite score.
#[must_use = "returns the composite confidence score"]
pub fn composite_score(ocr_score: f64, llm_score: f64) -> f64 {
    let ocr = clamp_confidence(ocr_score);
    let llm = clamp_confidence(llm_score);

    if ocr < WEAK_SIGNAL_FLOOR || llm < WEAK_SIGNAL_FLOOR {
        return round2(ocr.min(llm));
    }

    let weighted = ocr.mul_add(OCR_WEIGHT, llm * LLM_WEIGHT);
    let harmonic = if ocr + llm == 0.0 {
        0.0
    } else {
        2.0 * ocr * llm / (ocr + llm)
    };

    round2((weighted + harmonic) / 2.0)
}

/// Round to 2 decimal places.
#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Human-readable confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    /// Composite >= 0.8: trusted without review in most flows.
    High,
    /// Composite >= 0.6.
    Medium,
    /// Composite >= 0.4.
    Low,
    /// Everything below 0.4.
    VeryLow,
}

impl ConfidenceLabel {
    /// Map a composite score onto its band.
    #[must_use = "returns the label for the score"]
    pub fn for_score(score: f64) -> Self {
        let score = clamp_confidence(score);
        if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else if score >= 0.4 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::VeryLow => write!(f, "Very Low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_equal_strong_signals() {
        // weighted mean and harmonic mean of equal inputs are both the input
        assert_eq!(composite_score(0.9, 0.9), 0.9);
        assert_eq!(composite_score(0.5, 0.5), 0.5);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_weak_link_caps_score() {
        assert_eq!(composite_score(0.2, 0.9), 0.2);
        assert_eq!(composite_score(0.9, 0.1), 0.1);
        assert_eq!(composite_score(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_imbalance_is_punished() {
        // Same arithmetic mean, but the balanced pair scores higher
        let balanced = composite_score(0.7, 0.7);
        let skewed = composite_score(0.95, 0.45);
        assert!(balanced > skewed, "balanced {balanced} <= skewed {skewed}");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_inputs_outside_range_are_clamped() {
        assert_eq!(composite_score(1.5, 0.9), composite_score(1.0, 0.9));
        assert_eq!(composite_score(-0.2, 0.9), 0.0);
        assert_eq!(composite_score(f64::NAN, 0.9), 0.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ConfidenceLabel::for_score(0.85), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::for_score(0.8), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::for_score(0.65), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::for_score(0.45), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::for_score(0.1), ConfidenceLabel::VeryLow);
        assert_eq!(ConfidenceLabel::for_score(f64::NAN), ConfidenceLabel::VeryLow);
    }

    proptest! {
        #[test]
        fn prop_clamp_in_range(f in proptest::num::f64::ANY) {
            let clamped = clamp_confidence(f);
            prop_assert!((0.0..=1.0).contains(&clamped));
        }

        #[test]
        fn prop_clamp_idempotent(f in proptest::num::f64::ANY) {
            let once = clamp_confidence(f);
            prop_assert_eq!(clamp_confidence(once), once);
        }

        #[test]
        fn prop_composite_in_range(a in proptest::num::f64::ANY, b in proptest::num::f64::ANY) {
            let score = composite_score(a, b);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
