//! Normalization of raw analysis artifacts for LLM consumption.
//!
//! `normalize` is a pure function: it flattens the page/element structure
//! into one document-level view, attaches confidence guidance for the
//! prompt, and never fails - malformed or empty input degrades to an
//! empty-but-valid result.

use crate::analysis::OcrAnalysis;
use crate::metrics::{OcrConfidenceMetrics, HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document type assumed when the service does not report one.
const DEFAULT_DOCUMENT_TYPE: &str = "RECEIPT";

/// Reliability band of one named field, passed to the LLM prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldReliability {
    /// Confidence >= 0.8; the LLM should trust this text as read.
    Reliable,
    /// Mid-band confidence; the LLM should sanity-check this text.
    Uncertain,
    /// Confidence < 0.5; the LLM should treat this text as suspect.
    Unreliable,
}

impl FieldReliability {
    fn for_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE_THRESHOLD {
            Self::Reliable
        } else if confidence < LOW_CONFIDENCE_THRESHOLD {
            Self::Unreliable
        } else {
            Self::Uncertain
        }
    }
}

/// Guidance steering the LLM prompt toward trustworthy parts of the text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceGuidance {
    /// Named fields the LLM may take at face value.
    pub high_confidence_fields: Vec<String>,
    /// Named fields the LLM should treat as suspect.
    pub low_confidence_fields: Vec<String>,
    /// Reliability label per named field. Ordered for deterministic prompts.
    pub field_reliability: BTreeMap<String, FieldReliability>,
}

/// One flattened text element with its recognition confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Recognized text.
    pub text: String,
    /// Recognition confidence in [0, 1].
    pub confidence: f64,
}

/// One flattened named field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldElement {
    /// Field name as reported by the service.
    pub name: String,
    /// Extracted value text.
    pub value: String,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
}

/// Flattened, page-free view of the document contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrData {
    /// All recognized lines joined in reading order.
    pub full_text: String,
    /// Per-line text with confidence.
    pub lines: Vec<TextElement>,
    /// Named key-value fields.
    pub fields: Vec<FieldElement>,
    /// Table cell grids.
    pub tables: Vec<Vec<Vec<String>>>,
}

/// Result of normalizing one artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOcr {
    /// Document classification, defaulting to `RECEIPT`.
    pub document_type: String,
    /// Flattened document contents.
    pub ocr_data: OcrData,
    /// Prompt guidance; absent when the artifact has no named fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_guidance: Option<ConfidenceGuidance>,
}

/// Flatten a raw artifact into LLM-ready form. Pure; never fails.
#[must_use = "returns the normalized analysis result"]
pub fn normalize(analysis: &OcrAnalysis) -> NormalizedOcr {
    let document_type = analysis
        .document_type
        .clone()
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());

    let mut lines = Vec::new();
    let mut fields = Vec::new();
    let mut tables = Vec::new();

    for page in &analysis.pages {
        for line in &page.lines {
            lines.push(TextElement {
                text: line.text.clone(),
                confidence: line.confidence,
            });
        }
        // Pages from some service versions carry words but no line grouping;
        // fall back to one element per word so the text is not lost.
        if page.lines.is_empty() {
            for word in &page.words {
                lines.push(TextElement {
                    text: word.text.clone(),
                    confidence: word.confidence,
                });
            }
        }
        for field in &page.fields {
            fields.push(FieldElement {
                name: field.name.clone(),
                value: field.value.clone(),
                confidence: field.confidence,
            });
        }
        for table in &page.tables {
            tables.push(table.rows.clone());
        }
    }

    let full_text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let confidence_guidance = build_guidance(analysis);

    NormalizedOcr {
        document_type,
        ocr_data: OcrData {
            full_text,
            lines,
            fields,
            tables,
        },
        confidence_guidance,
    }
}

fn build_guidance(analysis: &OcrAnalysis) -> Option<ConfidenceGuidance> {
    let metrics = OcrConfidenceMetrics::from_analysis(analysis);
    if metrics.field_confidences.is_empty() {
        return None;
    }

    let field_reliability: BTreeMap<String, FieldReliability> = metrics
        .field_confidences
        .iter()
        .map(|(name, confidence)| (name.clone(), FieldReliability::for_confidence(*confidence)))
        .collect();

    Some(ConfidenceGuidance {
        high_confidence_fields: metrics.high_confidence_fields.into_iter().collect(),
        low_confidence_fields: metrics.low_confidence_fields.into_iter().collect(),
        field_reliability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{OcrField, OcrLine, OcrPage, OcrTable, OcrWord};

    #[test]
    fn test_zero_pages_yields_empty_valid_structure() {
        let normalized = normalize(&OcrAnalysis::default());
        assert_eq!(normalized.document_type, "RECEIPT");
        assert!(normalized.ocr_data.full_text.is_empty());
        assert!(normalized.ocr_data.lines.is_empty());
        assert!(normalized.ocr_data.fields.is_empty());
        assert!(normalized.confidence_guidance.is_none());
    }

    #[test]
    fn test_lines_flattened_across_pages() {
        let analysis = OcrAnalysis {
            document_type: Some("RECEIPT".into()),
            pages: vec![
                OcrPage {
                    lines: vec![OcrLine { text: "Acme Store".into(), confidence: 0.9 }],
                    ..Default::default()
                },
                OcrPage {
                    lines: vec![OcrLine { text: "Total 42.50".into(), confidence: 0.95 }],
                    ..Default::default()
                },
            ],
        };
        let normalized = normalize(&analysis);
        assert_eq!(normalized.ocr_data.lines.len(), 2);
        assert_eq!(normalized.ocr_data.full_text, "Acme Store\nTotal 42.50");
    }

    #[test]
    fn test_words_used_when_lines_absent() {
        let analysis = OcrAnalysis {
            document_type: None,
            pages: vec![OcrPage {
                words: vec![
                    OcrWord { text: "Acme".into(), confidence: 0.9 },
                    OcrWord { text: "42.50".into(), confidence: 0.95 },
                ],
                ..Default::default()
            }],
        };
        let normalized = normalize(&analysis);
        assert_eq!(normalized.ocr_data.lines.len(), 2);
        assert_eq!(normalized.ocr_data.full_text, "Acme\n42.50");
    }

    #[test]
    fn test_guidance_reflects_field_confidence() {
        let analysis = OcrAnalysis {
            document_type: Some("RECEIPT".into()),
            pages: vec![OcrPage {
                fields: vec![
                    OcrField { name: "Total".into(), value: "42.50".into(), confidence: 0.92 },
                    OcrField { name: "TaxId".into(), value: "?".into(), confidence: 0.2 },
                    OcrField { name: "Date".into(), value: "2024-03-01".into(), confidence: 0.6 },
                ],
                ..Default::default()
            }],
        };
        let guidance = normalize(&analysis).confidence_guidance.unwrap();
        assert_eq!(guidance.high_confidence_fields, vec!["Total".to_string()]);
        assert_eq!(guidance.low_confidence_fields, vec!["TaxId".to_string()]);
        assert_eq!(guidance.field_reliability["Date"], FieldReliability::Uncertain);
        assert_eq!(guidance.field_reliability["Total"], FieldReliability::Reliable);
        assert_eq!(guidance.field_reliability["TaxId"], FieldReliability::Unreliable);
    }

    #[test]
    fn test_tables_carried_through() {
        let analysis = OcrAnalysis {
            document_type: None,
            pages: vec![OcrPage {
                tables: vec![OcrTable {
                    rows: vec![vec!["item".into(), "price".into()]],
                    confidence: 0.7,
                }],
                ..Default::default()
            }],
        };
        let normalized = normalize(&analysis);
        assert_eq!(normalized.ocr_data.tables.len(), 1);
        assert_eq!(normalized.ocr_data.tables[0][0][1], "price");
    }
}
