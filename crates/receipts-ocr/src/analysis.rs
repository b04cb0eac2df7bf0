//! Raw document-analysis artifact schema.
//!
//! The analysis service writes a JSON artifact shaped as
//! `{pages: [{words, lines, tables, fields}]}`. Which element kinds a page
//! carries varies by document and service version, so every collection is
//! decoded with an explicit `#[serde(default)]` - an absent key is an empty
//! collection, never a decode error. The artifact is read-only once
//! produced; downstream stages work on the normalized form instead.

use serde::{Deserialize, Serialize};

/// Top-level artifact produced by the document-analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrAnalysis {
    /// Document classification reported by the service, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    /// Analyzed pages, possibly empty.
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

impl OcrAnalysis {
    /// Decode an artifact from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid JSON or the JSON does not
    /// match the artifact schema.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Whether the artifact carries no recognized elements at all.
    #[must_use = "returns whether the analysis is empty"]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| {
            p.words.is_empty() && p.lines.is_empty() && p.tables.is_empty() && p.fields.is_empty()
        })
    }
}

/// One analyzed page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// Individual recognized words.
    #[serde(default)]
    pub words: Vec<OcrWord>,
    /// Recognized text lines.
    #[serde(default)]
    pub lines: Vec<OcrLine>,
    /// Detected tables.
    #[serde(default)]
    pub tables: Vec<OcrTable>,
    /// Key-value fields detected by the service (vendor name, total, ...).
    #[serde(default)]
    pub fields: Vec<OcrField>,
}

/// A single recognized word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    /// Recognized text.
    pub text: String,
    /// Recognition confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

/// A recognized line of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    /// Recognized text.
    pub text: String,
    /// Recognition confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

/// A detected table as a grid of cell strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrTable {
    /// Cell contents, row-major.
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    /// Detection confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

/// A named key-value field detected by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrField {
    /// Field name, e.g. `VendorName` or `TransactionDate`.
    pub name: String,
    /// Extracted value text.
    #[serde(default)]
    pub value: String,
    /// Detection confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_artifact() {
        let json = r#"{
            "document_type": "RECEIPT",
            "pages": [{
                "words": [{"text": "Acme", "confidence": 0.95}],
                "lines": [{"text": "Acme Store", "confidence": 0.9}],
                "tables": [{"rows": [["item", "price"]], "confidence": 0.8}],
                "fields": [{"name": "Total", "value": "42.50", "confidence": 0.92}]
            }]
        }"#;
        let analysis = OcrAnalysis::from_json_bytes(json.as_bytes()).unwrap();
        assert_eq!(analysis.document_type.as_deref(), Some("RECEIPT"));
        assert_eq!(analysis.pages.len(), 1);
        assert_eq!(analysis.pages[0].fields[0].name, "Total");
        assert!(!analysis.is_empty());
    }

    #[test]
    fn test_absent_keys_decode_as_empty() {
        // Pages with only some element kinds must still decode
        let json = r#"{"pages": [{"words": [{"text": "x", "confidence": 0.5}]}]}"#;
        let analysis = OcrAnalysis::from_json_bytes(json.as_bytes()).unwrap();
        assert_eq!(analysis.pages[0].words.len(), 1);
        assert!(analysis.pages[0].lines.is_empty());
        assert!(analysis.pages[0].tables.is_empty());
        assert!(analysis.pages[0].fields.is_empty());
    }

    #[test]
    fn test_zero_pages_is_valid_and_empty() {
        let analysis = OcrAnalysis::from_json_bytes(b"{}").unwrap();
        assert!(analysis.pages.is_empty());
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(OcrAnalysis::from_json_bytes(b"not json").is_err());
        assert!(OcrAnalysis::from_json_bytes(b"{\"pages\": 3}").is_err());
    }
}
