//! Tracking IDs: the correlation key threading a receipt through the
//! pipeline.
//!
//! Every receipt gets exactly one [`TrackingId`] at submission time. The ID
//! is embedded in the analysis output path, the archived artifact name and
//! the persisted record, so any stage can be re-entered with nothing but the
//! ID in hand.
//!
//! Format: `EXP_<unix-millis>_<12-hex-chars>`, e.g.
//! `EXP_1709290173511_9f86d081884c`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix shared by all tracking IDs.
const TRACKING_PREFIX: &str = "EXP";

/// Length of the random suffix, in hex characters.
const SUFFIX_LEN: usize = 12;

/// Unique, immutable correlation key for one receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Generate a fresh tracking ID from the current time and random
    /// entropy.
    #[must_use = "generates a new tracking ID"]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: String = Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string();
        Self(format!("{TRACKING_PREFIX}_{millis}_{suffix}"))
    }

    /// View the ID as a string slice.
    #[inline]
    #[must_use = "returns the tracking ID string"]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the analysis artifact for this receipt.
    #[must_use = "returns the artifact file name"]
    pub fn artifact_file_name(&self) -> String {
        format!("{}.json", self.0)
    }

    /// Whether an artifact file name belongs to this receipt.
    ///
    /// Sibling artifacts can share a name prefix (`EXP_1709290173511_ab...`
    /// vs `EXP_17092901735118_cd...`), so candidates are matched on the full
    /// embedded ID, never on a prefix alone.
    #[must_use = "returns whether the artifact matches this tracking ID"]
    pub fn matches_artifact(&self, file_name: &str) -> bool {
        let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
        stem == self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackingId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let prefix = parts.next().unwrap_or_default();
        let millis = parts.next().unwrap_or_default();
        let suffix = parts.next().unwrap_or_default();

        if prefix != TRACKING_PREFIX {
            return Err(format!("tracking ID '{s}' missing {TRACKING_PREFIX} prefix"));
        }
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("tracking ID '{s}' has a non-numeric timestamp"));
        }
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("tracking ID '{s}' has an invalid suffix"));
        }

        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TrackingId::generate();
        let b = TrackingId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_id_round_trips() {
        let id = TrackingId::generate();
        let parsed: TrackingId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!("".parse::<TrackingId>().is_err());
        assert!("EXP_".parse::<TrackingId>().is_err());
        assert!("EXP_abc_def".parse::<TrackingId>().is_err());
        assert!("REC_1709290173511_9f86d081884c".parse::<TrackingId>().is_err());
        assert!("EXP_1709290173511_zz!!".parse::<TrackingId>().is_err());
        assert!("EXP_1709290173511_9f86d081884c".parse::<TrackingId>().is_ok());
    }

    #[test]
    fn test_artifact_matching_is_exact() {
        let id: TrackingId = "EXP_1709290173511_9f86d081884c".parse().unwrap();
        assert!(id.matches_artifact("EXP_1709290173511_9f86d081884c.json"));
        assert!(id.matches_artifact("EXP_1709290173511_9f86d081884c"));
        // Prefix collision must not match
        assert!(!id.matches_artifact("EXP_1709290173511_9f86d081884cff.json"));
        assert!(!id.matches_artifact("EXP_1709290173511_9f86d0.json"));
    }

    #[test]
    fn test_artifact_file_name() {
        let id: TrackingId = "EXP_1_aa".parse().unwrap();
        assert_eq!(id.artifact_file_name(), "EXP_1_aa.json");
    }
}
