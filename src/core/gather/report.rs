//! Run Report Models
//!
//! Serializable summary of one gather run, consumed by the invoking host for
//! display. The engine only fills it in; presentation is the host's concern.

use serde::{Deserialize, Serialize};

use crate::core::ReferenceId;

/// Per-item result of a gather run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// Source bytes were copied to the destination and the reference rewritten
    Copied,
    /// Source was already at its destination; only the stored path was normalized
    SkippedInPlace,
    /// The item could not be completed; see `reason`
    Failed,
}

/// Outcome of one reference
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    /// The reference this item describes
    pub reference_id: ReferenceId,
    /// The path as stored before the run
    pub current_path: String,
    /// Destination relative to the project base directory, when planned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Result for this item
    pub outcome: Outcome,
    /// Failure reason, present only when `outcome` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Aggregate result of one gather run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Total references processed (including failures)
    pub attempted: usize,
    /// References whose source bytes were copied
    pub copied: usize,
    /// References already in place (no file operation)
    pub skipped: usize,
    /// References that failed (missing source, copy error, rejected commit)
    pub failed: usize,
    /// Per-reference outcomes
    pub items: Vec<ItemReport>,
    /// Run start timestamp (ISO 8601)
    pub started_at: String,
    /// Run end timestamp (ISO 8601)
    pub finished_at: String,
}

impl RunReport {
    /// Builds a report from per-item outcomes, stamping the end time
    pub fn tally(items: Vec<ItemReport>, started_at: String) -> Self {
        let copied = items.iter().filter(|i| i.outcome == Outcome::Copied).count();
        let skipped = items
            .iter()
            .filter(|i| i.outcome == Outcome::SkippedInPlace)
            .count();
        let failed = items.iter().filter(|i| i.outcome == Outcome::Failed).count();
        Self {
            attempted: items.len(),
            copied,
            skipped,
            failed,
            items,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(outcome: Outcome) -> ItemReport {
        ItemReport {
            reference_id: ulid::Ulid::new().to_string(),
            current_path: "images/tex.png".to_string(),
            destination: Some("textures/tex.png".to_string()),
            outcome,
            reason: None,
        }
    }

    #[test]
    fn test_tally_counts() {
        let items = vec![
            item(Outcome::Copied),
            item(Outcome::Copied),
            item(Outcome::SkippedInPlace),
            item(Outcome::Failed),
        ];
        let report = RunReport::tally(items, chrono::Utc::now().to_rfc3339());
        assert_eq!(report.attempted, 4);
        assert_eq!(report.copied, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = RunReport::tally(vec![item(Outcome::Copied)], chrono::Utc::now().to_rfc3339());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("startedAt").is_some());
        assert_eq!(json["items"][0]["outcome"], "copied");
        assert!(json["items"][0].get("reason").is_none());
    }
}
